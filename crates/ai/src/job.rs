use restock_core::{ProductKey, ProductSeries};

use crate::forecaster::ForecastEngine;
use crate::result::{ForecastError, ProductForecast};

/// A self-contained inference unit that can be shipped to a worker thread.
///
/// Jobs own their input: nothing mutable is shared between jobs, so any
/// number of them can run in parallel.
pub trait AiJob: Send + 'static {
    type Output: Send + 'static;

    /// Product the job is computing for (used to attribute failures).
    fn product_key(&self) -> &ProductKey;

    /// Execute inference. CPU-bound; must not be called on an async executor thread.
    fn run(self) -> Result<Self::Output, ForecastError>;
}

/// Forecast one product series over a fixed horizon.
#[derive(Debug, Clone)]
pub struct ForecastJob {
    engine: ForecastEngine,
    series: ProductSeries,
    horizon: usize,
}

impl ForecastJob {
    pub fn new(engine: ForecastEngine, series: ProductSeries, horizon: usize) -> Self {
        Self {
            engine,
            series,
            horizon,
        }
    }

    pub fn series(&self) -> &ProductSeries {
        &self.series
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }
}

impl AiJob for ForecastJob {
    type Output = ProductForecast;

    fn product_key(&self) -> &ProductKey {
        self.series.product_key()
    }

    fn run(self) -> Result<ProductForecast, ForecastError> {
        self.engine.forecast(&self.series, self.horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    use crate::holt::HoltForecaster;

    #[test]
    fn job_runs_engine_on_owned_series() {
        let totals: BTreeMap<_, _> = (1..=5)
            .map(|d| (NaiveDate::from_ymd_opt(2024, 2, d).unwrap(), 2.0))
            .collect();
        let series = ProductSeries::from_daily_totals(ProductKey::new("p").unwrap(), totals);
        let job = ForecastJob::new(ForecastEngine::new(HoltForecaster::default()), series, 7);

        assert_eq!(job.product_key().as_str(), "p");
        let out = job.run().unwrap();
        assert_eq!(out.points.len(), 7);
        assert_eq!(
            out.points[0].date,
            NaiveDate::from_ymd_opt(2024, 2, 6).unwrap()
        );
    }
}
