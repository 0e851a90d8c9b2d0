use std::sync::Arc;

use tracing::trace;

use restock_core::{ForecastPoint, ProductSeries, SeriesPoint};

use crate::result::{ForecastError, ProcedureError, ProductForecast};

/// One future step as produced by a procedure: central value plus interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

/// A pluggable forecasting procedure.
///
/// Contract:
/// - `history` is chronological with at least 3 points;
/// - the result holds exactly `horizon` estimates for the consecutive days
///   following the last history date.
///
/// Implementations must be pure with respect to `self` (no interior
/// mutation) so one instance can serve concurrent jobs.
pub trait Forecaster: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn fit_predict(
        &self,
        history: &[SeriesPoint],
        horizon: usize,
    ) -> Result<Vec<Estimate>, ProcedureError>;
}

/// Longest horizon an engine accepts unless configured otherwise (ten years).
pub const DEFAULT_MAX_HORIZON: usize = 3_650;

/// Validates the engine contract around a [`Forecaster`] and dates its output.
#[derive(Clone)]
pub struct ForecastEngine {
    procedure: Arc<dyn Forecaster>,
    max_horizon: usize,
}

impl core::fmt::Debug for ForecastEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForecastEngine")
            .field("procedure", &self.procedure.name())
            .field("max_horizon", &self.max_horizon)
            .finish()
    }
}

impl ForecastEngine {
    pub fn new(procedure: impl Forecaster) -> Self {
        Self::from_shared(Arc::new(procedure))
    }

    pub fn from_shared(procedure: Arc<dyn Forecaster>) -> Self {
        Self {
            procedure,
            max_horizon: DEFAULT_MAX_HORIZON,
        }
    }

    /// Upper bound on the horizon; larger requests are `InvalidHorizon`.
    pub fn with_max_horizon(mut self, max_horizon: usize) -> Self {
        self.max_horizon = max_horizon;
        self
    }

    pub fn procedure_name(&self) -> &str {
        self.procedure.name()
    }

    pub fn max_horizon(&self) -> usize {
        self.max_horizon
    }

    /// Check a caller-supplied horizon before any work is dispatched.
    pub fn validate_horizon(&self, horizon: i64) -> Result<usize, ForecastError> {
        usize::try_from(horizon)
            .ok()
            .filter(|h| (1..=self.max_horizon).contains(h))
            .ok_or(ForecastError::InvalidHorizon(horizon))
    }

    /// Forecast `horizon` days after the last observation of `series`.
    ///
    /// Returned estimates are raw: negative values and crossed bounds pass through.
    pub fn forecast(
        &self,
        series: &ProductSeries,
        horizon: usize,
    ) -> Result<ProductForecast, ForecastError> {
        if !(1..=self.max_horizon).contains(&horizon) {
            return Err(ForecastError::InvalidHorizon(
                i64::try_from(horizon).unwrap_or(i64::MAX),
            ));
        }
        series.ensure_eligible()?;

        let key = series.product_key();
        let last = series
            .last_date()
            .ok_or_else(|| ForecastError::failure(key, "series has no dates"))?;

        let estimates = self
            .procedure
            .fit_predict(series.points(), horizon)
            .map_err(|e| ForecastError::failure(key, e.to_string()))?;

        if estimates.len() != horizon {
            return Err(ForecastError::failure(
                key,
                format!(
                    "{} returned {} point(s) for horizon {horizon}",
                    self.procedure.name(),
                    estimates.len()
                ),
            ));
        }

        let mut points = Vec::with_capacity(horizon);
        for (offset, est) in (1u64..).zip(estimates) {
            if !(est.point.is_finite() && est.lower.is_finite() && est.upper.is_finite()) {
                return Err(ForecastError::failure(
                    key,
                    format!("non-finite estimate at step {offset}"),
                ));
            }
            let date = ForecastPoint::day_after(last, offset)
                .ok_or_else(|| ForecastError::failure(key, "forecast date out of range"))?;
            points.push(ForecastPoint {
                date,
                point_estimate: est.point,
                lower_bound: est.lower,
                upper_bound: est.upper,
            });
        }

        trace!(product = %key, procedure = self.procedure.name(), horizon, "forecast computed");
        Ok(ProductForecast::new(key.clone(), points))
    }
}
