//! Single-series run over an uploaded CSV table.

use std::sync::LazyLock;

use tracing::{debug, info};

use restock_ai::{AiJob, ForecastEngine, ForecastJob};
use restock_core::{ProductKey, TabularForecast};
use restock_inventory::recommend;
use restock_sales::{RecordNormalizer, Table, TabularError, aggregate};

use crate::config::PipelineConfig;
use crate::sources::DocumentStore;

use super::context::PipelineContext;
use super::error::PipelineError;

/// Key the upload's rows are filed under.
pub const UPLOAD_PRODUCT_KEY: &str = "upload";

static UPLOAD_KEY: LazyLock<ProductKey> = LazyLock::new(|| {
    ProductKey::new(UPLOAD_PRODUCT_KEY).expect("upload product key is a non-blank constant")
});

impl<S: DocumentStore> PipelineContext<S> {
    /// Forecast an uploaded `{date, quantity}` table. See [`forecast_upload`].
    pub async fn run_tabular(
        &self,
        csv: &[u8],
        horizon: i64,
        current_stock: i64,
    ) -> Result<TabularForecast, PipelineError> {
        forecast_upload(&self.engine, &self.config, csv, horizon, current_stock).await
    }
}

/// Forecast a single uploaded series and size the restock for it.
///
/// Needs no document store, so callers without one can use it directly.
pub async fn forecast_upload(
    engine: &ForecastEngine,
    config: &PipelineConfig,
    csv: &[u8],
    horizon: i64,
    current_stock: i64,
) -> Result<TabularForecast, PipelineError> {
    let horizon = engine.validate_horizon(horizon)?;
    let current_stock = u64::try_from(current_stock).unwrap_or(0);

    let table = Table::from_csv(csv).map_err(|e| match e {
        TabularError::Empty => PipelineError::NoData("CSV contains no rows".into()),
        other => PipelineError::Upload(other),
    })?;
    let mapping = table.column_mapping();
    let header = |i: usize| table.headers().get(i).map_or("", String::as_str);
    debug!(
        date_column = header(mapping.date_column),
        quantity_column = header(mapping.quantity_column),
        rows = table.rows().len(),
        "upload columns mapped"
    );

    let key = UPLOAD_KEY.clone();
    let records = table.to_records();
    let outcome = RecordNormalizer::new()
        .with_default_product(key.clone())
        .normalize_all(&records);
    if outcome.observations.is_empty() {
        return Err(PipelineError::NoData("no usable rows in upload".into()));
    }

    let Some(series) = aggregate(outcome.observations).remove(&key) else {
        return Err(PipelineError::NoData("no usable rows in upload".into()));
    };
    series
        .ensure_eligible()
        .map_err(|e| PipelineError::NoResults(e.to_string()))?;

    let job = ForecastJob::new(engine.clone(), series, horizon);
    let task = tokio::task::spawn_blocking(move || job.run());
    let joined = match config.run_timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| PipelineError::TimedOut(limit))?,
        None => task.await,
    };
    let forecast = match joined {
        Ok(result) => result?,
        Err(e) if e.is_panic() => {
            return Err(PipelineError::ForecastFailure {
                product_key: key,
                reason: "forecast task panicked".into(),
            });
        }
        Err(e) => return Err(PipelineError::Worker(e.to_string())),
    };

    let rec = recommend(&forecast.points, current_stock, config.safety_margin);
    info!(
        horizon,
        predicted_sales = rec.predicted_sales,
        recommended_stock = rec.recommended_stock,
        "upload forecast completed"
    );

    Ok(TabularForecast {
        predictions: forecast.points,
        predicted_sales: rec.predicted_sales_rounded(),
        current_stock,
        recommended_stock: rec.recommended_stock,
    })
}
