use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use restock_ai::ForecastError;
use restock_core::ProductKey;
use restock_sales::TabularError;

use crate::config::ConfigError;
use crate::sources::SourceError;
use crate::workers::PoolError;

/// Run-level failures. Per-product `InsufficientData` never surfaces here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid horizon {0}: must be between 1 and the configured maximum")]
    InvalidHorizon(i64),

    #[error("{0} collection not found")]
    MissingCollection(String),

    #[error("no data: {0}")]
    NoData(String),

    #[error("no prediction results: {0}")]
    NoResults(String),

    #[error("prediction error for {product_key}: {reason}")]
    ForecastFailure {
        product_key: ProductKey,
        reason: String,
    },

    #[error("forecasting did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("worker failure: {0}")]
    Worker(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("invalid upload: {0}")]
    Upload(#[from] TabularError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ForecastError> for PipelineError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::InvalidHorizon(h) => Self::InvalidHorizon(h),
            ForecastError::ForecastFailure {
                product_key,
                reason,
            } => Self::ForecastFailure {
                product_key,
                reason,
            },
            ForecastError::InsufficientData(e) => Self::NoResults(e.to_string()),
        }
    }
}

impl From<PoolError> for PipelineError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Aborted(e) => e.into(),
            PoolError::Worker(msg) => Self::Worker(msg),
        }
    }
}

/// Machine-readable error category for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidHorizon,
    MissingCollection,
    NoData,
    NoResults,
    ForecastFailure,
    TimedOut,
    Worker,
    Source,
    Upload,
    Config,
}

/// Serializable error shape returned at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub reason: String,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHorizon(_) => ErrorKind::InvalidHorizon,
            Self::MissingCollection(_) => ErrorKind::MissingCollection,
            Self::NoData(_) => ErrorKind::NoData,
            Self::NoResults(_) => ErrorKind::NoResults,
            Self::ForecastFailure { .. } => ErrorKind::ForecastFailure,
            Self::TimedOut(_) => ErrorKind::TimedOut,
            Self::Worker(_) => ErrorKind::Worker,
            Self::Source(_) => ErrorKind::Source,
            Self::Upload(_) => ErrorKind::Upload,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            reason: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reports_serialize_with_snake_case_kind() {
        let err = PipelineError::MissingCollection("orders".into());
        let report = serde_json::to_value(err.report()).unwrap();
        assert_eq!(
            report,
            json!({"kind": "missing_collection", "reason": "orders collection not found"})
        );
    }

    #[test]
    fn forecast_errors_map_to_run_errors() {
        let key = ProductKey::new("B").unwrap();
        let err: PipelineError = ForecastError::failure(&key, "diverged").into();
        assert_eq!(err.kind(), ErrorKind::ForecastFailure);
        assert_eq!(err.to_string(), "prediction error for B: diverged");

        let err: PipelineError = ForecastError::InvalidHorizon(0).into();
        assert_eq!(err.kind(), ErrorKind::InvalidHorizon);

        let err: PipelineError = PoolError::Worker("cancelled".into()).into();
        assert_eq!(err.kind(), ErrorKind::Worker);
    }
}
