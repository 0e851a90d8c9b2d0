use serde::{Deserialize, Serialize};
use thiserror::Error;

use restock_core::{ForecastPoint, InsufficientData, ProductKey};

/// Forecast for one product: `horizon` contiguous days after its last observation.
///
/// This is an insight handed to the recommender, not a persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductForecast {
    pub product_key: ProductKey,
    pub points: Vec<ForecastPoint>,
}

impl ProductForecast {
    pub fn new(product_key: ProductKey, points: Vec<ForecastPoint>) -> Self {
        Self {
            product_key,
            points,
        }
    }

    /// Sum of point estimates (may be negative).
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.point_estimate).sum()
    }
}

/// Engine-level failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    /// Series too short; callers skip the product.
    #[error(transparent)]
    InsufficientData(#[from] InsufficientData),

    /// Horizon must be at least one day and within the engine's maximum.
    #[error("invalid horizon {0}: must be between 1 and the configured maximum")]
    InvalidHorizon(i64),

    /// The procedure failed on otherwise valid input.
    #[error("forecast failed for {product_key}: {reason}")]
    ForecastFailure {
        product_key: ProductKey,
        reason: String,
    },
}

impl ForecastError {
    pub fn failure(product_key: &ProductKey, reason: impl Into<String>) -> Self {
        Self::ForecastFailure {
            product_key: product_key.clone(),
            reason: reason.into(),
        }
    }
}

/// Failures raised by a forecasting procedure itself.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProcedureError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("degenerate input: {0}")]
    Degenerate(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}
