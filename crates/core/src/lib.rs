//! `restock-core`: shared data model for the demand forecasting pipeline.
//!
//! This crate contains **pure** value types and identifiers (no IO, no async,
//! no forecasting logic). Every other crate in the workspace builds on it.

pub mod error;
pub mod id;
pub mod model;
pub mod value_object;

pub use error::{DomainError, DomainResult, InsufficientData};
pub use id::{ProductKey, RunId, object_id_created_at};
pub use model::{
    ForecastPoint, MIN_FORECAST_POINTS, Observation, ProductSeries, RecommendationResult,
    SeriesPoint, TabularForecast, round_cents,
};
pub use value_object::ValueObject;
