//! Pipeline orchestration: one async coordinator per request, CPU-bound
//! forecasting fanned out to the worker pool.

pub mod context;
pub mod error;
pub mod orchestrator;
pub mod upload;

pub use context::PipelineContext;
pub use error::{ErrorKind, ErrorReport, PipelineError};
pub use orchestrator::{ForecastRequest, ProductFailure, RunPhase, RunReport};
pub use upload::{UPLOAD_PRODUCT_KEY, forecast_upload};
