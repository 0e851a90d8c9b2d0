//! `restock-ai`
//!
//! **Responsibility:** the forecast engine boundary.
//!
//! - The statistical procedure is a replaceable [`Forecaster`]; the engine
//!   only relies on its input/output contract.
//! - Forecasts are insights, not business quantities: values come back
//!   unclamped and may be negative. Turning them into stock numbers is the
//!   inventory crate's job.
//! - Nothing here spawns threads or touches IO; callers decide where jobs run.

pub mod forecaster;
pub mod holt;
pub mod job;
pub mod result;

pub use forecaster::{DEFAULT_MAX_HORIZON, Estimate, ForecastEngine, Forecaster};
pub use holt::{DEFAULT_MAX_FILLED_DAYS, HoltForecaster};
pub use job::{AiJob, ForecastJob};
pub use result::{ForecastError, ProcedureError, ProductForecast};
