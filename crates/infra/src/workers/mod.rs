//! Background workers.

pub mod forecast_pool;

pub use forecast_pool::{ForecastPool, PoolError, PoolReport};
