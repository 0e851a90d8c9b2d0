//! Pipeline configuration.
//!
//! Defaults are usable as-is; `from_env` overrides them from `RESTOCK_*`
//! variables. Unset variables keep the default, malformed ones are an error.

use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use restock_ai::{
    DEFAULT_MAX_FILLED_DAYS, DEFAULT_MAX_HORIZON, ForecastEngine, HoltForecaster, ProcedureError,
};
use restock_inventory::SafetyMargin;

pub const ENV_HORIZON_DAYS: &str = "RESTOCK_HORIZON_DAYS";
pub const ENV_SAFETY_MARGIN: &str = "RESTOCK_SAFETY_MARGIN";
pub const ENV_MAX_RECORDS: &str = "RESTOCK_MAX_RECORDS";
pub const ENV_WORKERS: &str = "RESTOCK_WORKERS";
pub const ENV_RUN_TIMEOUT_SECS: &str = "RESTOCK_RUN_TIMEOUT_SECS";
pub const ENV_FAILURE_POLICY: &str = "RESTOCK_FAILURE_POLICY";
pub const ENV_MAX_HORIZON_DAYS: &str = "RESTOCK_MAX_HORIZON_DAYS";
pub const ENV_MAX_FILLED_DAYS: &str = "RESTOCK_MAX_FILLED_DAYS";

pub const DEFAULT_HORIZON_DAYS: i64 = 30;
pub const DEFAULT_MAX_RECORDS: usize = 20_000;
pub const DEFAULT_ORDERS_COLLECTION: &str = "orders";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid forecaster parameters: {0}")]
    Forecaster(#[from] ProcedureError),
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// What a run does when one product's forecast fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the run and discard every result.
    #[default]
    Strict,
    /// Record the failure and keep the other products.
    BestEffort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(Self::Strict),
            "best_effort" | "besteffort" => Ok(Self::BestEffort),
            other => Err(format!("expected `strict` or `best_effort`, got `{other}`")),
        }
    }
}

/// Smoothing parameters for the default damped-Holt procedure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoltParams {
    pub alpha: f64,
    pub beta: f64,
    pub phi: f64,
}

impl Default for HoltParams {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.3,
            phi: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub horizon_days: i64,
    /// Longest horizon a request may ask for.
    pub max_horizon_days: usize,
    pub safety_margin: SafetyMargin,
    pub max_records: usize,
    pub workers: NonZeroUsize,
    /// Upper bound for the forecasting phase; `None` waits indefinitely.
    pub run_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
    pub interval_width: f64,
    pub holt: HoltParams,
    /// Widest history span the default procedure fills day by day.
    pub max_filled_days: usize,
    pub orders_collection: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            max_horizon_days: DEFAULT_MAX_HORIZON,
            safety_margin: SafetyMargin::default(),
            max_records: DEFAULT_MAX_RECORDS,
            workers: default_workers(),
            run_timeout: None,
            failure_policy: FailurePolicy::default(),
            interval_width: 0.8,
            holt: HoltParams::default(),
            max_filled_days: DEFAULT_MAX_FILLED_DAYS,
            orders_collection: DEFAULT_ORDERS_COLLECTION.to_string(),
        }
    }
}

fn default_workers() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

impl PipelineConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using an arbitrary variable lookup (tests, embedded callers).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (var, v))
        };

        if let Some((var, raw)) = get(ENV_MAX_HORIZON_DAYS) {
            let max: usize = parse(var, &raw)?;
            if max == 0 {
                return Err(ConfigError::invalid(var, &raw, "must be >= 1"));
            }
            cfg.max_horizon_days = max;
        }
        if let Some((var, raw)) = get(ENV_HORIZON_DAYS) {
            let days: i64 = parse(var, &raw)?;
            let in_range = usize::try_from(days).is_ok_and(|d| (1..=cfg.max_horizon_days).contains(&d));
            if !in_range {
                return Err(ConfigError::invalid(
                    var,
                    &raw,
                    format!("must be between 1 and {}", cfg.max_horizon_days),
                ));
            }
            cfg.horizon_days = days;
        }
        if let Some((var, raw)) = get(ENV_SAFETY_MARGIN) {
            let margin: f64 = parse(var, &raw)?;
            cfg.safety_margin = SafetyMargin::new(margin)
                .map_err(|e| ConfigError::invalid(var, &raw, e.to_string()))?;
        }
        if let Some((var, raw)) = get(ENV_MAX_RECORDS) {
            let max: usize = parse(var, &raw)?;
            if max == 0 {
                return Err(ConfigError::invalid(var, &raw, "must be >= 1"));
            }
            cfg.max_records = max;
        }
        if let Some((var, raw)) = get(ENV_WORKERS) {
            cfg.workers = parse(var, &raw)?;
        }
        if let Some((var, raw)) = get(ENV_RUN_TIMEOUT_SECS) {
            let secs: u64 = parse(var, &raw)?;
            // 0 disables the timeout.
            cfg.run_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some((var, raw)) = get(ENV_MAX_FILLED_DAYS) {
            cfg.max_filled_days = parse(var, &raw)?;
        }
        if let Some((var, raw)) = get(ENV_FAILURE_POLICY) {
            cfg.failure_policy = raw
                .parse()
                .map_err(|reason: String| ConfigError::invalid(var, &raw, reason))?;
        }

        Ok(cfg)
    }

    pub fn with_horizon_days(mut self, days: i64) -> Self {
        self.horizon_days = days;
        self
    }

    pub fn with_max_horizon_days(mut self, days: usize) -> Self {
        self.max_horizon_days = days;
        self
    }

    pub fn with_safety_margin(mut self, margin: SafetyMargin) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_interval_width(mut self, width: f64) -> Self {
        self.interval_width = width;
        self
    }

    pub fn with_holt(mut self, holt: HoltParams) -> Self {
        self.holt = holt;
        self
    }

    pub fn with_max_filled_days(mut self, days: usize) -> Self {
        self.max_filled_days = days;
        self
    }

    pub fn with_orders_collection(mut self, name: impl Into<String>) -> Self {
        self.orders_collection = name.into();
        self
    }

    /// Build the default forecasting procedure from these settings.
    pub fn forecaster(&self) -> Result<HoltForecaster, ConfigError> {
        let HoltParams { alpha, beta, phi } = self.holt;
        Ok(HoltForecaster::new(alpha, beta, phi)?
            .with_interval_width(self.interval_width)?
            .with_max_filled_days(self.max_filled_days))
    }

    /// Forecast engine running the default procedure, bounded by `max_horizon_days`.
    pub fn engine(&self) -> Result<ForecastEngine, ConfigError> {
        Ok(ForecastEngine::new(self.forecaster()?).with_max_horizon(self.max_horizon_days))
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::invalid(var, raw, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<PipelineConfig, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.horizon_days, 30);
        assert_eq!(cfg.safety_margin.value(), 0.2);
        assert_eq!(cfg.max_records, 20_000);
        assert_eq!(cfg.run_timeout, None);
        assert_eq!(cfg.failure_policy, FailurePolicy::Strict);
        assert_eq!(cfg.orders_collection, "orders");
        assert_eq!(cfg.max_horizon_days, 3_650);
        assert!(cfg.forecaster().is_ok());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = load(&[
            (ENV_HORIZON_DAYS, "14"),
            (ENV_SAFETY_MARGIN, "0.5"),
            (ENV_MAX_RECORDS, "100"),
            (ENV_WORKERS, "2"),
            (ENV_RUN_TIMEOUT_SECS, "10"),
            (ENV_FAILURE_POLICY, "best-effort"),
        ])
        .unwrap();
        assert_eq!(cfg.horizon_days, 14);
        assert_eq!(cfg.safety_margin.value(), 0.5);
        assert_eq!(cfg.max_records, 100);
        assert_eq!(cfg.workers.get(), 2);
        assert_eq!(cfg.run_timeout, Some(Duration::from_secs(10)));
        assert_eq!(cfg.failure_policy, FailurePolicy::BestEffort);
    }

    #[test]
    fn blank_values_keep_defaults() {
        let cfg = load(&[(ENV_HORIZON_DAYS, "  "), (ENV_RUN_TIMEOUT_SECS, "0")]).unwrap();
        assert_eq!(cfg.horizon_days, 30);
        assert_eq!(cfg.run_timeout, None);
    }

    #[test]
    fn malformed_values_are_errors() {
        for (var, value) in [
            (ENV_HORIZON_DAYS, "zero"),
            (ENV_HORIZON_DAYS, "0"),
            (ENV_SAFETY_MARGIN, "-1"),
            (ENV_MAX_RECORDS, "0"),
            (ENV_WORKERS, "0"),
            (ENV_FAILURE_POLICY, "sometimes"),
            (ENV_MAX_HORIZON_DAYS, "0"),
            (ENV_HORIZON_DAYS, "1000000000000"),
        ] {
            assert!(
                matches!(load(&[(var, value)]), Err(ConfigError::InvalidValue { .. })),
                "{var}={value} should be rejected"
            );
        }
    }

    #[test]
    fn engine_enforces_max_horizon() {
        let cfg = load(&[(ENV_MAX_HORIZON_DAYS, "60"), (ENV_HORIZON_DAYS, "45")]).unwrap();
        assert_eq!(cfg.horizon_days, 45);
        let engine = cfg.engine().unwrap();
        assert_eq!(engine.max_horizon(), 60);
        assert!(engine.validate_horizon(60).is_ok());
        assert!(engine.validate_horizon(61).is_err());

        assert!(load(&[(ENV_MAX_HORIZON_DAYS, "20"), (ENV_HORIZON_DAYS, "45")]).is_err());
    }

    #[test]
    fn bad_forecaster_parameters_surface_on_build() {
        let cfg = PipelineConfig::default().with_holt(HoltParams {
            alpha: 2.0,
            ..HoltParams::default()
        });
        assert!(matches!(cfg.forecaster(), Err(ConfigError::Forecaster(_))));

        let cfg = PipelineConfig::default().with_interval_width(1.5);
        assert!(cfg.forecaster().is_err());
    }
}
