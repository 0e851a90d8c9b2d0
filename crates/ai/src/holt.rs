//! Damped Holt linear-trend exponential smoothing.
//!
//! Model:
//! - level/trend recursion over the daily history (missing days count as 0 sales);
//! - h-step forecast `level + (phi + phi^2 + .. + phi^h) * trend`;
//! - interval `point ± z * sigma * sqrt(h)`, sigma = RMS of one-step in-sample residuals.
//!
//! Parameters are fixed by configuration; nothing is tuned per series.

use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use restock_core::SeriesPoint;

use crate::forecaster::{Estimate, Forecaster};
use crate::result::ProcedureError;

/// Widest calendar span (first to last observation) expanded day by day.
pub const DEFAULT_MAX_FILLED_DAYS: usize = 36_600;

#[derive(Debug, Clone)]
pub struct HoltForecaster {
    alpha: f64,
    beta: f64,
    phi: f64,
    interval_width: f64,
    /// Standard-normal quantile for `interval_width`.
    z: f64,
    fill_gaps: bool,
    max_filled_days: usize,
}

impl Default for HoltForecaster {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.3,
            phi: 0.9,
            interval_width: 0.8,
            // Two-sided 80% interval.
            z: 1.281_551_565_544_600_5,
            fill_gaps: true,
            max_filled_days: DEFAULT_MAX_FILLED_DAYS,
        }
    }
}

impl HoltForecaster {
    /// `alpha` and `beta` must lie in (0, 1]; `phi` (trend damping) in (0, 1].
    pub fn new(alpha: f64, beta: f64, phi: f64) -> Result<Self, ProcedureError> {
        for (name, v) in [("alpha", alpha), ("beta", beta), ("phi", phi)] {
            if !(v.is_finite() && v > 0.0 && v <= 1.0) {
                return Err(ProcedureError::InvalidParameter(format!(
                    "{name} must be in (0, 1], got {v}"
                )));
            }
        }
        Ok(Self {
            alpha,
            beta,
            phi,
            ..Self::default()
        })
    }

    /// Coverage of the uncertainty interval, strictly between 0 and 1.
    pub fn with_interval_width(mut self, width: f64) -> Result<Self, ProcedureError> {
        if !(width.is_finite() && width > 0.0 && width < 1.0) {
            return Err(ProcedureError::InvalidParameter(format!(
                "interval width must be in (0, 1), got {width}"
            )));
        }
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ProcedureError::InvalidParameter(e.to_string()))?;
        self.z = normal.inverse_cdf(0.5 + width / 2.0);
        self.interval_width = width;
        Ok(self)
    }

    /// When disabled, only observed days are smoothed (gaps are ignored).
    pub fn with_gap_filling(mut self, fill_gaps: bool) -> Self {
        self.fill_gaps = fill_gaps;
        self
    }

    /// Histories spanning more days than this are smoothed without gap filling.
    pub fn with_max_filled_days(mut self, days: usize) -> Self {
        self.max_filled_days = days;
        self
    }

    pub fn interval_width(&self) -> f64 {
        self.interval_width
    }

    fn daily_values(&self, history: &[SeriesPoint]) -> Vec<f64> {
        let observed = || -> Vec<f64> { history.iter().map(|p| p.quantity).collect() };
        if !self.fill_gaps {
            return observed();
        }
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Vec::new();
        };
        let span = (last.date - first.date).num_days().saturating_add(1);
        let fits = usize::try_from(span).is_ok_and(|days| days <= self.max_filled_days);
        if !fits {
            debug!(span, max = self.max_filled_days, "history too wide for gap filling");
            return observed();
        }

        let mut values = Vec::with_capacity(history.len());
        values.push(first.quantity);
        for pair in history.windows(2) {
            let gap = (pair[1].date - pair[0].date).num_days() - 1;
            values.extend(std::iter::repeat_n(0.0, usize::try_from(gap).unwrap_or(0)));
            values.push(pair[1].quantity);
        }
        values
    }
}

impl Forecaster for HoltForecaster {
    fn name(&self) -> &str {
        "damped-holt"
    }

    fn fit_predict(
        &self,
        history: &[SeriesPoint],
        horizon: usize,
    ) -> Result<Vec<Estimate>, ProcedureError> {
        let y = self.daily_values(history);
        if y.len() < 2 {
            return Err(ProcedureError::Degenerate(format!(
                "need at least 2 values, got {}",
                y.len()
            )));
        }

        let mut level = y[0];
        let mut trend = y[1] - y[0];
        let mut sq_err = 0.0;
        for &value in &y[1..] {
            let predicted = level + self.phi * trend;
            let residual = value - predicted;
            sq_err += residual * residual;

            let new_level = self.alpha * value + (1.0 - self.alpha) * predicted;
            trend = self.beta * (new_level - level) + (1.0 - self.beta) * self.phi * trend;
            level = new_level;
        }
        let sigma = (sq_err / (y.len() - 1) as f64).sqrt();

        if !(level.is_finite() && trend.is_finite() && sigma.is_finite()) {
            return Err(ProcedureError::Numerical(format!(
                "state diverged (level={level}, trend={trend}, sigma={sigma})"
            )));
        }

        let mut damped = 0.0;
        let mut phi_pow = 1.0;
        let estimates = (1..=horizon)
            .map(|h| {
                phi_pow *= self.phi;
                damped += phi_pow;
                let point = level + damped * trend;
                let half_width = self.z * sigma * (h as f64).sqrt();
                Estimate {
                    point,
                    lower: point - half_width,
                    upper: point + half_width,
                }
            })
            .collect();
        Ok(estimates)
    }
}
