use serde::{Deserialize, Serialize};
use serde_json::Value;

use restock_core::{DomainError, DomainResult, ForecastPoint, ValueObject, round_cents};

/// Default buffer on top of forecast demand (20%).
pub const DEFAULT_SAFETY_MARGIN: f64 = 0.2;

// Products within this distance of an integer are snapped before `ceil`,
// so 10 * 1.1 = 11.000000000000002 orders 11 units, not 12.
const CEIL_TOLERANCE: f64 = 1e-9;

/// Fractional buffer added to predicted demand. Non-negative and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SafetyMargin(f64);

impl SafetyMargin {
    pub fn new(margin: f64) -> DomainResult<Self> {
        if !(margin.is_finite() && margin >= 0.0) {
            return Err(DomainError::validation(format!(
                "safety margin must be a finite number >= 0, got {margin}"
            )));
        }
        Ok(Self(margin))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for SafetyMargin {
    fn default() -> Self {
        Self(DEFAULT_SAFETY_MARGIN)
    }
}

impl TryFrom<f64> for SafetyMargin {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SafetyMargin> for f64 {
    fn from(m: SafetyMargin) -> Self {
        m.0
    }
}

impl ValueObject for SafetyMargin {}

/// Numeric outcome for one product, before catalog metadata is attached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Unrounded forecast demand, floored at 0.
    pub predicted_sales: f64,
    pub current_stock: u64,
    pub target_inventory: u64,
    pub recommended_stock: u64,
}

impl Recommendation {
    /// `predicted_sales` as reported to callers (2 decimals).
    pub fn predicted_sales_rounded(&self) -> f64 {
        round_cents(self.predicted_sales)
    }
}

impl ValueObject for Recommendation {}

/// Recommend a reorder quantity from forecast points.
///
/// Individual points may be negative; only the sum is floored at 0.
pub fn recommend(
    predicted_points: &[ForecastPoint],
    current_stock: u64,
    margin: SafetyMargin,
) -> Recommendation {
    let total: f64 = predicted_points.iter().map(|p| p.point_estimate).sum();
    recommend_from_total(total, current_stock, margin)
}

/// Same rule starting from already-summed demand.
pub fn recommend_from_total(
    predicted_sales: f64,
    current_stock: u64,
    margin: SafetyMargin,
) -> Recommendation {
    let predicted_sales = if predicted_sales.is_finite() {
        predicted_sales.max(0.0)
    } else {
        0.0
    };

    let target_inventory = ceil_units(predicted_sales * (1.0 + margin.value()));
    let recommended_stock = target_inventory.saturating_sub(current_stock);

    Recommendation {
        predicted_sales,
        current_stock,
        target_inventory,
        recommended_stock,
    }
}

fn ceil_units(quantity: f64) -> u64 {
    if !(quantity.is_finite() && quantity > 0.0) {
        return 0;
    }
    let nearest = quantity.round();
    let units = if (quantity - nearest).abs() <= CEIL_TOLERANCE {
        nearest
    } else {
        quantity.ceil()
    };
    // `as` saturates for values beyond u64::MAX.
    units as u64
}

/// Read a stock level from a catalog field.
///
/// Numbers and numeric strings are truncated toward zero; negative,
/// non-numeric or missing values count as 0.
pub fn coerce_stock(value: Option<&Value>) -> u64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() && v > 0.0 => v.trunc() as u64,
        _ => 0,
    }
}
