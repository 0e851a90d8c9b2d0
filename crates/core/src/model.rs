//! Canonical data model: observations, series, forecasts, recommendations.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult, InsufficientData};
use crate::id::ProductKey;
use crate::value_object::ValueObject;

/// Minimum number of distinct dates a series needs before it can be forecast.
pub const MIN_FORECAST_POINTS: usize = 3;

/// One normalized sale: how much of a product moved on a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    product_key: ProductKey,
    date: NaiveDate,
    quantity: f64,
}

impl Observation {
    /// Negative or non-finite quantities are stored as 0.
    pub fn new(product_key: ProductKey, date: NaiveDate, quantity: f64) -> Self {
        let quantity = if quantity.is_finite() && quantity > 0.0 {
            quantity
        } else {
            0.0
        };
        Self {
            product_key,
            date,
            quantity,
        }
    }

    pub fn product_key(&self) -> &ProductKey {
        &self.product_key
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }
}

impl ValueObject for Observation {}

/// A single (date, quantity) point of a product series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub quantity: f64,
}

impl ValueObject for SeriesPoint {}

/// Daily sales history for one product.
///
/// Invariant: dates are strictly increasing (so each date appears once).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSeries {
    product_key: ProductKey,
    points: Vec<SeriesPoint>,
}

impl ProductSeries {
    pub fn empty(product_key: ProductKey) -> Self {
        Self {
            product_key,
            points: Vec::new(),
        }
    }

    /// Build from already-summed daily totals. Map keys are unique and ordered,
    /// so the invariant holds by construction.
    pub fn from_daily_totals(product_key: ProductKey, totals: BTreeMap<NaiveDate, f64>) -> Self {
        let points = totals
            .into_iter()
            .map(|(date, quantity)| SeriesPoint { date, quantity })
            .collect();
        Self {
            product_key,
            points,
        }
    }

    /// Build from explicit points, rejecting unordered or duplicated dates.
    pub fn from_points(product_key: ProductKey, points: Vec<SeriesPoint>) -> DomainResult<Self> {
        if let Some(w) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(DomainError::invariant(format!(
                "series for {product_key} is not strictly increasing at {} -> {}",
                w[0].date, w[1].date
            )));
        }
        Ok(Self {
            product_key,
            points,
        })
    }

    pub fn product_key(&self) -> &ProductKey {
        &self.product_key
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Number of distinct dates (equal to the number of points).
    pub fn distinct_dates(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn total_quantity(&self) -> f64 {
        self.points.iter().map(|p| p.quantity).sum()
    }

    pub fn is_eligible(&self) -> bool {
        self.distinct_dates() >= MIN_FORECAST_POINTS
    }

    pub fn ensure_eligible(&self) -> Result<(), InsufficientData> {
        if self.is_eligible() {
            return Ok(());
        }
        Err(InsufficientData {
            product_key: self.product_key.clone(),
            distinct_dates: self.distinct_dates(),
            required: MIN_FORECAST_POINTS,
        })
    }
}

impl ValueObject for ProductSeries {}

/// One forecasted day.
///
/// `lower_bound <= point_estimate <= upper_bound` is typical but not
/// guaranteed; near-zero series can produce crossed bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// Date `offset` days after `last_observed` (offset 1 is the first forecast day).
    pub fn day_after(last_observed: NaiveDate, offset: u64) -> Option<NaiveDate> {
        last_observed.checked_add_days(Days::new(offset))
    }
}

impl ValueObject for ForecastPoint {}

/// Restock recommendation for one product. Terminal artifact of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub product_key: ProductKey,
    pub display_name: String,
    /// Forecast demand over the horizon, floored at 0 and rounded to cents.
    pub predicted_sales: f64,
    pub current_stock: u64,
    pub recommended_stock: u64,
}

impl RecommendationResult {
    pub fn new(
        product_key: ProductKey,
        display_name: impl Into<String>,
        predicted_sales: f64,
        current_stock: u64,
        recommended_stock: u64,
    ) -> Self {
        Self {
            product_key,
            display_name: display_name.into(),
            predicted_sales: round_cents(predicted_sales.max(0.0)),
            current_stock,
            recommended_stock,
        }
    }
}

impl ValueObject for RecommendationResult {}

/// Raw-forecast variant used for single-series uploads: full forecast plus totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularForecast {
    pub predictions: Vec<ForecastPoint>,
    pub predicted_sales: f64,
    pub current_stock: u64,
    pub recommended_stock: u64,
}

impl ValueObject for TabularForecast {}

/// Round half away from zero to 2 decimals.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
