//! Inventory recommendations.
//!
//! Pure numeric rules that turn forecast demand and current stock into a
//! reorder quantity (no IO, no async, no forecasting).

pub mod recommend;

pub use recommend::{
    DEFAULT_SAFETY_MARGIN, Recommendation, SafetyMargin, coerce_stock, recommend,
    recommend_from_total,
};
