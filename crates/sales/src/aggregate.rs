//! Series aggregator: observations → one ordered daily series per product.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use restock_core::{InsufficientData, Observation, ProductKey, ProductSeries};

/// Aggregated series keyed by product, ordered by key for deterministic iteration.
pub type AggregatedSeries = BTreeMap<ProductKey, ProductSeries>;

/// Group observations by product and day, summing same-day quantities.
///
/// Products with too few distinct dates are kept (see
/// [`ProductSeries::is_eligible`]) so callers can tell "no data" from "not
/// enough data".
pub fn aggregate<I>(observations: I) -> AggregatedSeries
where
    I: IntoIterator<Item = Observation>,
{
    let mut totals: BTreeMap<ProductKey, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for obs in observations {
        *totals
            .entry(obs.product_key().clone())
            .or_default()
            .entry(obs.date())
            .or_insert(0.0) += obs.quantity();
    }

    totals
        .into_iter()
        .map(|(key, days)| {
            let series = ProductSeries::from_daily_totals(key.clone(), days);
            (key, series)
        })
        .collect()
}

/// Split aggregated series into forecastable ones and those lacking history.
pub fn partition_eligible(series: AggregatedSeries) -> (Vec<ProductSeries>, Vec<InsufficientData>) {
    let mut eligible = Vec::new();
    let mut skipped = Vec::new();
    for (_, s) in series {
        match s.ensure_eligible() {
            Ok(()) => eligible.push(s),
            Err(e) => skipped.push(e),
        }
    }
    (eligible, skipped)
}
