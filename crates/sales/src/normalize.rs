//! Record normalizer: schema-unknown documents → canonical observations.
//!
//! Field lookup is an ordered list of canonical names, tried in sequence,
//! followed by a type-based scan of the record when no name matches.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use restock_core::{Observation, ProductKey, object_id_created_at};

use crate::record::{
    RawRecord, coerce_quantity, is_numeric, key_text, looks_like_date, object_id_text,
    parse_date_value,
};

/// Canonical date field names, highest priority first.
pub const DATE_FIELDS: [&str; 6] = ["date", "ds", "timestamp", "time", "createdAt", "created_at"];

/// Canonical quantity field names for flat rows.
pub const QUANTITY_FIELDS: [&str; 5] = ["y", "qty", "quantity", "count", "value"];

/// Product reference fields for flat rows.
pub const PRODUCT_FIELDS: [&str; 6] = ["product", "product_id", "productId", "sku", "symbol", "name"];

/// Fields holding nested order lines.
pub const LINE_ITEM_FIELDS: [&str; 4] = ["orderItems", "order_items", "items", "lines"];

const LINE_QUANTITY_FIELDS: [&str; 3] = ["qty", "quantity", "count"];

/// Product reference fields inside a line item.
pub const LINE_PRODUCT_FIELDS: [&str; 2] = ["product", "name"];
const OBJECT_ID_FIELD: &str = "_id";

/// A record carries no usable field for one of the canonical roles.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no date-like field found in record")]
    NoDateField,

    #[error("field `{field}` holds an unparsable date: {value}")]
    UnparsableDate { field: String, value: String },

    #[error("no numeric quantity field found in record")]
    NoQuantityField,

    #[error("no product field found in record and no default product configured")]
    NoProductField,
}

/// Converts raw records into observations.
///
/// A flat row yields one observation; an order document yields one per line
/// item that names a product.
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    default_product: Option<ProductKey>,
}

/// Batch result: usable observations plus how many records were discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    pub observations: Vec<Observation>,
    pub rejected: usize,
}

struct ResolvedDate<'a> {
    field: &'a str,
    date: NaiveDate,
}

impl RecordNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Product key used for flat rows that do not name a product (single-series uploads).
    pub fn with_default_product(mut self, key: ProductKey) -> Self {
        self.default_product = Some(key);
        self
    }

    pub fn normalize(&self, record: &RawRecord) -> Result<Vec<Observation>, SchemaError> {
        let date = resolve_date(record)?;

        if let Some(items) = line_items(record) {
            return Ok(normalize_lines(date.date, items));
        }

        let (product_field, product) = self.resolve_product(record)?;
        let quantity_field = resolve_quantity_field(record, date.field, product_field)?;
        let quantity = record.get(quantity_field).map(coerce_quantity).unwrap_or(0.0);

        Ok(vec![Observation::new(product, date.date, quantity)])
    }

    /// Normalize a batch. A `SchemaError` discards only the offending record.
    pub fn normalize_all<'a, I>(&self, records: I) -> NormalizeOutcome
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        let mut outcome = NormalizeOutcome::default();
        for (index, record) in records.into_iter().enumerate() {
            match self.normalize(record) {
                Ok(mut observations) => outcome.observations.append(&mut observations),
                Err(e) => {
                    debug!(record = index, error = %e, "discarding record");
                    outcome.rejected += 1;
                }
            }
        }
        outcome
    }

    /// Product key plus the field it came from (`None` for the default product).
    fn resolve_product<'r>(
        &self,
        record: &'r RawRecord,
    ) -> Result<(Option<&'r str>, ProductKey), SchemaError> {
        let named = PRODUCT_FIELDS.iter().find_map(|name| {
            let (field, value) = record.get_key_value(*name)?;
            let key = key_text(value).and_then(|text| ProductKey::new(text).ok())?;
            Some((Some(field.as_str()), key))
        });
        named
            .or_else(|| self.default_product.clone().map(|key| (None, key)))
            .ok_or(SchemaError::NoProductField)
    }
}

fn resolve_date(record: &RawRecord) -> Result<ResolvedDate<'_>, SchemaError> {
    for name in DATE_FIELDS {
        let Some((field, value)) = record.get_key_value(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        return parse_date_value(value)
            .map(|date| ResolvedDate { field, date })
            .ok_or_else(|| SchemaError::UnparsableDate {
                field: field.clone(),
                value: value.to_string(),
            });
    }

    let scanned = record.iter().find_map(|(field, value)| {
        if !looks_like_date(value) {
            return None;
        }
        parse_date_value(value).map(|date| ResolvedDate { field, date })
    });
    if let Some(resolved) = scanned {
        return Ok(resolved);
    }

    record
        .get_key_value(OBJECT_ID_FIELD)
        .and_then(|(field, value)| {
            let created = object_id_created_at(object_id_text(value)?)?;
            Some(ResolvedDate {
                field,
                date: created.date_naive(),
            })
        })
        .ok_or(SchemaError::NoDateField)
}

fn resolve_quantity_field<'a>(
    record: &'a RawRecord,
    date_field: &str,
    product_field: Option<&str>,
) -> Result<&'a str, SchemaError> {
    if let Some(name) = QUANTITY_FIELDS
        .into_iter()
        .find(|name| record.contains_key(*name))
    {
        return Ok(name);
    }
    record
        .iter()
        .find(|(field, value)| {
            field.as_str() != date_field
                && Some(field.as_str()) != product_field
                && is_numeric(value)
        })
        .map(|(field, _)| field.as_str())
        .ok_or(SchemaError::NoQuantityField)
}

fn line_items(record: &RawRecord) -> Option<&Vec<Value>> {
    LINE_ITEM_FIELDS
        .iter()
        .find_map(|name| record.get(*name).and_then(Value::as_array))
}

fn normalize_lines(date: NaiveDate, items: &[Value]) -> Vec<Observation> {
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            let product = LINE_PRODUCT_FIELDS
                .iter()
                .filter_map(|name| item.get(*name))
                .find_map(|v| key_text(v).and_then(|text| ProductKey::new(text).ok()))?;
            let quantity = LINE_QUANTITY_FIELDS
                .iter()
                .find_map(|name| item.get(*name).filter(|v| !v.is_null()))
                .map(coerce_quantity)
                .unwrap_or(0.0);
            Some(Observation::new(product, date, quantity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn flat_row_with_canonical_fields() {
        let r = record(json!({"product": "A", "date": "2024-01-01", "qty": 5}));
        let obs = RecordNormalizer::new().normalize(&r).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].product_key().as_str(), "A");
        assert_eq!(obs[0].date(), ymd(2024, 1, 1));
        assert_eq!(obs[0].quantity(), 5.0);
    }

    #[test]
    fn date_priority_wins_over_heuristic_scan() {
        let r = record(json!({
            "note": "2023-12-31 shipped late",
            "created_at": "2024-02-02T08:00:00Z",
            "product": "A",
            "count": 1,
        }));
        let obs = RecordNormalizer::new().normalize(&r).unwrap();
        assert_eq!(obs[0].date(), ymd(2024, 2, 2));
    }

    #[test]
    fn heuristic_scan_picks_first_date_like_string() {
        let r = record(json!({
            "sku": "AB-12",
            "ordered_on": "2024-03-04",
            "units": 7,
        }));
        let obs = RecordNormalizer::new().normalize(&r).unwrap();
        assert_eq!(obs[0].date(), ymd(2024, 3, 4));
        assert_eq!(obs[0].product_key().as_str(), "AB-12");
        assert_eq!(obs[0].quantity(), 7.0);
    }

    #[test]
    fn object_id_supplies_creation_date() {
        let r = record(json!({
            "_id": {"$oid": "65920080aaaaaaaaaaaaaaaa"},
            "orderItems": [{"product": "p1", "qty": 2}],
        }));
        let obs = RecordNormalizer::new().normalize(&r).unwrap();
        assert_eq!(obs[0].date(), ymd(2024, 1, 1));
    }

    #[test]
    fn quantity_falls_back_to_first_numeric_field() {
        let r = record(json!({"ds": "2024-01-01", "label": "x", "units": 4, "price": 9.5, "product": "A"}));
        let obs = RecordNormalizer::new().normalize(&r).unwrap();
        assert_eq!(obs[0].quantity(), 4.0);
    }

    #[test]
    fn numeric_product_reference_is_not_a_quantity() {
        let r = record(json!({"date": "2024-01-01", "product_id": 42, "units": 3}));
        let obs = RecordNormalizer::new().normalize(&r).unwrap();
        assert_eq!(obs[0].product_key().as_str(), "42");
        assert_eq!(obs[0].quantity(), 3.0);

        let r = record(json!({"date": "2024-01-01", "product_id": 42}));
        assert_eq!(
            RecordNormalizer::new().normalize(&r),
            Err(SchemaError::NoQuantityField)
        );
    }

    #[test]
    fn bad_quantity_coerces_to_zero() {
        let r = record(json!({"product": "A", "date": "2024-01-01", "qty": "lots"}));
        let obs = RecordNormalizer::new().normalize(&r).unwrap();
        assert_eq!(obs[0].quantity(), 0.0);
    }

    #[test]
    fn order_lines_become_one_observation_each() {
        let r = record(json!({
            "createdAt": "2024-01-05T10:00:00Z",
            "orderItems": [
                {"product": "p1", "name": "Phone", "qty": 2},
                {"name": "Case", "quantity": "3"},
                {"qty": 9},
                {"product": "p2"},
            ],
        }));
        let obs = RecordNormalizer::new().normalize(&r).unwrap();
        let summary: Vec<_> = obs
            .iter()
            .map(|o| (o.product_key().as_str().to_string(), o.quantity()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("p1".to_string(), 2.0),
                ("Case".to_string(), 3.0),
                ("p2".to_string(), 0.0),
            ]
        );
        assert!(obs.iter().all(|o| o.date() == ymd(2024, 1, 5)));
    }

    #[test]
    fn missing_date_and_quantity_is_a_schema_error() {
        let r = record(json!({"product": "A", "comment": "hello"}));
        assert_eq!(
            RecordNormalizer::new().normalize(&r),
            Err(SchemaError::NoDateField)
        );

        let r = record(json!({"product": "A", "date": "2024-01-01"}));
        assert_eq!(
            RecordNormalizer::new().normalize(&r),
            Err(SchemaError::NoQuantityField)
        );
    }

    #[test]
    fn unparsable_canonical_date_is_reported() {
        let r = record(json!({"product": "A", "date": "yesterday", "qty": 1}));
        assert!(matches!(
            RecordNormalizer::new().normalize(&r),
            Err(SchemaError::UnparsableDate { ref field, .. }) if field == "date"
        ));
    }

    #[test]
    fn default_product_applies_to_anonymous_rows() {
        let r = record(json!({"ds": "2024-01-01", "y": 3}));
        assert_eq!(
            RecordNormalizer::new().normalize(&r),
            Err(SchemaError::NoProductField)
        );
        let n = RecordNormalizer::new().with_default_product(ProductKey::new("upload").unwrap());
        assert_eq!(n.normalize(&r).unwrap()[0].product_key().as_str(), "upload");
    }

    #[test]
    fn batch_discards_only_bad_records() {
        let records = vec![
            record(json!({"product": "A", "date": "2024-01-01", "qty": 5})),
            record(json!({"nothing": "useful"})),
            record(json!({"product": "A", "date": "2024-01-02", "qty": 4})),
        ];
        let outcome = RecordNormalizer::new().normalize_all(&records);
        assert_eq!(outcome.observations.len(), 2);
        assert_eq!(outcome.rejected, 1);
    }
}
