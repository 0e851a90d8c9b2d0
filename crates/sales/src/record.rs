//! Raw record shape and value-level coercions.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// An arbitrary sales document: field name → JSON value, in source order.
pub type RawRecord = serde_json::Map<String, Value>;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

// Epoch values above this are read as milliseconds (year ~5138 in seconds).
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Calendar years accepted as sales dates; anything outside is treated as unparsable.
pub const DATE_YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2999;

/// Coerce a quantity cell to a number. Anything non-numeric becomes 0.
pub fn coerce_quantity(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(q) if q.is_finite() => q,
        _ => 0.0,
    }
}

/// Calendar day of a date-ish value, or `None` if it cannot be read as one.
///
/// Timestamps carrying an offset are converted to UTC before truncation.
/// Days outside [`DATE_YEAR_RANGE`] are rejected.
pub(crate) fn parse_date_value(value: &Value) -> Option<NaiveDate> {
    let date = match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n.as_i64().and_then(epoch_to_date),
        Value::Object(map) => match map.get("$date")? {
            Value::String(s) => parse_date_str(s),
            Value::Number(n) => n.as_i64().and_then(millis_to_date),
            Value::Object(inner) => inner
                .get("$numberLong")
                .and_then(Value::as_str)
                .and_then(|s| s.trim().parse::<i64>().ok())
                .and_then(millis_to_date),
            _ => None,
        },
        _ => None,
    };
    date.filter(is_plausible)
}

fn is_plausible(date: &NaiveDate) -> bool {
    DATE_YEAR_RANGE.contains(&date.year())
}

pub(crate) fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn epoch_to_date(raw: i64) -> Option<NaiveDate> {
    if raw.abs() >= EPOCH_MILLIS_THRESHOLD {
        millis_to_date(raw)
    } else {
        DateTime::<Utc>::from_timestamp(raw, 0).map(|dt| dt.date_naive())
    }
}

fn millis_to_date(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

/// Heuristic used when no canonical date field exists: a string with a `-`
/// separator that is at least 8 characters long.
pub(crate) fn looks_like_date(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains('-') && s.chars().count() >= 8,
        _ => false,
    }
}

pub(crate) fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Number(_))
}

/// Textual identity of a product reference (`"abc"`, `42`, `{"$oid": "…"}`).
pub fn key_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => map.get("$oid")?.as_str()?.trim().to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Hex object id held by a field (plain string or `{"$oid": …}`).
pub(crate) fn object_id_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("$oid")?.as_str(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_date_shapes() {
        let jan5 = ymd(2024, 1, 5);
        for raw in [
            "2024-01-05",
            "2024/01/05",
            "2024-01-05 13:45:00",
            "2024-01-05T13:45:00.123",
            "2024-01-05T13:45:00Z",
            "2024-01-05T13:45:00.5+00:00",
            "2024-01-05T13:45",
        ] {
            assert_eq!(parse_date_str(raw), Some(jan5), "{raw}");
        }
        assert_eq!(parse_date_str("05-01-2024 nonsense"), None);
    }

    #[test]
    fn offsets_are_converted_to_utc_day() {
        // 01:00 at +05:00 is still the previous day in UTC.
        assert_eq!(
            parse_date_str("2024-01-05T01:00:00+05:00"),
            Some(ymd(2024, 1, 4))
        );
    }

    #[test]
    fn extended_json_dates() {
        assert_eq!(
            parse_date_value(&json!({"$date": "2024-03-01T10:00:00Z"})),
            Some(ymd(2024, 3, 1))
        );
        assert_eq!(
            parse_date_value(&json!({"$date": 1_704_067_200_000_i64})),
            Some(ymd(2024, 1, 1))
        );
        assert_eq!(
            parse_date_value(&json!({"$date": {"$numberLong": "1704067200000"}})),
            Some(ymd(2024, 1, 1))
        );
        assert_eq!(parse_date_value(&json!(1_704_067_200)), Some(ymd(2024, 1, 1)));
    }

    #[test]
    fn far_out_dates_are_rejected() {
        assert_eq!(parse_date_value(&json!({"$date": 8_000_000_000_000_000_i64})), None);
        assert_eq!(parse_date_value(&json!(-5_000_000_000_i64)), None);
        assert_eq!(parse_date_value(&json!("0001-01-01")), None);
        assert_eq!(parse_date_value(&json!("2999-12-31")), Some(ymd(2999, 12, 31)));
    }

    #[test]
    fn quantity_coercion_never_fails() {
        assert_eq!(coerce_quantity(&json!(3)), 3.0);
        assert_eq!(coerce_quantity(&json!(" 2.5 ")), 2.5);
        assert_eq!(coerce_quantity(&json!("two")), 0.0);
        assert_eq!(coerce_quantity(&json!(null)), 0.0);
        assert_eq!(coerce_quantity(&json!(true)), 0.0);
        assert_eq!(coerce_quantity(&json!("inf")), 0.0);
    }

    #[test]
    fn key_text_accepts_ids_and_names() {
        assert_eq!(key_text(&json!(" Mouse ")), Some("Mouse".to_string()));
        assert_eq!(key_text(&json!(17)), Some("17".to_string()));
        assert_eq!(
            key_text(&json!({"$oid": "65920080aaaaaaaaaaaaaaaa"})),
            Some("65920080aaaaaaaaaaaaaaaa".to_string())
        );
        assert_eq!(key_text(&json!("")), None);
        assert_eq!(key_text(&json!(null)), None);
    }
}
