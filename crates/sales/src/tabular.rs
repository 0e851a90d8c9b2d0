//! Tabular upload mapping: CSV columns → `{ds, y}` records.
//!
//! Only column selection happens here; the resulting records go through the
//! same [`crate::RecordNormalizer`] as documents from the store.

use serde_json::Value;
use thiserror::Error;

use crate::record::RawRecord;

const DATE_COLUMNS: [&str; 6] = ["ds", "date", "timestamp", "time", "createdat", "created_at"];
const QUANTITY_COLUMNS: [&str; 6] = ["y", "qty", "quantity", "count", "sales", "value"];

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("failed to parse CSV: {0}")]
    Parse(#[from] csv::Error),

    #[error("CSV contains no rows")]
    Empty,
}

/// Indices of the columns feeding the date and quantity fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date_column: usize,
    pub quantity_column: usize,
}

/// A parsed upload: header row plus string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_csv(bytes: &[u8]) -> Result<Self, TabularError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

        if headers.is_empty() || rows.is_empty() {
            return Err(TabularError::Empty);
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Pick date and quantity columns: name match first, then position / type heuristics.
    pub fn column_mapping(&self) -> ColumnMapping {
        let by_name = |candidates: &[&str]| {
            self.headers
                .iter()
                .position(|h| candidates.contains(&h.to_lowercase().as_str()))
        };

        let date_column = by_name(&DATE_COLUMNS[..]).unwrap_or(0);
        let quantity_column = by_name(&QUANTITY_COLUMNS[..])
            .or_else(|| {
                (0..self.headers.len()).find(|&c| c != date_column && self.is_numeric_column(c))
            })
            .unwrap_or(if self.headers.len() > 1 { 1 } else { 0 });

        ColumnMapping {
            date_column,
            quantity_column,
        }
    }

    /// Every row as a `{ds, y}` record. Numeric cells become JSON numbers.
    pub fn to_records(&self) -> Vec<RawRecord> {
        let mapping = self.column_mapping();
        self.rows
            .iter()
            .map(|row| {
                let mut record = RawRecord::new();
                let date = cell(row, mapping.date_column);
                record.insert("ds".to_string(), Value::String(date.to_string()));
                record.insert("y".to_string(), quantity_value(cell(row, mapping.quantity_column)));
                record
            })
            .collect()
    }

    fn is_numeric_column(&self, column: usize) -> bool {
        let mut cells = self
            .rows
            .iter()
            .map(|row| cell(row, column))
            .filter(|c| !c.is_empty())
            .peekable();
        cells.peek().is_some() && cells.all(|c| c.parse::<f64>().is_ok())
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(String::as_str).unwrap_or("")
}

fn quantity_value(raw: &str) -> Value {
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_columns_are_matched_case_insensitively() {
        let table = Table::from_csv(b"Store,Date,Sales\nx,2024-01-01,4\nx,2024-01-02,5\n").unwrap();
        assert_eq!(
            table.column_mapping(),
            ColumnMapping {
                date_column: 1,
                quantity_column: 2
            }
        );
        let records = table.to_records();
        assert_eq!(records[0]["ds"], "2024-01-01");
        assert_eq!(records[0]["y"], 4.0);
    }

    #[test]
    fn falls_back_to_first_column_and_first_numeric_column() {
        let table =
            Table::from_csv(b"day,region,units\n2024-01-01,north,3\n2024-01-02,south,\n").unwrap();
        assert_eq!(
            table.column_mapping(),
            ColumnMapping {
                date_column: 0,
                quantity_column: 2
            }
        );
    }

    #[test]
    fn falls_back_to_second_column_without_numeric_data() {
        let table = Table::from_csv(b"when,what\n2024-01-01,many\n").unwrap();
        assert_eq!(table.column_mapping().quantity_column, 1);
        // Non-numeric cells stay strings and later coerce to zero.
        assert_eq!(table.to_records()[0]["y"], "many");
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(matches!(Table::from_csv(b"ds,y\n"), Err(TabularError::Empty)));
        assert!(matches!(Table::from_csv(b""), Err(TabularError::Empty)));
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        assert!(matches!(
            Table::from_csv(b"ds,y\n2024-01-01,1,extra\n"),
            Err(TabularError::Parse(_))
        ));
    }
}
