//! Sales history ingestion.
//!
//! Turns schema-unknown sales records (order documents with line items, flat
//! rows, CSV uploads) into canonical per-product daily series. Everything here
//! is deterministic and free of IO beyond parsing bytes handed in by callers.

pub mod aggregate;
pub mod normalize;
pub mod record;
pub mod tabular;

pub use aggregate::{AggregatedSeries, aggregate, partition_eligible};
pub use normalize::{
    LINE_ITEM_FIELDS, LINE_PRODUCT_FIELDS, NormalizeOutcome, PRODUCT_FIELDS, RecordNormalizer,
    SchemaError,
};
pub use record::{RawRecord, coerce_quantity, key_text};
pub use tabular::{ColumnMapping, Table, TabularError};
