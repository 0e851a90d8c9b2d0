//! Read-only collaborators the pipeline pulls data from.

pub mod catalog;
pub mod document_store;
pub mod load;

use thiserror::Error;

pub use catalog::{Catalog, InMemoryCatalog};
pub use document_store::{DocumentStore, InMemoryDocumentStore, OrderQuery};
pub use load::parse_documents;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceError {
    #[error("source is not connected")]
    NotConnected,

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document: {0}")]
    Malformed(String),
}
