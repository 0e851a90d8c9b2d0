//! Infrastructure layer: configuration, data sources, worker pool and the
//! pipeline that ties them together.

pub mod config;
pub mod pipeline;
pub mod sources;
pub mod workers;


pub use config::{ConfigError, FailurePolicy, HoltParams, PipelineConfig};
pub use pipeline::{
    ErrorKind, ErrorReport, ForecastRequest, PipelineContext, PipelineError, ProductFailure,
    RunReport, forecast_upload,
};
pub use sources::{
    Catalog, DocumentStore, InMemoryCatalog, InMemoryDocumentStore, OrderQuery, SourceError,
    parse_documents,
};
