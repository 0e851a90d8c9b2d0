use std::sync::Arc;

use tracing::info;

use restock_ai::ForecastEngine;

use crate::config::PipelineConfig;
use crate::sources::{Catalog, DocumentStore};
use crate::workers::ForecastPool;

use super::error::PipelineError;

/// Everything one pipeline run needs, constructed by the caller.
///
/// `open` connects the store and `close` releases it; a context that has
/// been closed cannot be used again.
pub struct PipelineContext<S> {
    pub(crate) store: S,
    pub(crate) catalog: Option<Arc<dyn Catalog>>,
    pub(crate) engine: ForecastEngine,
    pub(crate) pool: ForecastPool,
    pub(crate) config: PipelineConfig,
}

impl<S> core::fmt::Debug for PipelineContext<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("catalog", &self.catalog.is_some())
            .field("engine", &self.engine)
            .field("workers", &self.pool.workers())
            .field("config", &self.config)
            .finish()
    }
}

impl<S: DocumentStore> PipelineContext<S> {
    /// Connect `store` and build the default forecast engine from `config`.
    pub async fn open(store: S, config: PipelineConfig) -> Result<Self, PipelineError> {
        let engine = config.engine()?;
        store.connect().await?;
        info!(
            procedure = engine.procedure_name(),
            workers = config.workers.get(),
            "pipeline context opened"
        );
        Ok(Self {
            store,
            catalog: None,
            engine,
            pool: ForecastPool::new(config.workers),
            config,
        })
    }

    /// Resolve display names and stock levels from `catalog`.
    pub fn with_catalog(mut self, catalog: impl Catalog + 'static) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    /// Replace the forecasting procedure.
    pub fn with_engine(mut self, engine: ForecastEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    pub async fn close(self) -> Result<(), PipelineError> {
        self.store.close().await?;
        info!("pipeline context closed");
        Ok(())
    }
}
