//! Order-history run: collect → normalize → aggregate → forecast → recommend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use restock_ai::{ForecastError, ForecastJob, ProductForecast};
use restock_core::{InsufficientData, ProductKey, RecommendationResult, RunId};
use restock_inventory::{coerce_stock, recommend};
use restock_sales::{RawRecord, RecordNormalizer, aggregate, partition_eligible};

use crate::sources::{Catalog, DocumentStore, OrderQuery, SourceError};

use super::context::PipelineContext;
use super::error::PipelineError;

const STOCK_FIELDS: [&str; 3] = ["countInStock", "stock", "quantity"];
const NAME_FIELD: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Collecting,
    Normalizing,
    Aggregating,
    Forecasting,
    Recommending,
    Completed,
    Failed,
}

/// Caller request: forecast every product, or only orders mentioning one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Product id or name; `None` (or blank) means all orders.
    pub product: Option<String>,
    /// Days to forecast; between 1 and `PipelineConfig::max_horizon_days`.
    pub horizon: i64,
}

impl ForecastRequest {
    pub fn all_products(horizon: i64) -> Self {
        Self {
            product: None,
            horizon,
        }
    }

    pub fn for_product(product: impl Into<String>, horizon: i64) -> Self {
        Self {
            product: Some(product.into()),
            horizon,
        }
    }
}

/// A product dropped under [`crate::FailurePolicy::BestEffort`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFailure {
    pub product_key: ProductKey,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// One recommendation per forecast product, ordered by product key.
    pub results: Vec<RecommendationResult>,
    /// Products left out for lack of history.
    pub skipped: Vec<InsufficientData>,
    pub failed: Vec<ProductFailure>,
}

fn enter(run_id: RunId, phase: RunPhase) {
    debug!(run = %run_id, phase = ?phase, "run phase");
}

impl<S: DocumentStore> PipelineContext<S> {
    /// Forecast demand from the order history and recommend restock quantities.
    pub async fn run_orders(&self, request: &ForecastRequest) -> Result<RunReport, PipelineError> {
        let run_id = RunId::new();
        info!(run = %run_id, product = ?request.product, horizon = request.horizon, "forecast run started");

        match self.execute_orders(run_id, request).await {
            Ok(report) => {
                enter(run_id, RunPhase::Completed);
                info!(
                    run = %run_id,
                    results = report.results.len(),
                    skipped = report.skipped.len(),
                    failed = report.failed.len(),
                    "forecast run completed"
                );
                Ok(report)
            }
            Err(e) => {
                enter(run_id, RunPhase::Failed);
                warn!(run = %run_id, error = %e, "forecast run failed");
                Err(e)
            }
        }
    }

    async fn execute_orders(
        &self,
        run_id: RunId,
        request: &ForecastRequest,
    ) -> Result<RunReport, PipelineError> {
        let horizon = self.engine.validate_horizon(request.horizon)?;

        enter(run_id, RunPhase::Collecting);
        let collection = &self.config.orders_collection;
        let names = self.store.collection_names().await?;
        if !names.iter().any(|n| n == collection) {
            return Err(PipelineError::MissingCollection(collection.clone()));
        }
        let query = OrderQuery {
            product: request
                .product
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            limit: self.config.max_records,
        };
        let orders = self.store.find_orders(collection, &query).await?;
        if orders.is_empty() {
            return Err(PipelineError::NoData("no orders found for query".into()));
        }
        debug!(run = %run_id, orders = orders.len(), "orders collected");

        enter(run_id, RunPhase::Normalizing);
        let outcome = RecordNormalizer::new().normalize_all(&orders);
        if outcome.rejected > 0 {
            debug!(run = %run_id, rejected = outcome.rejected, "records discarded");
        }
        if outcome.observations.is_empty() {
            return Err(PipelineError::NoData(
                "no product sales data extracted from orders".into(),
            ));
        }

        enter(run_id, RunPhase::Aggregating);
        let (eligible, mut skipped) = partition_eligible(aggregate(outcome.observations));
        for s in &skipped {
            debug!(run = %run_id, product = %s.product_key, dates = s.distinct_dates, "skipping product");
        }
        if eligible.is_empty() {
            return Err(PipelineError::NoResults(
                "insufficient data for every product".into(),
            ));
        }

        enter(run_id, RunPhase::Forecasting);
        let jobs: Vec<ForecastJob> = eligible
            .into_iter()
            .map(|series| ForecastJob::new(self.engine.clone(), series, horizon))
            .collect();
        let pooled = self.pool.run(jobs, self.config.failure_policy);
        let report = match self.config.run_timeout {
            Some(limit) => tokio::time::timeout(limit, pooled)
                .await
                .map_err(|_| PipelineError::TimedOut(limit))??,
            None => pooled.await?,
        };
        skipped.extend(report.skipped);
        let failed: Vec<ProductFailure> = report.failed.into_iter().filter_map(to_failure).collect();

        enter(run_id, RunPhase::Recommending);
        let mut forecasts: Vec<ProductForecast> = report.completed;
        forecasts.sort_by(|a, b| a.product_key.cmp(&b.product_key));

        let mut results = Vec::with_capacity(forecasts.len());
        for forecast in forecasts {
            let (display_name, current_stock) = self.catalog_entry(run_id, &forecast.product_key).await;
            let rec = recommend(&forecast.points, current_stock, self.config.safety_margin);
            results.push(RecommendationResult::new(
                forecast.product_key,
                display_name,
                rec.predicted_sales,
                current_stock,
                rec.recommended_stock,
            ));
        }

        if results.is_empty() {
            let reason = match failed.first() {
                Some(f) => format!("every forecast failed (first: {}: {})", f.product_key, f.reason),
                None => "insufficient data for every product".to_string(),
            };
            return Err(PipelineError::NoResults(reason));
        }

        Ok(RunReport {
            run_id,
            results,
            skipped,
            failed,
        })
    }

    /// Display name and stock for a product; defaults to `(key, 0)`.
    async fn catalog_entry(&self, run_id: RunId, key: &ProductKey) -> (String, u64) {
        let fallback = || (key.to_string(), 0);
        let Some(catalog) = self.catalog.as_deref() else {
            return fallback();
        };

        let doc = match lookup(catalog, key).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return fallback(),
            Err(e) => {
                warn!(run = %run_id, product = %key, error = %e, "catalog lookup failed; using defaults");
                return fallback();
            }
        };

        let name = doc
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| key.to_string(), str::to_string);
        (name, stock_level(&doc))
    }
}

/// Look up by object id first (when the key is one), then by name.
async fn lookup(catalog: &dyn Catalog, key: &ProductKey) -> Result<Option<RawRecord>, SourceError> {
    if key.is_object_id() {
        match catalog.find_by_id(key.as_str()).await {
            Ok(Some(doc)) => return Ok(Some(doc)),
            Ok(None) => {}
            Err(e) => warn!(product = %key, error = %e, "catalog id lookup failed; trying name"),
        }
    }
    catalog.find_by_name(key.as_str()).await
}

/// First stock field holding a positive level, else 0.
fn stock_level(doc: &RawRecord) -> u64 {
    STOCK_FIELDS
        .iter()
        .map(|f| coerce_stock(doc.get(*f)))
        .find(|stock| *stock > 0)
        .unwrap_or(0)
}

fn to_failure(err: ForecastError) -> Option<ProductFailure> {
    match err {
        ForecastError::ForecastFailure {
            product_key,
            reason,
        } => Some(ProductFailure {
            product_key,
            reason,
        }),
        other => {
            warn!(error = %other, "unattributed forecast failure");
            None
        }
    }
}
