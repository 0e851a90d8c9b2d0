use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use restock_sales::{LINE_ITEM_FIELDS, LINE_PRODUCT_FIELDS, PRODUCT_FIELDS, RawRecord, key_text};

use super::SourceError;

/// Order lookup: every order, or only those mentioning one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    /// Product id or name; matched against line items and flat product fields.
    pub product: Option<String>,
    /// Maximum number of documents returned.
    pub limit: usize,
}

/// Document store holding the order history.
///
/// Read-only from the pipeline's point of view.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn connect(&self) -> Result<(), SourceError>;

    async fn close(&self) -> Result<(), SourceError>;

    async fn collection_names(&self) -> Result<Vec<String>, SourceError>;

    async fn find_orders(
        &self,
        collection: &str,
        query: &OrderQuery,
    ) -> Result<Vec<RawRecord>, SourceError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn connect(&self) -> Result<(), SourceError> {
        (**self).connect().await
    }

    async fn close(&self) -> Result<(), SourceError> {
        (**self).close().await
    }

    async fn collection_names(&self) -> Result<Vec<String>, SourceError> {
        (**self).collection_names().await
    }

    async fn find_orders(
        &self,
        collection: &str,
        query: &OrderQuery,
    ) -> Result<Vec<RawRecord>, SourceError> {
        (**self).find_orders(collection, query).await
    }
}

/// In-memory document store for tests/dev and file-backed CLI runs.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<RawRecord>>>,
    connected: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one collection.
    pub fn with_collection(name: impl Into<String>, documents: Vec<RawRecord>) -> Self {
        Self {
            collections: RwLock::new(HashMap::from([(name.into(), documents)])),
            connected: AtomicBool::new(false),
        }
    }

    pub fn insert_many(
        &self,
        collection: impl Into<String>,
        documents: Vec<RawRecord>,
    ) -> Result<(), SourceError> {
        let mut map = self
            .collections
            .write()
            .map_err(|_| SourceError::Unavailable("store lock poisoned".into()))?;
        map.entry(collection.into()).or_default().extend(documents);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn ensure_connected(&self) -> Result<(), SourceError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SourceError::NotConnected)
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn connect(&self) -> Result<(), SourceError> {
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    async fn collection_names(&self) -> Result<Vec<String>, SourceError> {
        self.ensure_connected()?;
        let map = self
            .collections
            .read()
            .map_err(|_| SourceError::Unavailable("store lock poisoned".into()))?;
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn find_orders(
        &self,
        collection: &str,
        query: &OrderQuery,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.ensure_connected()?;
        let map = self
            .collections
            .read()
            .map_err(|_| SourceError::Unavailable("store lock poisoned".into()))?;
        let Some(docs) = map.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|doc| match query.product.as_deref() {
                Some(product) => mentions_product(doc, product),
                None => true,
            })
            .take(query.limit)
            .cloned()
            .collect())
    }
}

/// Whether an order names `product` in a line item or a flat product field.
///
/// Uses the same field names the record normalizer reads products from.
fn mentions_product(doc: &RawRecord, product: &str) -> bool {
    let names_product = |map: &RawRecord, fields: &[&str]| {
        fields
            .iter()
            .filter_map(|f| map.get(*f))
            .any(|v| key_text(v).as_deref() == Some(product))
    };

    let in_lines = LINE_ITEM_FIELDS
        .iter()
        .filter_map(|f| doc.get(*f).and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object)
        .any(|item| names_product(item, &LINE_PRODUCT_FIELDS));
    in_lines || names_product(doc, &PRODUCT_FIELDS)
}
