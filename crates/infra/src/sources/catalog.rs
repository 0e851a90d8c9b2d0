use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;

use restock_sales::{RawRecord, key_text};

use super::SourceError;

const ID_FIELD: &str = "_id";
const NAME_FIELD: &str = "name";

/// Product catalog used to resolve display names and stock levels.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<RawRecord>, SourceError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<RawRecord>, SourceError>;
}

#[async_trait]
impl<C> Catalog for Arc<C>
where
    C: Catalog + ?Sized,
{
    async fn find_by_id(&self, id: &str) -> Result<Option<RawRecord>, SourceError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<RawRecord>, SourceError> {
        (**self).find_by_name(name).await
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<RawRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<RawRecord>) -> Self {
        Self {
            products: RwLock::new(documents),
        }
    }

    pub fn insert(&self, product: RawRecord) -> Result<(), SourceError> {
        self.products
            .write()
            .map_err(|_| SourceError::Unavailable("catalog lock poisoned".into()))?
            .push(product);
        Ok(())
    }

    fn find_where(&self, field: &str, wanted: &str) -> Result<Option<RawRecord>, SourceError> {
        let products = self
            .products
            .read()
            .map_err(|_| SourceError::Unavailable("catalog lock poisoned".into()))?;
        Ok(products
            .iter()
            .find(|p| p.get(field).and_then(key_text).as_deref() == Some(wanted))
            .cloned())
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn find_by_id(&self, id: &str) -> Result<Option<RawRecord>, SourceError> {
        self.find_where(ID_FIELD, id)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<RawRecord>, SourceError> {
        self.find_where(NAME_FIELD, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn finds_by_object_id_or_name() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(
            json!({"_id": {"$oid": "65920080aaaaaaaaaaaaaaaa"}, "name": "Mouse", "countInStock": 3})
                .as_object()
                .unwrap()
                .clone(),
        )
        .unwrap();

        let by_id = catalog.find_by_id("65920080aaaaaaaaaaaaaaaa").await.unwrap();
        assert_eq!(by_id.unwrap()["name"], "Mouse");

        let by_name = catalog.find_by_name("Mouse").await.unwrap();
        assert_eq!(by_name.unwrap()["countInStock"], 3);

        assert!(catalog.find_by_name("Keyboard").await.unwrap().is_none());
    }

    #[test]
    fn insert_reports_poisoned_lock() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let held = Arc::clone(&catalog);
        let _ = std::thread::spawn(move || {
            let _guard = held.products.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(matches!(
            catalog.insert(RawRecord::new()),
            Err(SourceError::Unavailable(_))
        ));
    }
}
