//! In-memory storage backend.
//!
//! Documents live in a `RwLock<HashMap<collection, HashMap<key, value>>>` and
//! vanish with the process. Queries are evaluated with [`Query::apply`].

use async_trait::async_trait;
use crs_application::ports::storage_backend::{
    Document, Query, StorageBackend, StorageError, validate_key,
};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check(collection: &str, key: &str) -> Result<(), StorageError> {
    validate_key(collection)?;
    validate_key(key)
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<(), StorageError> {
        check(collection, key)?;
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StorageError> {
        check(collection, key)?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(key).cloned()))
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StorageError> {
        check(collection, key)?;
        if let Some(docs) = self.collections.write().await.get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StorageError> {
        validate_key(collection)?;
        query.validate()?;
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        let candidates = docs
            .iter()
            .map(|(key, value)| Document::new(key.clone(), value.clone()));
        let result = query.apply(candidates);
        debug!(collection, matched = result.len(), "In-memory query");
        Ok(result)
    }
}
