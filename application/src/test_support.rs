//! Shared port doubles for use-case tests.

use crate::ports::storage_backend::{
    Document, Query, StorageBackend, StorageError, validate_key,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

// ==================== Test Mocks ====================

/// Map-backed storage that can be told to fail writes to chosen collections.
#[derive(Default)]
pub struct MockBackend {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
    failing_writes: RwLock<HashSet<String>>,
    offline: RwLock<bool>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put`/`delete` on `collection` return `Unavailable`.
    pub fn fail_writes_to(&self, collection: &str) {
        self.failing_writes
            .write()
            .unwrap()
            .insert(collection.to_string());
    }

    /// Make every operation return `Unavailable`.
    pub fn go_offline(&self) {
        *self.offline.write().unwrap() = true;
    }

    pub fn raw(&self, collection: &str, key: &str) -> Option<Value> {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.get(key).cloned())
    }

    pub fn insert_raw(&self, collection: &str, key: &str, value: Value) {
        self.collections
            .write()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map_or(0, HashMap::len)
    }

    fn check(&self, collection: &str, write: bool) -> Result<(), StorageError> {
        if *self.offline.read().unwrap() {
            return Err(StorageError::Unavailable("backend offline".into()));
        }
        if write && self.failing_writes.read().unwrap().contains(collection) {
            return Err(StorageError::Unavailable(format!(
                "writes to {collection} rejected"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<(), StorageError> {
        validate_key(collection)?;
        validate_key(key)?;
        self.check(collection, true)?;
        self.insert_raw(collection, key, value);
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StorageError> {
        validate_key(collection)?;
        validate_key(key)?;
        self.check(collection, false)?;
        Ok(self.raw(collection, key))
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StorageError> {
        validate_key(collection)?;
        validate_key(key)?;
        self.check(collection, true)?;
        if let Some(docs) = self.collections.write().unwrap().get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StorageError> {
        validate_key(collection)?;
        query.validate()?;
        self.check(collection, false)?;
        let docs: Vec<Document> = self
            .collections
            .read()
            .unwrap()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(k, v)| Document::new(k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(query.apply(docs))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check("", false)
    }
}
