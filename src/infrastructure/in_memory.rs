use crate::domain::ports::{Collection, RecordStore};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// A thread-safe in-memory document store.
///
/// Used when no remote store is configured and in tests. Generated ids sort
/// in insertion order, like push keys on the hosted store.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    next_id: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self {
            collections: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `value` under a caller-chosen id.
    pub fn seed(&self, collection: &str, id: &str, value: Value) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value);
    }

    /// Makes every subsequent read and write fail until switched back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of a collection's values in key order.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.snapshot(collection).into_values().collect()
    }

    pub fn ids(&self, collection: &str) -> Vec<String> {
        self.snapshot(collection).into_keys().collect()
    }

    fn snapshot(&self, collection: &str) -> Collection {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store switched off".to_string()))
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_collection(&self, collection: &str) -> Result<Collection, StoreError> {
        self.ensure_available()?;
        Ok(self.snapshot(collection))
    }

    async fn insert(&self, collection: &str, value: Value) -> Result<String, StoreError> {
        self.ensure_available()?;
        let id = format!("-N{:010}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.seed(collection, &id, value);
        Ok(id)
    }
}
