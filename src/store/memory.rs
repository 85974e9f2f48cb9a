// src/store/memory.rs
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{new_id, SnapshotStore};
use crate::error::StoreError;
use crate::ingest::types::{CanonicalRecord, StoredRecord};

/// Process-local store. Each operation is atomic; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, Vec<StoredRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collections that currently hold at least one record.
    pub fn collections(&self) -> Vec<String> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = guard
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn erase_all(&self, collection: &str) -> Result<usize, StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        Ok(guard.remove(collection).map(|v| v.len()).unwrap_or(0))
    }

    async fn insert_all(&self, collection: &str, records: &[CanonicalRecord]) -> Result<usize, StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let slot = guard.entry(collection.to_string()).or_default();
        slot.extend(records.iter().cloned().map(|record| StoredRecord {
            id: new_id(),
            record,
        }));
        Ok(records.len())
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(collection).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
