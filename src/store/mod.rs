//! # Snapshot Store
//!
//! Persistence primitives for per-feed snapshots. A snapshot is the full set
//! of records under one collection name; the pipeline replaces it with two
//! back-to-back calls, [`SnapshotStore::erase_all`] then
//! [`SnapshotStore::insert_all`].
//!
//! The two calls are not one transaction. If erase succeeds and insert fails
//! the collection stays empty until the next successful run rebuilds it from
//! the live feed.

pub mod file;
pub mod firestore;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use crate::ingest::types::{CanonicalRecord, StoredRecord};

pub use file::FileStore;
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Delete every record stored under `collection`. Returns how many went.
    async fn erase_all(&self, collection: &str) -> Result<usize, StoreError>;

    /// Store each record as a new entity with a store-generated id.
    async fn insert_all(&self, collection: &str, records: &[CanonicalRecord]) -> Result<usize, StoreError>;

    /// Current contents of `collection`, in insertion order where the backend keeps one.
    async fn list(&self, collection: &str) -> Result<Vec<StoredRecord>, StoreError>;

    fn name(&self) -> &'static str;
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Build the configured backend.
pub fn build_store(cfg: &StoreConfig) -> Result<Arc<dyn SnapshotStore>> {
    let store: Arc<dyn SnapshotStore> = match &cfg.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File { dir } => Arc::new(FileStore::open(dir)?),
        StoreBackend::Firestore {
            project_id,
            database,
            base_url,
            token_env,
        } => {
            let token = std::env::var(token_env).ok().filter(|t| !t.trim().is_empty());
            if token.is_none() {
                tracing::warn!(target: "store", token_env = %token_env, "no Firestore token, sending unauthenticated requests");
            }
            Arc::new(FirestoreStore::new(base_url, project_id, database, token)?)
        }
    };
    tracing::info!(target: "store", backend = store.name(), "snapshot store ready");
    Ok(store)
}
