// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::config::{AppConfig, FeedConfig};
pub use crate::error::{FeedStage, FetchError, IngestError, StoreError};
pub use crate::ingest::scheduler::IngestScheduler;
pub use crate::ingest::types::{CanonicalRecord, EntrySource, FeedSource, RawEntry, StoredRecord};
pub use crate::ingest::{FeedOutcome, Pipeline, RunSummary};
pub use crate::store::{FileStore, FirestoreStore, MemoryStore, SnapshotStore};
