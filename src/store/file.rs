// src/store/file.rs
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::{new_id, SnapshotStore};
use crate::error::StoreError;
use crate::ingest::types::{CanonicalRecord, StoredRecord};

/// One JSON array per collection under `dir`.
///
/// Every write lands in a temp file that is renamed over the collection file,
/// so readers see either the old or the new snapshot, never a torn one.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).with_context(|| format!("creating store dir {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    async fn read(&self, path: &Path) -> Result<Vec<StoredRecord>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn write(&self, path: &Path, records: &[StoredRecord]) -> Result<(), StoreError> {
        let io = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension(format!("json.tmp-{}", new_id()));
        fs::write(&tmp, bytes).await.map_err(io)?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io(e));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn erase_all(&self, collection: &str) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(collection);
        let existing = self.read(&path).await?;
        if !existing.is_empty() {
            self.write(&path, &[]).await?;
        }
        Ok(existing.len())
    }

    async fn insert_all(&self, collection: &str, records: &[CanonicalRecord]) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(collection);
        let mut all = self.read(&path).await?;
        all.extend(records.iter().cloned().map(|record| StoredRecord {
            id: new_id(),
            record,
        }));
        self.write(&path, &all).await?;
        Ok(records.len())
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredRecord>, StoreError> {
        self.read(&self.path_for(collection)).await
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
