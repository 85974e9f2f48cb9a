// src/error.rs
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Retrieval or parsing of a single feed failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("payload is not a feed: {0}")]
    Parse(String),
}

/// Snapshot store backend failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    #[error("write to `{collection}` rejected: {reason}")]
    Rejected { collection: String, reason: String },

    #[error("batch of {size} writes exceeds the backend limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt snapshot {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Stage of the per-feed sequence a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStage {
    Fetch,
    Erase,
    Insert,
}

impl FeedStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStage::Fetch => "fetch",
            FeedStage::Erase => "erase",
            FeedStage::Insert => "insert",
        }
    }
}

impl std::fmt::Display for FeedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one feed's turn in a run did not complete.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{stage} timed out after {}s", after.as_secs())]
    Timeout { stage: FeedStage, after: Duration },
}
