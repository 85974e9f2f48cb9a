// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Publisher information embedded in a feed item, when the feed carries any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// `<source>Label</source>`
    Plain(String),
    /// `<source url="...">Label</source>` or Atom `<source><title>..</title></source>`
    Structured {
        text: Option<String>,
        url: Option<String>,
    },
}

impl EntrySource {
    /// Textual label carried by the source, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            EntrySource::Plain(s) => Some(s.as_str()),
            EntrySource::Structured { text, .. } => text.as_deref(),
        }
    }
}

/// One item as returned by the feed parser. Lives only within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    /// RSS `pubDate` / Atom `published`
    pub pub_date: Option<String>,
    /// RSS `dc:date` / Atom `updated`
    pub iso_date: Option<String>,
    pub description: Option<String>,
    pub source: Option<EntrySource>,
}

impl RawEntry {
    /// Original timestamp string, preferring `pub_date`. A blank field counts as absent.
    pub fn published_raw(&self) -> Option<&str> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        present(&self.pub_date).or_else(|| present(&self.iso_date))
    }
}

/// The persisted unit of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub title: String,
    pub link: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub published_at_raw: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A record as held by a store, with its store-generated id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
    #[serde(flatten)]
    pub record: CanonicalRecord,
}

/// Retrieves the raw payload behind a feed URL.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn retrieve(&self, url: &str) -> Result<String, FetchError>;
}
