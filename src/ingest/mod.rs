// src/ingest/mod.rs
pub mod fetch;
pub mod normalize;
pub mod providers;
pub mod scheduler;
pub mod source;
pub mod types;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::config::{AppConfig, FeedConfig};
use crate::error::{FeedStage, IngestError};
use crate::ingest::fetch::Fetcher;
use crate::ingest::providers::http::HttpFeedSource;
use crate::ingest::types::{CanonicalRecord, FeedSource};
use crate::store::{build_store, SnapshotStore};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Completed ingestion runs.");
        describe_counter!(
            "ingest_runs_skipped_total",
            "Runs skipped because another run was still in progress."
        );
        describe_counter!(
            "ingest_feeds_updated_total",
            "Feeds whose snapshot was replaced."
        );
        describe_counter!(
            "ingest_feed_errors_total",
            "Feeds that failed, labelled by stage."
        );
        describe_counter!(
            "ingest_records_written_total",
            "Records inserted into snapshots."
        );
        describe_counter!(
            "ingest_entries_filtered_total",
            "Entries dropped by the recency window."
        );
        describe_histogram!("ingest_fetch_ms", "Feed retrieval + parse time in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when the last run finished.");
    });
}

/// Result of one feed's turn in a run.
#[derive(Debug)]
pub enum FeedOutcome {
    Updated {
        collection: String,
        written: usize,
    },
    Failed {
        collection: String,
        stage: FeedStage,
        error: IngestError,
    },
}

impl FeedOutcome {
    pub fn collection(&self) -> &str {
        match self {
            FeedOutcome::Updated { collection, .. } | FeedOutcome::Failed { collection, .. } => {
                collection
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FeedOutcome::Updated { .. })
    }
}

/// What a run did, feed by feed. A run as a whole never fails.
#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<FeedOutcome>,
}

impl RunSummary {
    pub fn updated(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.updated()
    }

    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                FeedOutcome::Updated { written, .. } => *written,
                FeedOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn outcome(&self, collection: &str) -> Option<&FeedOutcome> {
        self.outcomes.iter().find(|o| o.collection() == collection)
    }
}

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// The ingestion orchestrator: a strictly sequential sweep over the feed list.
pub struct Pipeline {
    feeds: Vec<FeedConfig>,
    fetcher: Fetcher,
    store: Arc<dyn SnapshotStore>,
    fetch_timeout: Duration,
    store_timeout: Duration,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(feeds: Vec<FeedConfig>, source: Arc<dyn FeedSource>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            feeds,
            fetcher: Fetcher::new(source),
            store,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            run_lock: Mutex::new(()),
        }
    }

    /// Wire the HTTP source and the configured store.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let fetch_timeout = Duration::from_secs(cfg.http.timeout_secs);
        let source = HttpFeedSource::new(fetch_timeout, &cfg.http.user_agent)?;
        let store = build_store(&cfg.store)?;
        Ok(Self::new(cfg.feeds.clone(), Arc::new(source), store)
            .with_window(chrono::Duration::hours(cfg.ingest.window_hours))
            .with_timeouts(fetch_timeout, Duration::from_secs(cfg.store.timeout_secs)))
    }

    pub fn with_window(mut self, window: chrono::Duration) -> Self {
        self.fetcher = self.fetcher.with_window(window);
        self
    }

    pub fn with_timeouts(mut self, fetch: Duration, store: Duration) -> Self {
        self.fetch_timeout = fetch;
        self.store_timeout = store;
        self
    }

    pub fn feeds(&self) -> &[FeedConfig] {
        &self.feeds
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Run once now. `None` means another run was in progress and this one was skipped.
    pub async fn run(&self) -> Option<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Same as [`Pipeline::run`] with an explicit clock for the window and record times.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Option<RunSummary> {
        ensure_metrics_described();

        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::warn!(target: "ingest", "previous run still in progress, skipping");
            counter!("ingest_runs_skipped_total").increment(1);
            return None;
        };

        let started_at = Utc::now();
        tracing::info!(target: "ingest", feeds = self.feeds.len(), "start fetching feeds");

        let mut outcomes = Vec::with_capacity(self.feeds.len());
        for feed in &self.feeds {
            tracing::info!(target: "ingest", url = %feed.url, collection = %feed.collection, "fetching");
            let outcome = match self.process_feed(feed, now).await {
                Ok(written) => {
                    tracing::info!(target: "ingest", collection = %feed.collection, written, "snapshot updated");
                    counter!("ingest_feeds_updated_total").increment(1);
                    counter!("ingest_records_written_total").increment(written as u64);
                    FeedOutcome::Updated {
                        collection: feed.collection.clone(),
                        written,
                    }
                }
                Err((stage, error)) => {
                    tracing::error!(
                        target: "ingest",
                        collection = %feed.collection,
                        url = %feed.url,
                        %stage,
                        error = %error,
                        "feed failed"
                    );
                    counter!("ingest_feed_errors_total", "stage" => stage.as_str()).increment(1);
                    FeedOutcome::Failed {
                        collection: feed.collection.clone(),
                        stage,
                        error,
                    }
                }
            };
            outcomes.push(outcome);
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        counter!("ingest_runs_total").increment(1);
        gauge!("ingest_last_run_ts").set(summary.finished_at.timestamp() as f64);
        tracing::info!(
            target: "ingest",
            updated = summary.updated(),
            failed = summary.failed(),
            written = summary.written(),
            "finished fetching feeds"
        );
        Some(summary)
    }

    /// Fetch → Erase → Insert for one feed. Any error stops this feed only.
    async fn process_feed(&self, feed: &FeedConfig, now: DateTime<Utc>) -> Result<usize, (FeedStage, IngestError)> {
        let entries = bounded(FeedStage::Fetch, self.fetch_timeout, async {
            self.fetcher.fetch_at(&feed.url, now).await.map_err(IngestError::from)
        })
        .await?;

        let records: Vec<CanonicalRecord> = entries
            .iter()
            .map(|e| {
                let resolved = source::resolve(e, feed.configured_source());
                normalize::normalize(e, resolved, now)
            })
            .collect();

        let erased = bounded(FeedStage::Erase, self.store_timeout, async {
            self.store.erase_all(&feed.collection).await.map_err(IngestError::from)
        })
        .await?;
        tracing::debug!(target: "ingest", collection = %feed.collection, erased, "collection cleared");

        bounded(FeedStage::Insert, self.store_timeout, async {
            self.store
                .insert_all(&feed.collection, &records)
                .await
                .map_err(IngestError::from)
        })
        .await
    }
}

async fn bounded<T, F>(stage: FeedStage, after: Duration, fut: F) -> Result<T, (FeedStage, IngestError)>
where
    F: Future<Output = Result<T, IngestError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res.map_err(|e| (stage, e)),
        Err(_) => Err((stage, IngestError::Timeout { stage, after })),
    }
}
