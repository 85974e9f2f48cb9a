// src/ingest/fetch.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use metrics::{counter, histogram};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::error::FetchError;
use crate::ingest::providers::parse_feed;
use crate::ingest::types::{FeedSource, RawEntry};

pub const DEFAULT_WINDOW_HOURS: i64 = 24;
/// One leap year.
pub const MAX_WINDOW_HOURS: i64 = 24 * 366;

/// Best-effort timestamp parsing for feed dates.
///
/// Accepts RFC 2822 (`pubDate`), RFC 3339 (`dc:date`, Atom) and a bare
/// `YYYY-MM-DDTHH:MM:SS`, which is read as UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    if let Some(dt) = OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .or_else(|| OffsetDateTime::parse(ts, &Rfc3339).ok())
    {
        return DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond());
    }
    // chrono also knows the obsolete named zones (EST, PDT, ...)
    if let Ok(dt) = DateTime::parse_from_rfc2822(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|n| n.and_utc())
}

/// Keep entries published strictly after `now - window`, in feed order.
///
/// An entry without a usable timestamp counts as published at the Unix epoch
/// and is therefore dropped.
pub fn filter_recent(entries: Vec<RawEntry>, now: DateTime<Utc>, window: Duration) -> Vec<RawEntry> {
    let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    entries
        .into_iter()
        .filter(|e| {
            let published = e
                .published_raw()
                .and_then(parse_timestamp)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            published > cutoff
        })
        .collect()
}

/// Retrieval + parsing + recency filtering for one feed URL.
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn FeedSource>,
    window: Duration,
}

impl Fetcher {
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            source,
            window: Duration::hours(DEFAULT_WINDOW_HOURS),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<RawEntry>, FetchError> {
        self.fetch_at(url, Utc::now()).await
    }

    pub async fn fetch_at(&self, url: &str, now: DateTime<Utc>) -> Result<Vec<RawEntry>, FetchError> {
        let t0 = std::time::Instant::now();
        let payload = self.source.retrieve(url).await?;
        let entries = parse_feed(&payload)?;
        histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let total = entries.len();
        let kept = filter_recent(entries, now, self.window);
        counter!("ingest_entries_filtered_total").increment((total - kept.len()) as u64);
        tracing::debug!(target: "ingest", url, total, kept = kept.len(), "feed parsed");
        Ok(kept)
    }
}
