// src/config/feeds.rs
use std::collections::HashSet;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

/// One monitored feed and the collection its snapshot lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    pub collection: String,
    /// Publisher label override; wins over anything found in the feed.
    #[serde(default)]
    pub source: Option<String>,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            collection: collection.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Configured label, if it is non-blank.
    pub fn configured_source(&self) -> Option<&str> {
        self.source.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Trim fields and reject lists whose entries would collide or cannot be fetched.
pub fn validate_feeds(feeds: Vec<FeedConfig>) -> Result<Vec<FeedConfig>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(feeds.len());
    for (i, mut f) in feeds.into_iter().enumerate() {
        f.url = f.url.trim().to_string();
        f.collection = f.collection.trim().to_string();
        f.source = f.configured_source().map(str::to_string);

        let url = reqwest::Url::parse(&f.url)
            .map_err(|e| anyhow!("feeds[{i}]: invalid url {:?}: {e}", f.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("feeds[{i}]: unsupported url scheme {:?}", url.scheme());
        }
        if f.collection.is_empty() {
            bail!("feeds[{i}]: collection must not be empty");
        }
        if f.collection.contains('/') || f.collection.contains('\\') || f.collection.starts_with('.') {
            bail!("feeds[{i}]: collection {:?} is not a valid name", f.collection);
        }
        if !seen.insert(f.collection.clone()) {
            bail!("feeds[{i}]: duplicate collection {:?}", f.collection);
        }
        out.push(f);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_drops_blank_source() {
        let v = validate_feeds(vec![
            FeedConfig::new(" https://example.com/feed ", " news_a ").with_source("  ")
        ])
        .unwrap();
        assert_eq!(v[0].url, "https://example.com/feed");
        assert_eq!(v[0].collection, "news_a");
        assert_eq!(v[0].source, None);
    }

    #[test]
    fn rejects_bad_entries() {
        let dup = vec![
            FeedConfig::new("https://a.test/rss", "news"),
            FeedConfig::new("https://b.test/rss", "news"),
        ];
        assert!(validate_feeds(dup).unwrap_err().to_string().contains("duplicate"));
        assert!(validate_feeds(vec![FeedConfig::new("https://a.test", "")]).is_err());
        assert!(validate_feeds(vec![FeedConfig::new("https://a.test", "a/b")]).is_err());
        assert!(validate_feeds(vec![FeedConfig::new("not a url", "a")]).is_err());
        assert!(validate_feeds(vec![FeedConfig::new("ftp://a.test/rss", "a")]).is_err());
    }

    #[test]
    fn spaces_and_ampersands_are_fine_in_collection_names() {
        let v = validate_feeds(vec![FeedConfig::new("https://a.test/rss", "crypto & finance")]);
        assert!(v.is_ok());
    }
}
