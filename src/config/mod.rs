// src/config/mod.rs
pub mod feeds;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub use feeds::{validate_feeds, FeedConfig};

use crate::ingest::fetch::{DEFAULT_WINDOW_HOURS, MAX_WINDOW_HOURS};
use crate::ingest::providers::http::DEFAULT_USER_AGENT;

pub const ENV_CONFIG_PATH: &str = "FEED_SNAPSHOT_CONFIG";
pub const ENV_FIRESTORE_EMULATOR: &str = "FIRESTORE_EMULATOR_HOST";
pub const DEFAULT_TOML_PATH: &str = "config/feed-snapshot.toml";
pub const DEFAULT_JSON_PATH: &str = "config/feed-snapshot.json";

fn default_cron() -> String {
    "0 6,11,16,21 * * *".to_string()
}
fn default_timezone() -> String {
    "Asia/Ho_Chi_Minh".to_string()
}
fn default_true() -> bool {
    true
}
fn default_http_timeout() -> u64 {
    20
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_store_timeout() -> u64 {
    30
}
fn default_window_hours() -> i64 {
    DEFAULT_WINDOW_HOURS
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_database() -> String {
    "(default)".to_string()
}
fn default_firestore_base() -> String {
    "https://firestore.googleapis.com".to_string()
}
fn default_token_env() -> String {
    "FIRESTORE_TOKEN".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Five-field (minute first) or six-field (second first) cron expression.
    #[serde(default = "default_cron")]
    pub cron: String,
    /// IANA zone the cron expression is evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            timezone: default_timezone(),
            run_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus scrape endpoint; exporter stays off when unset.
    #[serde(default)]
    pub listen: Option<SocketAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File {
        #[serde(default = "default_data_dir")]
        dir: PathBuf,
    },
    Firestore {
        project_id: String,
        #[serde(default = "default_database")]
        database: String,
        #[serde(default = "default_firestore_base")]
        base_url: String,
        /// Name of the env var holding an OAuth bearer token.
        #[serde(default = "default_token_env")]
        token_env: String,
    },
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::File {
            dir: default_data_dir(),
        }
    }
}

/// `[store]` section. `backend` may be omitted and then means `file`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub timeout_secs: u64,
}

#[derive(Deserialize)]
struct TaggedStoreConfig {
    #[serde(flatten)]
    backend: StoreBackend,
    #[serde(default = "default_store_timeout")]
    timeout_secs: u64,
}

impl TryFrom<serde_json::Value> for StoreConfig {
    type Error = serde_json::Error;

    fn try_from(mut raw: serde_json::Value) -> std::result::Result<Self, Self::Error> {
        if let serde_json::Value::Object(map) = &mut raw {
            map.entry("backend").or_insert_with(|| "file".into());
        }
        let tagged: TaggedStoreConfig = serde_json::from_value(raw)?;
        Ok(Self {
            backend: tagged.backend,
            timeout_secs: tagged.timeout_secs,
        })
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            timeout_secs: default_store_timeout(),
        }
    }
}

/// Process-wide static configuration, loaded once at start.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

impl AppConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finish()
    }

    /// Load using env var + fallbacks:
    /// 1) $FEED_SNAPSHOT_CONFIG
    /// 2) config/feed-snapshot.toml
    /// 3) config/feed-snapshot.json
    pub fn load_default() -> Result<Self> {
        Self::load_from(&resolve_default_path()?)
    }

    fn finish(mut self) -> Result<Self> {
        self.feeds = validate_feeds(std::mem::take(&mut self.feeds))?;
        if !(1..=MAX_WINDOW_HOURS).contains(&self.ingest.window_hours) {
            bail!("ingest.window_hours must be between 1 and {MAX_WINDOW_HOURS}");
        }
        if self.http.timeout_secs == 0 || self.store.timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }
        if let StoreBackend::Firestore { base_url, .. } = &mut self.store.backend {
            if let Ok(host) = std::env::var(ENV_FIRESTORE_EMULATOR) {
                *base_url = format!("http://{}", host.trim());
            }
        }
        Ok(self)
    }
}

/// Which file `load_default` would read.
pub fn resolve_default_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    for p in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(pb);
        }
    }
    Err(anyhow!(
        "no configuration found (set {ENV_CONFIG_PATH} or create {DEFAULT_TOML_PATH})"
    ))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    match hint_ext {
        "toml" => return Ok(toml::from_str(s)?),
        "json" => return Ok(serde_json::from_str(s)?),
        _ => {}
    }
    // Unknown extension: sniff.
    if let Ok(v) = toml::from_str(s) {
        return Ok(v);
    }
    serde_json::from_str(s).map_err(|_| anyhow!("unsupported config format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_gets_defaults() {
        let cfg: AppConfig = parse_config(
            r#"
[[feeds]]
url = "https://example.com/feed"
collection = "news_a"
"#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg.schedule.cron, "0 6,11,16,21 * * *");
        assert_eq!(cfg.schedule.timezone, "Asia/Ho_Chi_Minh");
        assert!(cfg.schedule.run_on_start);
        assert_eq!(cfg.http.timeout_secs, 20);
        assert_eq!(cfg.store.timeout_secs, 30);
        assert_eq!(cfg.store.backend, StoreBackend::File { dir: "data".into() });
        assert_eq!(cfg.ingest.window_hours, 24);
        assert!(cfg.metrics.listen.is_none());
        assert_eq!(cfg.feeds.len(), 1);
    }

    #[test]
    fn store_backend_is_tagged() {
        let cfg: AppConfig = parse_config(
            r#"
[store]
backend = "firestore"
project_id = "news-app"
timeout_secs = 5
"#,
            "",
        )
        .unwrap();
        assert_eq!(cfg.store.timeout_secs, 5);
        match cfg.store.backend {
            StoreBackend::Firestore {
                project_id,
                database,
                token_env,
                ..
            } => {
                assert_eq!(project_id, "news-app");
                assert_eq!(database, "(default)");
                assert_eq!(token_env, "FIRESTORE_TOKEN");
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn json_is_sniffed_without_extension() {
        let cfg = parse_config(
            r#"{"store": {"backend": "memory"}, "feeds": [{"url": "https://a.test/rss", "collection": "a", "source": "A"}]}"#,
            "",
        )
        .unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.feeds[0].source.as_deref(), Some("A"));
    }
}
