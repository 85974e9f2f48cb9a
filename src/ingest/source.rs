//! # Source Resolver
//!
//! Works out a human-readable publisher label for a feed entry.
//!
//! Feeds rarely agree on where the publisher lives, so resolution walks an
//! ordered list of independent extractors and takes the first non-empty hit:
//!
//! 1. the label configured for the feed,
//! 2. the entry's own `<source>` element (plain or structured),
//! 3. a `<font color="#6f6f6f">LABEL</font>` marker in the description
//!    (Google News style),
//! 4. a trailing `" - LABEL"` in the title.
//!
//! When nothing matches the caller stores [`UNKNOWN_SOURCE`].

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::RawEntry;

pub const UNKNOWN_SOURCE: &str = "Unknown";

/// One resolution heuristic. Gets the entry and the feed's configured label.
pub type Extractor = fn(&RawEntry, Option<&str>) -> Option<String>;

/// Extractors in precedence order.
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("configured", configured_source),
    ("entry", entry_source),
    ("description", description_marker),
    ("title", title_suffix),
];

/// Resolve the publisher label, or `None` when every heuristic misses.
pub fn resolve(entry: &RawEntry, configured: Option<&str>) -> Option<String> {
    EXTRACTORS.iter().find_map(|(name, extract)| {
        let hit = extract(entry, configured)?;
        tracing::trace!(target: "ingest", extractor = *name, source = %hit, "source resolved");
        Some(hit)
    })
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

pub fn configured_source(_entry: &RawEntry, configured: Option<&str>) -> Option<String> {
    configured.and_then(non_empty)
}

pub fn entry_source(entry: &RawEntry, _configured: Option<&str>) -> Option<String> {
    entry.source.as_ref()?.text().and_then(non_empty)
}

pub fn description_marker(entry: &RawEntry, _configured: Option<&str>) -> Option<String> {
    static RE_FONT: OnceCell<Regex> = OnceCell::new();
    let re = RE_FONT.get_or_init(|| {
        Regex::new(r#"(?is)<font\s+color\s*=\s*["']#6f6f6f["']\s*>(.*?)</font>"#).unwrap()
    });
    let desc = entry.description.as_deref()?;
    let label = re.captures(desc)?.get(1)?.as_str();
    non_empty(&html_escape::decode_html_entities(label))
}

pub fn title_suffix(entry: &RawEntry, _configured: Option<&str>) -> Option<String> {
    let (_, label) = entry.title.rsplit_once(" - ")?;
    non_empty(label)
}
