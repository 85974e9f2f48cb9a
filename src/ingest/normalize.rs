// src/ingest/normalize.rs
use chrono::{DateTime, Utc};

use crate::ingest::fetch::parse_timestamp;
use crate::ingest::source::UNKNOWN_SOURCE;
use crate::ingest::types::{CanonicalRecord, RawEntry};

/// Map a raw entry plus its resolved publisher into the stored record shape.
///
/// Never fails: a missing or unparseable timestamp becomes `now`, a missing
/// publisher becomes [`UNKNOWN_SOURCE`].
pub fn normalize(entry: &RawEntry, resolved_source: Option<String>, now: DateTime<Utc>) -> CanonicalRecord {
    let published_at_raw = entry.published_raw().map(str::to_string);
    let published_at = published_at_raw
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(now);

    CanonicalRecord {
        title: entry.title.trim().to_string(),
        link: entry.link.trim().to_string(),
        source: resolved_source.unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        published_at,
        published_at_raw,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keeps_raw_and_parsed_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let e = RawEntry {
            title: "  Rates rise \n".into(),
            link: " https://example.com/a ".into(),
            iso_date: Some("2026-10-19T10:00:00Z".into()),
            ..Default::default()
        };
        let r = normalize(&e, Some("Example Daily".into()), now);
        assert_eq!(r.title, "Rates rise");
        assert_eq!(r.link, "https://example.com/a");
        assert_eq!(r.source, "Example Daily");
        assert_eq!(r.published_at_raw.as_deref(), Some("2026-10-19T10:00:00Z"));
        assert_eq!(r.published_at, Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap());
        assert_eq!(r.created_at, now);
    }

    #[test]
    fn defaults_fill_the_gaps() {
        let now = Utc::now();
        let e = RawEntry {
            pub_date: Some("garbage".into()),
            ..Default::default()
        };
        let r = normalize(&e, None, now);
        assert_eq!(r.source, "Unknown");
        assert_eq!(r.published_at, now);
        assert_eq!(r.published_at_raw.as_deref(), Some("garbage"));
    }

    #[test]
    fn serializes_in_camel_case() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let r = normalize(&RawEntry::default(), None, now);
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("publishedAt").is_some());
        assert!(v.get("publishedAtRaw").is_some());
        assert!(v.get("createdAt").is_some());
    }
}
