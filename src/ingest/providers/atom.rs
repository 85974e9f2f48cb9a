// src/ingest/providers/atom.rs
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::FetchError;
use crate::ingest::types::{EntrySource, RawEntry};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<Text>,
    content: Option<Text>,
    source: Option<Source>,
}

/// Atom text constructs carry a `type` attribute we do not care about.
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Source {
    title: Option<Text>,
    id: Option<String>,
}

fn text(t: Option<Text>) -> Option<String> {
    t.and_then(|t| t.value)
}

/// `rel="alternate"` wins, a link without `rel` is alternate by definition.
fn pick_link(links: Vec<Link>) -> String {
    let mut fallback = None;
    for l in links {
        match l.rel.as_deref() {
            None | Some("alternate") => {
                if let Some(href) = l.href {
                    return href;
                }
            }
            _ => {
                if fallback.is_none() {
                    fallback = l.href;
                }
            }
        }
    }
    fallback.unwrap_or_default()
}

impl From<Entry> for RawEntry {
    fn from(e: Entry) -> Self {
        RawEntry {
            title: text(e.title).unwrap_or_default(),
            link: pick_link(e.links),
            pub_date: e.published,
            iso_date: e.updated,
            description: text(e.summary).or_else(|| text(e.content)),
            source: e.source.map(|s| EntrySource::Structured {
                text: text(s.title),
                url: s.id,
            }),
        }
    }
}

/// Parse an Atom document (`<feed><entry>..`).
pub fn parse_atom(xml: &str) -> Result<Vec<RawEntry>, FetchError> {
    let feed: Feed = from_str(xml).map_err(|e| FetchError::Parse(format!("atom: {e}")))?;
    Ok(feed.entry.into_iter().map(RawEntry::from).collect())
}
