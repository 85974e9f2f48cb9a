// src/ingest/providers/rss.rs
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::FetchError;
use crate::ingest::types::{EntrySource, RawEntry};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

/// RSS 1.0 puts items next to the channel, not inside it.
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<String>,
    description: Option<String>,
    source: Option<SourceElem>,
}

#[derive(Debug, Deserialize)]
struct SourceElem {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "$text")]
    text: Option<String>,
}

impl From<SourceElem> for EntrySource {
    fn from(s: SourceElem) -> Self {
        match (s.url, s.text) {
            (None, Some(text)) => EntrySource::Plain(text),
            (url, text) => EntrySource::Structured { text, url },
        }
    }
}

impl From<Item> for RawEntry {
    fn from(it: Item) -> Self {
        RawEntry {
            title: it.title.unwrap_or_default(),
            link: it.link.unwrap_or_default(),
            pub_date: it.pub_date,
            iso_date: it.dc_date,
            description: it.description,
            source: it.source.map(EntrySource::from),
        }
    }
}

/// Parse an RSS 2.0 document (`<rss><channel><item>..`).
pub fn parse_rss(xml: &str) -> Result<Vec<RawEntry>, FetchError> {
    let rss: Rss = from_str(xml).map_err(|e| FetchError::Parse(format!("rss: {e}")))?;
    Ok(rss.channel.item.into_iter().map(RawEntry::from).collect())
}

/// Parse an RSS 1.0 / RDF document (`<rdf:RDF><channel/><item>..`).
pub fn parse_rdf(xml: &str) -> Result<Vec<RawEntry>, FetchError> {
    let rdf: Rdf = from_str(xml).map_err(|e| FetchError::Parse(format!("rdf: {e}")))?;
    Ok(rdf.item.into_iter().map(RawEntry::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_google_news_style_item() {
        let xml = r##"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Top stories</title>
    <item>
      <title>Rates rise - Example Daily</title>
      <link>https://example.com/a</link>
      <pubDate>Mon, 19 Oct 2026 08:00:00 GMT</pubDate>
      <description>&lt;a href="https://example.com/a"&gt;Rates rise&lt;/a&gt;&amp;nbsp;&amp;nbsp;&lt;font color="#6f6f6f"&gt;Example Daily&lt;/font&gt;</description>
      <source url="https://example.com">Example Daily</source>
    </item>
  </channel>
</rss>"##;
        let items = parse_rss(xml).unwrap();
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.title, "Rates rise - Example Daily");
        assert_eq!(it.link, "https://example.com/a");
        assert_eq!(it.published_raw(), Some("Mon, 19 Oct 2026 08:00:00 GMT"));
        assert!(it
            .description
            .as_deref()
            .unwrap()
            .contains(r##"<font color="#6f6f6f">Example Daily</font>"##));
        assert_eq!(
            it.source,
            Some(EntrySource::Structured {
                text: Some("Example Daily".into()),
                url: Some("https://example.com".into()),
            })
        );
    }

    #[test]
    fn empty_channel_is_not_an_error() {
        let xml = r#"<rss version="2.0"><channel><title>x</title></channel></rss>"#;
        assert!(parse_rss(xml).unwrap().is_empty());
    }

    #[test]
    fn missing_channel_is_a_parse_error() {
        let err = parse_rss("<rss version=\"2.0\"></rss>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
