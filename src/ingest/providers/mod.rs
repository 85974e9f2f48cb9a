// src/ingest/providers/mod.rs
pub mod atom;
pub mod http;
pub mod rss;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::FetchError;
use crate::ingest::types::RawEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Rss,
    Rdf,
    Atom,
}

/// Identify the feed dialect from the document's root element.
pub fn sniff_dialect(xml: &str) -> Result<Dialect, FetchError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"rss" => Ok(Dialect::Rss),
                    b"RDF" => Ok(Dialect::Rdf),
                    b"feed" => Ok(Dialect::Atom),
                    other => Err(FetchError::Parse(format!(
                        "unrecognized root element <{}>",
                        String::from_utf8_lossy(other)
                    ))),
                };
            }
            Ok(Event::Eof) => return Err(FetchError::Parse("empty document".into())),
            Ok(_) => continue,
            Err(e) => return Err(FetchError::Parse(format!("xml: {e}"))),
        }
    }
}

/// Parse a feed payload of any supported dialect, in document order.
pub fn parse_feed(payload: &str) -> Result<Vec<RawEntry>, FetchError> {
    let xml = scrub_html_entities_for_xml(payload);
    match sniff_dialect(&xml)? {
        Dialect::Rss => rss::parse_rss(&xml),
        Dialect::Rdf => rss::parse_rdf(&xml),
        Dialect::Atom => atom::parse_atom(&xml),
    }
}

/// Feeds in the wild use HTML entities XML does not define.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
