use chrono::{DateTime, Utc};
use feed_rs::parser;

use crate::app::{ConfluenceError, Result};

/// Binary attachment declared on an entry (`<enclosure>` / media content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub media_type: Option<String>,
}

/// One feed entry before normalization. Fields are kept as close to the
/// source document as feed-rs allows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    /// Full body (`content:encoded` / Atom content).
    pub content: Option<String>,
    /// Short description (`description` / Atom summary).
    pub description: Option<String>,
    /// `None` when the source date was absent or could not be parsed.
    pub published: Option<DateTime<Utc>>,
    pub enclosures: Vec<Enclosure>,
}

/// Feed-level metadata shared by every entry of one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub meta: FeedMeta,
    /// Entries in document order.
    pub entries: Vec<RawEntry>,
}

impl ParsedFeed {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn parse_feed(body: &[u8]) -> Result<ParsedFeed> {
    // Entries without a source id keep an empty one instead of a generated hash.
    let feed = parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build()
        .parse(body)
        .map_err(|e| ConfluenceError::FeedParse(e.to_string()))?;

    let meta = FeedMeta {
        title: feed.title.map(|t| t.content),
        logo_url: feed
            .logo
            .map(|image| image.uri)
            .filter(|uri| !uri.trim().is_empty()),
    };

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let enclosures = entry
                .media
                .iter()
                .flat_map(|media| media.content.iter())
                .filter_map(|content| {
                    let url = content.url.as_ref()?.to_string();
                    Some(Enclosure {
                        url,
                        media_type: content.content_type.as_ref().map(|m| m.to_string()),
                    })
                })
                .collect();

            RawEntry {
                guid: Some(entry.id).filter(|id| !id.trim().is_empty()),
                link: entry
                    .links
                    .iter()
                    .map(|l| l.href.trim())
                    .find(|href| !href.is_empty())
                    .map(String::from),
                title: entry.title.map(|t| t.content),
                content: entry.content.and_then(|c| c.body),
                description: entry.summary.map(|s| s.content),
                published: entry.published.or(entry.updated),
                enclosures,
            }
        })
        .collect();

    Ok(ParsedFeed { meta, entries })
}
