pub mod http_fetcher;
pub mod parser;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::Publisher;
use crate::logo::LogoCache;

pub use parser::{parse_feed, Enclosure, FeedMeta, ParsedFeed, RawEntry};

/// Transport for raw feed documents.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches and parses one publisher's feed. Every failure is logged and
/// turned into an empty feed so one broken source never stops the others.
#[derive(Clone)]
pub struct FeedReader {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    logos: Arc<dyn LogoCache + Send + Sync>,
}

impl FeedReader {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        logos: Arc<dyn LogoCache + Send + Sync>,
    ) -> Self {
        Self { fetcher, logos }
    }

    pub async fn read(&self, publisher: &Publisher) -> ParsedFeed {
        let Some(url) = publisher.feed_url() else {
            tracing::warn!("Publisher {} has no feed URL", publisher.id);
            return ParsedFeed::default();
        };

        tracing::debug!("Fetching feed for {} from {}", publisher.name, url);

        let body = match self.fetcher.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Error fetching feed for {}: {}", publisher.name, e);
                return ParsedFeed::default();
            }
        };

        let feed = match parse_feed(&body) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!("Error parsing feed for {}: {}", publisher.name, e);
                return ParsedFeed::default();
            }
        };

        tracing::debug!(
            "Feed for {} has {} entries",
            publisher.name,
            feed.entries.len()
        );

        if let Some(ref logo_url) = feed.meta.logo_url {
            self.logos.put(&publisher.id, logo_url);
        }

        feed
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{rss, ScriptedFetcher};
    use super::*;
    use crate::logo::MemoryLogoCache;

    fn reader(fetcher: Arc<ScriptedFetcher>) -> (FeedReader, Arc<MemoryLogoCache>) {
        let logos = Arc::new(MemoryLogoCache::new());
        (FeedReader::new(fetcher, logos.clone()), logos)
    }

    #[tokio::test]
    async fn test_read_returns_entries() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set(
            "https://a.example.com/feed",
            rss("A", &[("a-1", "Hello", "Mon, 01 Jan 2024 00:00:00 GMT")]),
        );
        let (reader, _) = reader(fetcher);

        let publisher = Publisher::new("a", "A", "https://a.example.com/feed");
        let feed = reader.read(&publisher).await;
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.meta.title, Some("A".into()));
    }

    #[tokio::test]
    async fn test_read_writes_feed_logo_to_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set(
            "https://a.example.com/feed",
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>A</title><link>https://a.example.com</link>
  <description>a</description>
  <image><url>https://a.example.com/logo.png</url><title>A</title><link>https://a.example.com</link></image>
  <item><title>Hello</title><link>https://a.example.com/p/1</link><guid>a-1</guid></item>
</channel></rss>"#,
        );
        let (reader, logos) = reader(fetcher);

        let publisher = Publisher::new("a", "A", "https://a.example.com/feed");
        let feed = reader.read(&publisher).await;

        assert_eq!(feed.meta.logo_url, Some("https://a.example.com/logo.png".into()));
        assert_eq!(logos.get("a"), Some("https://a.example.com/logo.png".into()));
    }

    #[tokio::test]
    async fn test_read_without_logo_leaves_cache_alone() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set(
            "https://a.example.com/feed",
            rss("A", &[("a-1", "Hello", "Mon, 01 Jan 2024 00:00:00 GMT")]),
        );
        let (reader, logos) = reader(fetcher);

        let publisher = Publisher::new("a", "A", "https://a.example.com/feed");
        reader.read(&publisher).await;
        assert_eq!(logos.get("a"), None);
    }

    #[tokio::test]
    async fn test_read_network_failure_is_empty() {
        let (reader, _) = reader(Arc::new(ScriptedFetcher::new()));

        let publisher = Publisher::new("a", "A", "https://down.example.com/feed");
        assert!(reader.read(&publisher).await.is_empty());
    }

    #[tokio::test]
    async fn test_read_malformed_feed_is_empty() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set("https://a.example.com/feed", "<html>not a feed");
        let (reader, _) = reader(fetcher);

        let publisher = Publisher::new("a", "A", "https://a.example.com/feed");
        assert!(reader.read(&publisher).await.is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_url_is_empty() {
        let (reader, _) = reader(Arc::new(ScriptedFetcher::new()));

        let mut publisher = Publisher::new("a", "A", "");
        publisher.feed_url = None;
        assert!(reader.read(&publisher).await.is_empty());
    }
}
