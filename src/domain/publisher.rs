use serde::{Deserialize, Serialize};

/// A registered content source. Loaded once at startup and never mutated
/// by the refresh engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "rssUrl", alias = "feedUrl")]
    pub feed_url: Option<String>,
    #[serde(default, alias = "publicationName")]
    pub publication_name: Option<String>,
}

impl Publisher {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        feed_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            feed_url: Some(feed_url.into()),
            publication_name: None,
        }
    }

    /// Feed URL, treating blank values as missing.
    pub fn feed_url(&self) -> Option<&str> {
        self.feed_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Publication name used on posts: the configured one, then the feed
    /// title, then the publisher's own name.
    pub fn display_publication<'a>(&'a self, feed_title: Option<&'a str>) -> &'a str {
        self.publication_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(feed_title.filter(|title| !title.trim().is_empty()))
            .unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_feed_url_is_missing() {
        let mut publisher = Publisher::new("p1", "Alice", "   ");
        assert_eq!(publisher.feed_url(), None);

        publisher.feed_url = None;
        assert_eq!(publisher.feed_url(), None);
    }

    #[test]
    fn test_feed_url_trimmed() {
        let publisher = Publisher::new("p1", "Alice", " https://example.com/feed ");
        assert_eq!(publisher.feed_url(), Some("https://example.com/feed"));
    }

    #[test]
    fn test_display_publication_fallbacks() {
        let mut publisher = Publisher::new("p1", "Alice", "https://example.com/feed");
        assert_eq!(publisher.display_publication(Some("Feed Title")), "Feed Title");
        assert_eq!(publisher.display_publication(None), "Alice");

        publisher.publication_name = Some("Alice's Letters".into());
        assert_eq!(
            publisher.display_publication(Some("Feed Title")),
            "Alice's Letters"
        );
    }

    #[test]
    fn test_deserialize_camel_case_registry() {
        let json = r#"{"id":"p1","name":"Alice","rssUrl":"https://example.com/feed","publicationName":"Letters"}"#;
        let publisher: Publisher = serde_json::from_str(json).unwrap();
        assert_eq!(publisher.feed_url(), Some("https://example.com/feed"));
        assert_eq!(publisher.publication_name.as_deref(), Some("Letters"));
    }
}
