pub mod extract;

use html_escape::decode_html_entities;

use crate::domain::{Post, Publisher, MIN_PUBLISH_DATE};
use crate::fetcher::{FeedMeta, ParsedFeed, RawEntry};

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Map every entry of a fetched feed to a post, keeping feed order.
    pub fn normalize_feed(&self, feed: &ParsedFeed, publisher: &Publisher) -> Vec<Post> {
        feed.entries
            .iter()
            .map(|entry| self.normalize(entry, publisher, &feed.meta))
            .collect()
    }

    pub fn normalize(&self, entry: &RawEntry, publisher: &Publisher, meta: &FeedMeta) -> Post {
        let id = entry_id(entry);
        let content = entry.content.as_deref();
        let description = entry.description.as_deref();

        Post {
            link: entry.link.clone().unwrap_or_else(|| id.clone()),
            id,
            title: entry
                .title
                .as_deref()
                .map(|t| decode_html_entities(t.trim()).to_string())
                .unwrap_or_default(),
            subtitle: extract::subtitle(content, description),
            author: publisher.name.clone(),
            publication_name: publisher
                .display_publication(meta.title.as_deref())
                .to_string(),
            publish_date: entry.published.unwrap_or(MIN_PUBLISH_DATE),
            publisher_id: publisher.id.clone(),
            cover_image: extract::cover_image(&entry.enclosures, content, description),
            logo_url: meta.logo_url.clone(),
        }
    }
}

/// Source guid, else the entry link. Entries with neither get an empty id
/// and are dropped by the orchestrator.
fn entry_id(entry: &RawEntry) -> String {
    entry
        .guid
        .as_deref()
        .or(entry.link.as_deref())
        .map(|id| id.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{parse_feed, Enclosure};
    use chrono::{TimeZone, Utc};

    fn publisher() -> Publisher {
        Publisher::new("alice", "Alice", "https://alice.example.com/feed")
    }

    fn meta() -> FeedMeta {
        FeedMeta {
            title: Some("Alice's Letters".into()),
            logo_url: Some("https://alice.example.com/logo.png".into()),
        }
    }

    fn entry() -> RawEntry {
        RawEntry {
            guid: Some("guid-1".into()),
            link: Some("https://alice.example.com/p/one".into()),
            title: Some("On Rivers &amp; Seas".into()),
            content: Some("<p>Content paragraph</p>".into()),
            description: Some("Description text".into()),
            published: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            enclosures: vec![],
        }
    }

    #[test]
    fn test_normalize_maps_fields() {
        let post = Normalizer::new().normalize(&entry(), &publisher(), &meta());

        assert_eq!(post.id, "guid-1");
        assert_eq!(post.title, "On Rivers & Seas");
        assert_eq!(post.subtitle, "Content paragraph");
        assert_eq!(post.author, "Alice");
        assert_eq!(post.publication_name, "Alice's Letters");
        assert_eq!(post.link, "https://alice.example.com/p/one");
        assert_eq!(post.publisher_id, "alice");
        assert_eq!(post.logo_url, Some("https://alice.example.com/logo.png".into()));
        assert_eq!(
            post.publish_date,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_id_falls_back_to_link() {
        let mut raw = entry();
        raw.guid = None;
        let post = Normalizer::new().normalize(&raw, &publisher(), &meta());
        assert_eq!(post.id, "https://alice.example.com/p/one");
    }

    #[test]
    fn test_parsed_item_without_guid_uses_link() {
        let body = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>X</title><link>https://x.example.com</link>
  <description>x</description>
  <item><title>No guid</title><link>https://x.example.com/p/no-guid</link></item>
  <item><title>Nothing to go on</title></item>
</channel></rss>"#;
        let feed = parse_feed(body.as_bytes()).unwrap();
        let posts = Normalizer::new().normalize_feed(&feed, &publisher());

        assert_eq!(posts[0].id, "https://x.example.com/p/no-guid");
        assert_eq!(posts[0].link, "https://x.example.com/p/no-guid");
        assert_eq!(posts[1].id, "");
    }

    #[test]
    fn test_same_guid_same_id() {
        let normalizer = Normalizer::new();
        let mut other = entry();
        other.title = Some("Edited title".into());

        let a = normalizer.normalize(&entry(), &publisher(), &meta());
        let b = normalizer.normalize(&other, &publisher(), &meta());
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_unparseable_date_is_minimum() {
        let mut raw = entry();
        raw.published = None;
        let post = Normalizer::new().normalize(&raw, &publisher(), &meta());
        assert_eq!(post.publish_date, MIN_PUBLISH_DATE);
        assert!(!post.has_publish_date());
    }

    #[test]
    fn test_subtitle_content_only() {
        let mut raw = entry();
        raw.description = None;
        let post = Normalizer::new().normalize(&raw, &publisher(), &meta());
        assert_eq!(post.subtitle, "Content paragraph");
    }

    #[test]
    fn test_subtitle_description_only() {
        let mut raw = entry();
        raw.content = None;
        let post = Normalizer::new().normalize(&raw, &publisher(), &meta());
        assert_eq!(post.subtitle, "Description text");
    }

    #[test]
    fn test_subtitle_neither() {
        let mut raw = entry();
        raw.content = None;
        raw.description = None;
        let post = Normalizer::new().normalize(&raw, &publisher(), &meta());
        assert_eq!(post.subtitle, "");
        assert_eq!(post.cover_image, None);
    }

    #[test]
    fn test_cover_image_enclosure_over_inline() {
        let mut raw = entry();
        raw.content = Some(r#"<p><img src="https://inline.example.com/i.png"></p>"#.into());
        raw.enclosures = vec![Enclosure {
            url: "https://cdn.example.com/cover.jpg".into(),
            media_type: Some("image/jpeg".into()),
        }];
        let post = Normalizer::new().normalize(&raw, &publisher(), &meta());
        assert_eq!(post.cover_image, Some("https://cdn.example.com/cover.jpg".into()));
    }

    #[test]
    fn test_logo_absent_is_none() {
        let meta = FeedMeta {
            title: None,
            logo_url: None,
        };
        let post = Normalizer::new().normalize(&entry(), &publisher(), &meta);
        assert_eq!(post.logo_url, None);
        assert_eq!(post.publication_name, "Alice");
    }

    #[test]
    fn test_normalize_feed_shares_logo_and_order() {
        let body = crate::fetcher::testing::rss(
            "Feed",
            &[
                ("b", "Newer", "Tue, 02 Jan 2024 00:00:00 GMT"),
                ("a", "Older", "Mon, 01 Jan 2024 00:00:00 GMT"),
            ],
        );
        let feed = parse_feed(body.as_bytes()).unwrap();
        let posts = Normalizer::new().normalize_feed(&feed, &publisher());

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "b");
        assert_eq!(posts[1].id, "a");
        assert_eq!(posts[0].logo_url, posts[1].logo_url);
        assert_eq!(posts[0].subtitle, "About Newer");
    }
}
