use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp given to entries whose publication date is missing or
/// unparseable. Sorts last and never counts as new.
pub const MIN_PUBLISH_DATE: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub publication_name: String,
    pub publish_date: DateTime<Utc>,
    pub link: String,
    pub publisher_id: String,
    pub cover_image: Option<String>,
    pub logo_url: Option<String>,
}

impl Post {
    pub fn has_publish_date(&self) -> bool {
        self.publish_date > MIN_PUBLISH_DATE
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// A post detected as new during a refresh cycle, tagged with the name of
/// the publisher it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[serde(flatten)]
    pub post: Post,
    pub publisher_name: String,
}

impl NewPost {
    pub fn new(post: Post, publisher_name: impl Into<String>) -> Self {
        Self {
            post,
            publisher_name: publisher_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(title: &str) -> Post {
        Post {
            id: "guid-1".into(),
            title: title.into(),
            subtitle: String::new(),
            author: "Alice".into(),
            publication_name: "Letters".into(),
            publish_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            link: "https://example.com/1".into(),
            publisher_id: "alice".into(),
            cover_image: None,
            logo_url: None,
        }
    }

    #[test]
    fn test_display_title() {
        assert_eq!(post("Hello").display_title(), "Hello");
        assert_eq!(post("").display_title(), "(Untitled)");
    }

    #[test]
    fn test_min_publish_date_sorts_first_ascending() {
        let mut undated = post("Undated");
        undated.publish_date = MIN_PUBLISH_DATE;
        assert!(!undated.has_publish_date());
        assert!(post("Dated").publish_date > undated.publish_date);
    }

    #[test]
    fn test_new_post_serializes_flat() {
        let tagged = NewPost::new(post("Hello"), "Alice");
        let value = serde_json::to_value(&tagged).unwrap();
        assert_eq!(value["publisherId"], "alice");
        assert_eq!(value["publisherName"], "Alice");
        assert_eq!(value["title"], "Hello");
    }
}
