pub mod sqlite;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::Post;

pub use sqlite::SqliteStore;

pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Filtered, paginated read over every stored post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    /// Case-insensitive match against title, subtitle and author.
    pub search: Option<String>,
    pub publisher_id: Option<String>,
    /// 1-based.
    pub page: usize,
    pub limit: usize,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            search: None,
            publisher_id: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
    pub posts: Vec<Post>,
}

pub trait Store {
    /// Replace everything stored for `publisher_id` with `posts`, upserting
    /// by post id. Returns the number of posts written.
    fn replace_publisher_posts(&self, publisher_id: &str, posts: &[Post]) -> Result<usize>;

    // Reads, newest first
    fn get_all_posts(&self) -> Result<Vec<Post>>;
    fn get_posts_by_publisher(&self, publisher_id: &str) -> Result<Vec<Post>>;
    fn get_post(&self, id: &str) -> Result<Option<Post>>;
    fn query_posts(&self, query: &PostQuery) -> Result<PostPage>;
    fn count_posts(&self) -> Result<usize>;
    fn count_posts_by_publisher(&self) -> Result<HashMap<String, usize>>;
    fn latest_logo(&self, publisher_id: &str) -> Result<Option<String>>;

    // Refresh state
    fn load_refresh_state(&self) -> Result<HashMap<String, DateTime<Utc>>>;
    fn save_refresh_state(&self, publisher_id: &str, latest_seen: DateTime<Utc>) -> Result<()>;
}
