use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{ConfluenceError, Result};
use crate::domain::{Post, MIN_PUBLISH_DATE};
use crate::store::{PostPage, PostQuery, Store};

const POST_COLUMNS: &str = "id, publisher_id, title, subtitle, author, publication_name, \
                            publish_date, link, cover_image, logo_url";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ConfluenceError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn from_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap_or(MIN_PUBLISH_DATE)
    }

    fn row_to_post(row: &Row<'_>) -> rusqlite::Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            publisher_id: row.get(1)?,
            title: row.get(2)?,
            subtitle: row.get(3)?,
            author: row.get(4)?,
            publication_name: row.get(5)?,
            publish_date: Self::from_millis(row.get(6)?),
            link: row.get(7)?,
            cover_image: row.get(8)?,
            logo_url: row.get(9)?,
        })
    }

    /// LIKE pattern for a case-insensitive substring match.
    fn like_pattern(search: &str) -> String {
        let escaped = search
            .to_lowercase()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }
}

impl Store for SqliteStore {
    fn replace_publisher_posts(&self, publisher_id: &str, posts: &[Post]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM posts WHERE publisher_id = ?1",
            params![publisher_id],
        )?;

        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO posts (id, publisher_id, title, subtitle, author, publication_name,
                                    publish_date, link, cover_image, logo_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    publisher_id = excluded.publisher_id,
                    title = excluded.title,
                    subtitle = excluded.subtitle,
                    author = excluded.author,
                    publication_name = excluded.publication_name,
                    publish_date = excluded.publish_date,
                    link = excluded.link,
                    cover_image = excluded.cover_image,
                    logo_url = excluded.logo_url",
            )?;

            for post in posts {
                written += stmt.execute(params![
                    post.id,
                    publisher_id,
                    post.title,
                    post.subtitle,
                    post.author,
                    post.publication_name,
                    Self::to_millis(&post.publish_date),
                    post.link,
                    post.cover_image,
                    post.logo_url,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(
            "Replaced {} posts with {} for publisher {}",
            removed,
            written,
            publisher_id
        );

        Ok(written)
    }

    fn get_all_posts(&self) -> Result<Vec<Post>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts ORDER BY publish_date DESC, id",
            POST_COLUMNS
        ))?;

        let posts = stmt
            .query_map([], Self::row_to_post)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn get_posts_by_publisher(&self, publisher_id: &str) -> Result<Vec<Post>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE publisher_id = ?1 ORDER BY publish_date DESC, id",
            POST_COLUMNS
        ))?;

        let posts = stmt
            .query_map(params![publisher_id], Self::row_to_post)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let conn = self.conn()?;

        let post = conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
                params![id],
                Self::row_to_post,
            )
            .optional()?;

        Ok(post)
    }

    fn query_posts(&self, query: &PostQuery) -> Result<PostPage> {
        let conn = self.conn()?;

        let page = query.page.max(1);
        let limit = query.limit.max(1);
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::like_pattern);

        let filter = "(?1 IS NULL
                       OR lower(title) LIKE ?1 ESCAPE '\\'
                       OR lower(subtitle) LIKE ?1 ESCAPE '\\'
                       OR lower(author) LIKE ?1 ESCAPE '\\')
                      AND (?2 IS NULL OR publisher_id = ?2)";

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM posts WHERE {}", filter),
            params![pattern, query.publisher_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE {} ORDER BY publish_date DESC, id LIMIT ?3 OFFSET ?4",
            POST_COLUMNS, filter
        ))?;

        let offset = (page - 1) * limit;
        let posts = stmt
            .query_map(
                params![pattern, query.publisher_id, limit as i64, offset as i64],
                Self::row_to_post,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total = total as usize;
        Ok(PostPage {
            total,
            page,
            limit,
            has_more: offset + posts.len() < total,
            posts,
        })
    }

    fn count_posts(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_posts_by_publisher(&self) -> Result<HashMap<String, usize>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT publisher_id, COUNT(*) FROM posts GROUP BY publisher_id")?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        Ok(counts)
    }

    fn latest_logo(&self, publisher_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;

        let logo = conn
            .query_row(
                "SELECT logo_url FROM posts
                 WHERE publisher_id = ?1 AND logo_url IS NOT NULL
                 ORDER BY publish_date DESC LIMIT 1",
                params![publisher_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(logo)
    }

    fn load_refresh_state(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT publisher_id, latest_seen FROM refresh_state")?;

        let state = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    Self::from_millis(row.get::<_, i64>(1)?),
                ))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        Ok(state)
    }

    fn save_refresh_state(&self, publisher_id: &str, latest_seen: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO refresh_state (publisher_id, latest_seen) VALUES (?1, ?2)
             ON CONFLICT(publisher_id) DO UPDATE
             SET latest_seen = MAX(latest_seen, excluded.latest_seen)",
            params![publisher_id, Self::to_millis(&latest_seen)],
        )?;

        Ok(())
    }
}
