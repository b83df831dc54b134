use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfluenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Publisher not found: {0}")]
    PublisherNotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("A refresh is already in progress")]
    RefreshInProgress,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ConfluenceError>;
