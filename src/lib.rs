//! # Confluence
//!
//! Aggregates a fixed registry of publishers' RSS/Atom feeds into one post
//! store and reports which posts are new since the last refresh.
//!
//! ## Architecture
//!
//! Each refresh cycle runs one pipeline per publisher:
//!
//! ```text
//! Fetcher → Normalizer → Detector → Store
//! ```
//!
//! and then fires a single notification for everything new.
//!
//! ## Quick Start
//!
//! ```bash
//! # Refresh once and print what changed
//! confluence refresh
//!
//! # Keep refreshing every 30 minutes (SIGUSR1 refreshes on demand)
//! confluence run --interval 30m
//!
//! # Browse stored posts
//! confluence posts --search rust --page 2
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// logo cache, fetcher and refresh orchestrator.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// TOML configuration and the publisher registry.
///
/// Loads from `~/.config/confluence/config.toml` unless `--config` is given.
pub mod config;

/// Foreground daemon: interval refreshes, on-demand triggers, signals.
pub mod daemon;

/// Per-publisher latest-seen tracking and new-post detection.
pub mod detector;

/// Core domain models.
///
/// - [`Publisher`](domain::Publisher): A registered feed source
/// - [`Post`](domain::Post): A normalized, stored feed entry
/// - [`NewPost`](domain::NewPost): A post reported as new, with its publisher's name
pub mod domain;

/// Feed transport and parsing.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for raw feed retrieval
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`FeedReader`](fetcher::FeedReader): Fetch + parse that never fails
pub mod fetcher;

/// Best-effort publisher logo cache and lookup.
pub mod logo;

/// Feed entries to [`Post`](domain::Post)s.
pub mod normalizer;

/// New-content notification sinks.
pub mod notify;

/// The refresh cycle over all publishers.
pub mod refresh;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
