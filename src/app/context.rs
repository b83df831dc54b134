use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::app::error::Result;
use crate::config::Config;
use crate::domain::Publisher;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::{FeedReader, Fetcher};
use crate::logo::{resolve_logo, FileLogoCache, LogoCache, MemoryLogoCache};
use crate::notify::{BroadcastNotifier, LogNotifier, NewContentEvent, Notifiers};
use crate::refresh::{Orchestrator, RefreshSummary};
use crate::store::sqlite::SqliteStore;

const EVENT_CAPACITY: usize = 16;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub logos: Arc<dyn LogoCache + Send + Sync>,
    pub orchestrator: Orchestrator,
    events: BroadcastNotifier,
}

impl AppContext {
    /// On-disk store and logo cache at the configured (or default) paths.
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.database_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let logos = Arc::new(FileLogoCache::new(config.logo_dir()?));
        let fetcher = Arc::new(HttpFetcher::with_timeout(Duration::from_secs(
            config.refresh.timeout_secs,
        ))?);

        tracing::debug!("Using database at {}", db_path.display());
        Ok(Self::with_parts(config, store, logos, fetcher))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let fetcher = Arc::new(HttpFetcher::with_timeout(Duration::from_secs(
            config.refresh.timeout_secs,
        ))?);

        Ok(Self::with_parts(
            config,
            store,
            Arc::new(MemoryLogoCache::new()),
            fetcher,
        ))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<SqliteStore>,
        logos: Arc<dyn LogoCache + Send + Sync>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
    ) -> Self {
        let events = BroadcastNotifier::new(EVENT_CAPACITY);
        let notifier = Notifiers::new().with(LogNotifier).with(events.clone());
        let reader = FeedReader::new(fetcher, logos.clone());

        let orchestrator = Orchestrator::new(
            reader,
            store.clone(),
            Arc::new(notifier),
            config.refresh.options(),
        );

        Self {
            config,
            store,
            logos,
            orchestrator,
            events,
        }
    }

    /// One refresh cycle over every registered publisher.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        self.orchestrator.refresh_all(&self.config.publishers).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NewContentEvent> {
        self.events.subscribe()
    }

    pub fn logo_for(&self, publisher: &Publisher) -> String {
        resolve_logo(
            publisher,
            self.logos.as_ref(),
            self.store.as_ref(),
            &self.config.logos.default_logo,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::{rss, ScriptedFetcher};

    #[tokio::test]
    async fn test_refresh_reaches_subscribers() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set(
            "https://alice.example.com/feed",
            rss("A", &[("a1", "One", "Mon, 01 Jan 2024 00:00:00 GMT")]),
        );
        let config = Config {
            publishers: vec![Publisher::new("alice", "Alice", "https://alice.example.com/feed")],
            ..Config::default()
        };
        let ctx = AppContext::with_parts(
            config,
            Arc::new(SqliteStore::in_memory().unwrap()),
            Arc::new(MemoryLogoCache::new()),
            fetcher,
        );
        let mut rx = ctx.subscribe();

        let summary = ctx.refresh().await.unwrap();
        assert_eq!(summary.updated_count, 1);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.count, 1);
        assert_eq!(event.posts[0].publisher_name, "Alice");

        let alice = ctx.config.publisher("alice").unwrap();
        assert_eq!(ctx.logo_for(alice), "https://alice.example.com/favicon.ico");
    }
}
