//! Refresh cycle: fetch → normalize → detect → persist for every publisher,
//! then one notification for everything new.
//!
//! Publishers are processed on separate tasks bounded by a semaphore. A
//! failure for one publisher (fetch, parse or persistence) only removes that
//! publisher from the cycle's results.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};

use crate::app::{ConfluenceError, Result};
use crate::detector::ChangeDetector;
use crate::domain::{NewPost, Post, Publisher};
use crate::fetcher::FeedReader;
use crate::normalizer::Normalizer;
use crate::notify::{NewContentEvent, Notifier, DEFAULT_PREVIEW};
use crate::store::Store;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Publishers processed concurrently.
    pub workers: usize,
    /// Posts included in the notification payload.
    pub preview: usize,
    /// Restore and save per-publisher latest-seen dates through the store.
    pub persist_state: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            preview: DEFAULT_PREVIEW,
            persist_state: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    /// Publishers that produced new content.
    pub updated_count: usize,
    pub new_content_found: bool,
    pub new_posts: Vec<NewPost>,
    /// Posts written to the store across all publishers.
    pub persisted_count: usize,
    /// Publishers without a feed URL or with an empty fetch.
    pub skipped: Vec<String>,
    /// Publishers whose posts could not be persisted.
    pub failed: Vec<String>,
}

#[derive(Debug)]
enum Outcome {
    Skipped,
    Failed,
    Refreshed {
        persisted: usize,
        new_posts: Vec<NewPost>,
    },
}

/// Per-publisher pipeline shared by the worker tasks.
struct Pipeline {
    reader: FeedReader,
    normalizer: Normalizer,
    detector: Arc<ChangeDetector>,
    store: Arc<dyn Store + Send + Sync>,
    persist_state: bool,
}

impl Pipeline {
    async fn refresh_publisher(&self, publisher: &Publisher) -> Outcome {
        if publisher.feed_url().is_none() {
            tracing::warn!("Missing feed URL for publisher {}, skipping", publisher.id);
            return Outcome::Skipped;
        }

        let feed = self.reader.read(publisher).await;
        if feed.is_empty() {
            tracing::info!("No posts found for {}", publisher.name);
            return Outcome::Skipped;
        }

        let posts: Vec<Post> = self
            .normalizer
            .normalize_feed(&feed, publisher)
            .into_iter()
            .filter(|post| {
                if post.id.is_empty() {
                    tracing::debug!("Dropping entry without id or link from {}", publisher.name);
                }
                !post.id.is_empty()
            })
            .collect();

        if posts.is_empty() {
            tracing::info!("No usable posts for {}", publisher.name);
            return Outcome::Skipped;
        }

        tracing::debug!("Processing {} posts for {}", posts.len(), publisher.name);

        let detection = self.detector.evaluate(&publisher.id, &posts);

        let persisted = match self.store.replace_publisher_posts(&publisher.id, &posts) {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Error saving posts for {}: {}", publisher.name, e);
                return Outcome::Failed;
            }
        };
        tracing::info!("Saved {} posts for {}", persisted, publisher.name);

        let new_posts = match (detection.is_new_content, detection.latest) {
            (true, Some(latest)) => {
                self.detector.commit(&publisher.id, latest);
                if self.persist_state {
                    if let Err(e) = self.store.save_refresh_state(&publisher.id, latest) {
                        tracing::warn!("Could not save refresh state for {}: {}", publisher.id, e);
                    }
                }

                tracing::info!(
                    "{} new posts from {}",
                    detection.new_posts.len(),
                    publisher.name
                );
                detection
                    .new_posts
                    .into_iter()
                    .map(|post| NewPost::new(post, publisher.name.clone()))
                    .collect()
            }
            _ => {
                tracing::debug!("No new content for {}", publisher.name);
                Vec::new()
            }
        };

        Outcome::Refreshed {
            persisted,
            new_posts,
        }
    }
}

pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    notifier: Arc<dyn Notifier + Send + Sync>,
    semaphore: Arc<Semaphore>,
    preview: usize,
    running: Mutex<()>,
    latest_new_posts: RwLock<Vec<NewPost>>,
}

impl Orchestrator {
    pub fn new(
        reader: FeedReader,
        store: Arc<dyn Store + Send + Sync>,
        notifier: Arc<dyn Notifier + Send + Sync>,
        options: RefreshOptions,
    ) -> Self {
        let detector = Arc::new(ChangeDetector::new());

        if options.persist_state {
            match store.load_refresh_state() {
                Ok(state) => {
                    tracing::debug!("Restored refresh state for {} publishers", state.len());
                    detector.restore(state);
                }
                Err(e) => tracing::warn!("Could not restore refresh state: {}", e),
            }
        }

        Self {
            pipeline: Arc::new(Pipeline {
                reader,
                normalizer: Normalizer::new(),
                detector,
                store,
                persist_state: options.persist_state,
            }),
            notifier,
            semaphore: Arc::new(Semaphore::new(options.workers.max(1))),
            preview: options.preview,
            running: Mutex::new(()),
            latest_new_posts: RwLock::new(Vec::new()),
        }
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.pipeline.detector
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// New posts found by the most recent cycle that found any.
    pub fn latest_new_posts(&self) -> Vec<NewPost> {
        self.latest_new_posts
            .read()
            .map(|posts| posts.clone())
            .unwrap_or_default()
    }

    /// Run one refresh cycle. Per-publisher failures are absorbed; the only
    /// error is [`ConfluenceError::RefreshInProgress`] when another cycle on
    /// this orchestrator has not finished.
    pub async fn refresh_all(&self, publishers: &[Publisher]) -> Result<RefreshSummary> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| ConfluenceError::RefreshInProgress)?;

        tracing::info!("Starting feed refresh for {} publishers", publishers.len());

        let mut handles = Vec::with_capacity(publishers.len());
        for publisher in publishers {
            let pipeline = self.pipeline.clone();
            let semaphore = self.semaphore.clone();
            let publisher = publisher.clone();

            let handle = tokio::spawn(async move {
                match semaphore.acquire().await {
                    Ok(_permit) => pipeline.refresh_publisher(&publisher).await,
                    Err(_) => Outcome::Failed,
                }
            });

            handles.push(handle);
        }

        let results = futures::future::join_all(handles).await;

        let mut summary = RefreshSummary::default();
        for (publisher, result) in publishers.iter().zip(results) {
            match result {
                Ok(Outcome::Skipped) => summary.skipped.push(publisher.id.clone()),
                Ok(Outcome::Failed) => summary.failed.push(publisher.id.clone()),
                Ok(Outcome::Refreshed {
                    persisted,
                    new_posts,
                }) => {
                    summary.persisted_count += persisted;
                    if !new_posts.is_empty() {
                        summary.updated_count += 1;
                        summary.new_content_found = true;
                        summary.new_posts.extend(new_posts);
                    }
                }
                Err(e) => {
                    tracing::error!("Refresh task for {} failed: {}", publisher.id, e);
                    summary.failed.push(publisher.id.clone());
                }
            }
        }

        if summary.new_content_found {
            self.notifier
                .notify(&NewContentEvent::preview(&summary.new_posts, self.preview));
            if let Ok(mut latest) = self.latest_new_posts.write() {
                *latest = summary.new_posts.clone();
            }
        }

        tracing::info!(
            "Refresh complete: {} updated, {} new posts, {} skipped, {} failed",
            summary.updated_count,
            summary.new_posts.len(),
            summary.skipped.len(),
            summary.failed.len()
        );

        Ok(summary)
    }
}
