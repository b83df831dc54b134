//! Notification hook fired once per refresh cycle that found new content.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::NewPost;

pub const DEFAULT_PREVIEW: usize = 5;

/// Payload handed to subscribers: the total count plus a bounded preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContentEvent {
    pub count: usize,
    pub posts: Vec<NewPost>,
}

impl NewContentEvent {
    pub fn preview(new_posts: &[NewPost], limit: usize) -> Self {
        Self {
            count: new_posts.len(),
            posts: new_posts.iter().take(limit).cloned().collect(),
        }
    }
}

/// Fire-and-forget sink. Implementations must not fail the caller.
pub trait Notifier {
    fn notify(&self, event: &NewContentEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &NewContentEvent) {}
}

/// Emits a log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &NewContentEvent) {
        tracing::info!("New content: {} post(s)", event.count);
        for new_post in &event.posts {
            tracing::info!(
                "  {} - {}",
                new_post.publisher_name,
                new_post.post.display_title()
            );
        }
    }
}

/// Pushes events to every live subscriber of a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<NewContentEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NewContentEvent> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: &NewContentEvent) {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                tracing::debug!("New content event sent to {} subscriber(s)", receivers)
            }
            Err(_) => tracing::debug!("New content event dropped: no subscribers"),
        }
    }
}

/// Fans one event out to several notifiers.
#[derive(Default)]
pub struct Notifiers {
    inner: Vec<Box<dyn Notifier + Send + Sync>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: impl Notifier + Send + Sync + 'static) -> Self {
        self.inner.push(Box::new(notifier));
        self
    }
}

impl Notifier for Notifiers {
    fn notify(&self, event: &NewContentEvent) {
        for notifier in &self.inner {
            notifier.notify(event);
        }
    }
}
