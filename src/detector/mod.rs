//! Change detection against the last publish date seen per publisher.
//!
//! A post is new when its publish date is strictly later than the latest
//! date recorded for its publisher. Recorded dates only ever move forward.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::domain::{Post, MIN_PUBLISH_DATE};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub is_new_content: bool,
    pub new_posts: Vec<Post>,
    /// Publish date of the first (newest) fetched post.
    pub latest: Option<DateTime<Utc>>,
}

/// Per-publisher `latest seen` timestamps. Each key is written by one
/// refresh at a time; reads and the compare-and-advance step happen under
/// one lock so updates for the same key never interleave.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    latest_seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed state, e.g. from persisted values. Existing later dates win.
    pub fn restore(&self, state: HashMap<String, DateTime<Utc>>) {
        let mut latest_seen = self.lock();
        for (publisher_id, seen) in state {
            let entry = latest_seen.entry(publisher_id).or_insert(seen);
            if seen > *entry {
                *entry = seen;
            }
        }
    }

    pub fn latest_seen(&self, publisher_id: &str) -> Option<DateTime<Utc>> {
        self.lock().get(publisher_id).copied()
    }

    pub fn snapshot(&self) -> HashMap<String, DateTime<Utc>> {
        self.lock().clone()
    }

    /// Compare freshly fetched posts (newest first) with recorded state
    /// without changing it.
    pub fn evaluate(&self, publisher_id: &str, posts: &[Post]) -> Detection {
        let Some(first) = posts.first() else {
            return Detection::default();
        };

        let previous = self.latest_seen(publisher_id).unwrap_or(MIN_PUBLISH_DATE);
        let latest = first.publish_date;

        if latest <= previous {
            return Detection {
                is_new_content: false,
                new_posts: Vec::new(),
                latest: Some(latest),
            };
        }

        let new_posts = posts
            .iter()
            .filter(|post| post.publish_date > previous)
            .cloned()
            .collect();

        Detection {
            is_new_content: true,
            new_posts,
            latest: Some(latest),
        }
    }

    /// Advance the recorded date. Never moves backwards; returns whether
    /// the state changed.
    pub fn commit(&self, publisher_id: &str, latest: DateTime<Utc>) -> bool {
        let mut latest_seen = self.lock();
        match latest_seen.get(publisher_id) {
            Some(previous) if *previous >= latest => false,
            _ => {
                latest_seen.insert(publisher_id.to_string(), latest);
                true
            }
        }
    }

    /// Evaluate and, on new content, record the newest date.
    pub fn detect_new(&self, publisher_id: &str, posts: &[Post]) -> Detection {
        let detection = self.evaluate(publisher_id, posts);
        if let (true, Some(latest)) = (detection.is_new_content, detection.latest) {
            self.commit(publisher_id, latest);
        }
        detection
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        // Poisoning is ignored: every write is a single insert.
        self.latest_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
