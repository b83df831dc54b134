//! Best-effort publisher logo lookup.
//!
//! Writes may fail silently and a miss is never an error: callers always
//! get some image reference back from [`resolve_logo`].

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::domain::Publisher;
use crate::store::Store;

pub const DEFAULT_LOGO: &str = "/placeholder-image.jpg";

pub trait LogoCache {
    fn put(&self, publisher_id: &str, logo_url: &str);
    fn get(&self, publisher_id: &str) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct MemoryLogoCache {
    logos: RwLock<HashMap<String, String>>,
}

impl MemoryLogoCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogoCache for MemoryLogoCache {
    fn put(&self, publisher_id: &str, logo_url: &str) {
        if let Ok(mut logos) = self.logos.write() {
            logos.insert(publisher_id.to_string(), logo_url.to_string());
        }
    }

    fn get(&self, publisher_id: &str) -> Option<String> {
        self.logos.read().ok()?.get(publisher_id).cloned()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LogoRecord {
    logo_url: String,
}

/// One `<publisher_id>.json` file per publisher under a directory.
#[derive(Debug, Clone)]
pub struct FileLogoCache {
    dir: PathBuf,
}

impl FileLogoCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, publisher_id: &str) -> PathBuf {
        let file_name: String = publisher_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    fn write(&self, publisher_id: &str, logo_url: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let record = LogoRecord {
            logo_url: logo_url.to_string(),
        };
        fs::write(self.path_for(publisher_id), serde_json::to_vec(&record)?)
    }
}

impl LogoCache for FileLogoCache {
    fn put(&self, publisher_id: &str, logo_url: &str) {
        match self.write(publisher_id, logo_url) {
            Ok(()) => tracing::debug!("Saved logo for {}", publisher_id),
            Err(e) => tracing::debug!("Could not save logo for {}: {}", publisher_id, e),
        }
    }

    fn get(&self, publisher_id: &str) -> Option<String> {
        let content = fs::read(self.path_for(publisher_id)).ok()?;
        match serde_json::from_slice::<LogoRecord>(&content) {
            Ok(record) => Some(record.logo_url),
            Err(e) => {
                tracing::warn!("Error reading logo for {}: {}", publisher_id, e);
                None
            }
        }
    }
}

/// Logo for a publisher: cached value, then any stored post's logo, then
/// the feed host's favicon, then `default_logo`.
pub fn resolve_logo<S: Store + ?Sized>(
    publisher: &Publisher,
    cache: &dyn LogoCache,
    store: &S,
    default_logo: &str,
) -> String {
    if let Some(logo) = cache.get(&publisher.id) {
        return logo;
    }

    match store.latest_logo(&publisher.id) {
        Ok(Some(logo)) => return logo,
        Ok(None) => {}
        Err(e) => tracing::warn!("Error looking up stored logo for {}: {}", publisher.id, e),
    }

    publisher
        .feed_url()
        .and_then(favicon_for)
        .unwrap_or_else(|| default_logo.to_string())
}

fn favicon_for(feed_url: &str) -> Option<String> {
    let url = url::Url::parse(feed_url).ok()?;
    let host = url.host_str()?;
    Some(format!("{}://{}/favicon.ico", url.scheme(), host))
}
