//! Configuration management for Confluence.
//!
//! Configuration is read from `~/.config/confluence/config.toml` unless a path
//! is given. If the default file doesn't exist, a commented template is
//! created; it has no publishers, so loading still fails until one is added.
//!
//! Publishers come from inline `[[publishers]]` tables and an optional JSON
//! registry file (`publishers_file`), merged in that order.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::daemon::DaemonConfig;
use crate::domain::Publisher;
use crate::logo::DEFAULT_LOGO;
use crate::notify::DEFAULT_PREVIEW;
use crate::refresh::{RefreshOptions, DEFAULT_WORKERS};

const APP_DIR: &str = "confluence";

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database path. Defaults to `<data_dir>/confluence/confluence.db`.
    pub database: Option<PathBuf>,
    pub log_level: String,
    /// JSON array of publishers, relative to the config file's directory.
    pub publishers_file: Option<PathBuf>,
    pub refresh: RefreshConfig,
    pub logos: LogoConfig,
    pub publishers: Vec<Publisher>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            log_level: "info".to_string(),
            publishers_file: None,
            refresh: RefreshConfig::default(),
            logos: LogoConfig::default(),
            publishers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval: String,
    pub on_start: bool,
    pub workers: usize,
    pub persist_state: bool,
    pub notify_preview: usize,
    pub timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: "30m".to_string(),
            on_start: true,
            workers: DEFAULT_WORKERS,
            persist_state: true,
            notify_preview: DEFAULT_PREVIEW,
            timeout_secs: crate::fetcher::http_fetcher::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RefreshConfig {
    pub fn interval_secs(&self) -> Result<u64, ConfigError> {
        match DaemonConfig::parse_interval(&self.interval) {
            Ok(0) => Err(ConfigError::InvalidInterval(self.interval.clone())),
            Ok(secs) => Ok(secs),
            Err(_) => Err(ConfigError::InvalidInterval(self.interval.clone())),
        }
    }

    pub fn options(&self) -> RefreshOptions {
        RefreshOptions {
            workers: self.workers.max(1),
            preview: self.notify_preview,
            persist_state: self.persist_state,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogoConfig {
    /// Logo cache directory. Defaults to `<data_dir>/confluence/logos`.
    pub dir: Option<PathBuf>,
    pub default_logo: String,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            dir: None,
            default_logo: DEFAULT_LOGO.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// A missing default file is replaced by the commented template. Missing
    /// fields use default values. The publisher registry must end up
    /// non-empty with unique ids.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    tracing::info!("Wrote default configuration to {}", default_path.display());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Self::parse(&content, &config_path)
    }

    /// Parse configuration text as if it were read from `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(file) = config.publishers_file.clone() {
            let registry_path = match path.parent() {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file,
            };
            let registered = load_registry(&registry_path)?;
            config.publishers.extend(registered);
        }

        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.publishers.is_empty() {
            return Err(ConfigError::NoPublishers {
                path: path.to_path_buf(),
            });
        }

        let mut seen = HashSet::new();
        for publisher in &self.publishers {
            if !seen.insert(publisher.id.as_str()) {
                return Err(ConfigError::DuplicatePublisher(publisher.id.clone()));
            }
        }

        self.refresh.interval_secs()?;
        Ok(())
    }

    pub fn publisher(&self, id: &str) -> Option<&Publisher> {
        self.publishers.iter().find(|p| p.id == id)
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("confluence.db")),
        }
    }

    pub fn logo_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.logos.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("logos")),
        }
    }

    /// Get the default config file path: `~/.config/confluence/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# Confluence configuration
#
# database = "/path/to/confluence.db"   # default: <data dir>/confluence/confluence.db
log_level = "info"

# Optional JSON registry: an array of
#   {"id": "...", "name": "...", "rssUrl": "...", "publicationName": "..."}
# publishers_file = "publishers.json"

[refresh]
# "1h", "30m", "90s", "1d" or plain seconds
interval = "30m"
on_start = true
# Publishers processed concurrently
workers = 4
# Remember the newest post date per publisher across restarts
persist_state = true
# Posts included in a new-content notification
notify_preview = 5
# Per-request HTTP timeout
timeout_secs = 30

[logos]
# dir = "/path/to/logos"               # default: <data dir>/confluence/logos
default_logo = "/placeholder-image.jpg"

# Add one table per publisher:
#
# [[publishers]]
# id = "alice"
# name = "Alice"
# feed_url = "https://alice.example.com/feed"
# publication_name = "Alice's Letters"
"##
    }
}

fn data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

fn load_registry(path: &Path) -> Result<Vec<Publisher>, ConfigError> {
    let content = fs::read(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_slice(&content).map_err(|e| ConfigError::Registry {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse publisher registry at {path}: {source}")]
    Registry {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No publishers configured in {path}")]
    NoPublishers { path: PathBuf },

    #[error("Duplicate publisher id: {0}")]
    DuplicatePublisher(String),

    #[error("Invalid refresh interval: {0}. Use format like '1h', '30m', '1d'")]
    InvalidInterval(String),
}
