//! Background daemon for periodic and on-demand refreshes.
//!
//! A single loop owns every refresh it starts: interval ticks, requests from
//! [`RefreshTrigger`] handles and `SIGUSR1` are served one after another, so
//! overlapping triggers queue instead of failing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::{interval, MissedTickBehavior};

use crate::app::{AppContext, ConfluenceError, Result};
use crate::refresh::RefreshSummary;

/// Pending on-demand requests before callers start waiting to enqueue.
const TRIGGER_QUEUE: usize = 16;

/// Longest accepted refresh interval: one year.
const MAX_INTERVAL_SECS: u64 = 365 * 86400;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Refresh interval in seconds (default: 1800 = 30 minutes)
    pub update_interval_secs: u64,
    /// Whether to refresh immediately on start
    pub update_on_start: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 1800,
            update_on_start: true,
        }
    }
}

impl DaemonConfig {
    /// Parse interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let secs = Self::parse_secs(s)?;
        if secs > MAX_INTERVAL_SECS {
            return Err(format!("Interval too long: {} (max 365d)", s.trim()));
        }
        Ok(secs)
    }

    fn parse_secs(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();

        let scaled = |value: &str, unit: &str, factor: u64| {
            value
                .parse::<u64>()
                .ok()
                .and_then(|v| v.checked_mul(factor))
                .ok_or_else(|| format!("Invalid {}: {}", unit, value))
        };

        if let Some(hours) = s.strip_suffix('h') {
            scaled(hours, "hours", 3600)
        } else if let Some(minutes) = s.strip_suffix('m') {
            scaled(minutes, "minutes", 60)
        } else if let Some(days) = s.strip_suffix('d') {
            scaled(days, "days", 86400)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map_err(|_| format!("Invalid seconds: {}", secs))
        } else {
            s.parse::<u64>()
                .map_err(|_| format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", s))
        }
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs % 86400 == 0 {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

type Reply = oneshot::Sender<Result<RefreshSummary>>;

/// Cloneable handle for requesting refreshes from a running daemon.
#[derive(Clone)]
pub struct RefreshTrigger {
    requests: mpsc::Sender<Reply>,
    shutdown: Arc<Notify>,
}

impl RefreshTrigger {
    /// Queue a refresh and wait for its summary.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(reply)
            .await
            .map_err(|_| ConfluenceError::Other("Daemon is not running".to_string()))?;

        response
            .await
            .map_err(|_| ConfluenceError::Other("Daemon stopped before refreshing".to_string()))?
    }

    /// Ask the daemon loop to exit after the current refresh.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Daemon runner
pub struct Daemon {
    ctx: Arc<AppContext>,
    config: DaemonConfig,
    requests: mpsc::Receiver<Reply>,
    trigger: RefreshTrigger,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>, config: DaemonConfig) -> Self {
        let (tx, rx) = mpsc::channel(TRIGGER_QUEUE);
        Self {
            ctx,
            config,
            requests: rx,
            trigger: RefreshTrigger {
                requests: tx,
                shutdown: Arc::new(Notify::new()),
            },
        }
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    /// Run until SIGINT, SIGTERM or [`RefreshTrigger::shutdown`].
    pub async fn run(mut self) -> Result<()> {
        let mut user_trigger = SignalStream::user_trigger()?;
        let mut terminate = SignalStream::terminate()?;
        let shutdown = self.trigger.shutdown.clone();

        tracing::info!(
            "Confluence daemon started (refresh interval: {}, {} publishers, PID: {})",
            DaemonConfig::format_interval(self.config.update_interval_secs),
            self.ctx.config.publishers.len(),
            std::process::id()
        );

        let mut timer = interval(Duration::from_secs(self.config.update_interval_secs.max(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // Skip the first immediate tick

        if self.config.update_on_start {
            tracing::info!("Running initial refresh...");
            self.run_update().await;
        }

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    tracing::info!("Running scheduled refresh...");
                    self.run_update().await;
                }
                Some(reply) = self.requests.recv() => {
                    tracing::info!("Running requested refresh...");
                    let result = self.run_update().await;
                    if reply.send(result).is_err() {
                        tracing::debug!("Refresh requester went away");
                    }
                }
                _ = user_trigger.recv() => {
                    tracing::info!("Running refresh on signal...");
                    self.run_update().await;
                }
                _ = terminate.recv() => break,
                _ = tokio::signal::ctrl_c() => break,
                _ = shutdown.notified() => break,
            }
        }

        tracing::info!("Daemon shutting down...");
        Ok(())
    }

    /// Run a single refresh cycle
    async fn run_update(&self) -> Result<RefreshSummary> {
        let start = Instant::now();

        let result = self.ctx.refresh().await;
        match &result {
            Ok(summary) => tracing::info!(
                "Refresh complete: {} publishers updated, {} new posts ({:.1}s)",
                summary.updated_count,
                summary.new_posts.len(),
                start.elapsed().as_secs_f64()
            ),
            Err(e) => tracing::warn!("Refresh not run: {}", e),
        }

        result
    }
}

/// Unix signal source that never fires on other platforms.
struct SignalStream {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl SignalStream {
    #[cfg(unix)]
    fn user_trigger() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            signal: Some(signal(SignalKind::user_defined1())?),
        })
    }

    #[cfg(unix)]
    fn terminate() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            signal: Some(signal(SignalKind::terminate())?),
        })
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        match self.signal.as_mut() {
            Some(signal) => {
                if signal.recv().await.is_none() {
                    self.signal = None;
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }

    #[cfg(not(unix))]
    fn user_trigger() -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(not(unix))]
    fn terminate() -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}
