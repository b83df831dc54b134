pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "confluence")]
#[command(about = "Aggregates publisher feeds and reports new posts", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/confluence/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of publishers refreshed concurrently (overrides config)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Log level: trace, debug, info, warn, error (overrides config)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh every publisher once and print the summary
    Refresh {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the refresh daemon in the foreground
    Run {
        /// Refresh interval (e.g., "1h", "30m", "1d"); overrides config
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the refresh on start
        #[arg(long)]
        no_initial_refresh: bool,
    },
    /// List stored posts, newest first
    Posts {
        /// Only posts from this publisher
        #[arg(short, long)]
        publisher: Option<String>,

        /// Case-insensitive match on title, subtitle or author
        #[arg(short, long)]
        search: Option<String>,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Posts per page
        #[arg(long, default_value_t = crate::store::DEFAULT_PAGE_LIMIT)]
        limit: usize,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
    /// List registered publishers
    Publishers,
    /// Print a publisher's logo URL
    Logo {
        /// Publisher id
        id: String,
    },
    /// Show publisher and post counts
    Stats,
}
