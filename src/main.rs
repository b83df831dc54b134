use std::sync::Arc;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use confluence::app::AppContext;
use confluence::cli::{commands, Cli, Commands};
use confluence::config::Config;
use confluence::store::PostQuery;

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` wins over the configured level when set.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(parse_level(level).into()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(cli.config.as_deref());
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|config| config.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    let mut config = loaded?;
    if let Some(workers) = cli.workers {
        config.refresh.workers = workers.max(1);
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Refresh { json } => {
            commands::refresh(&ctx, json).await?;
        }
        Commands::Run {
            interval,
            no_initial_refresh,
        } => {
            commands::run_daemon(Arc::new(ctx), interval.as_deref(), no_initial_refresh).await?;
        }
        Commands::Posts {
            publisher,
            search,
            page,
            limit,
            json,
        } => {
            let query = PostQuery {
                search,
                publisher_id: publisher,
                page: page.max(1),
                limit: limit.max(1),
            };
            commands::list_posts(&ctx, &query, json)?;
        }
        Commands::Publishers => {
            commands::list_publishers(&ctx)?;
        }
        Commands::Logo { id } => {
            commands::show_logo(&ctx, &id)?;
        }
        Commands::Stats => {
            commands::show_stats(&ctx)?;
        }
    }

    Ok(())
}
