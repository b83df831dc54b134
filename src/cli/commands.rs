use std::sync::Arc;

use crate::app::{AppContext, ConfluenceError, Result};
use crate::config::ConfigError;
use crate::daemon::{Daemon, DaemonConfig};
use crate::domain::Post;
use crate::refresh::RefreshSummary;
use crate::store::{PostQuery, Store};

pub async fn refresh(ctx: &AppContext, json: bool) -> Result<()> {
    println!("Refreshing {} publishers...", ctx.config.publishers.len());

    let summary = ctx.refresh().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &RefreshSummary) {
    for new_post in &summary.new_posts {
        println!(
            "  new: {} - {}",
            new_post.publisher_name,
            new_post.post.display_title()
        );
    }
    for id in &summary.skipped {
        println!("  skipped: {}", id);
    }
    for id in &summary.failed {
        eprintln!("  failed: {}", id);
    }

    println!(
        "Refresh complete: {} publishers updated, {} new posts, {} posts stored",
        summary.updated_count,
        summary.new_posts.len(),
        summary.persisted_count
    );
}

pub async fn run_daemon(
    ctx: Arc<AppContext>,
    interval: Option<&str>,
    no_initial_refresh: bool,
) -> Result<()> {
    let update_interval_secs = match interval {
        Some(interval) => DaemonConfig::parse_interval(interval)
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::InvalidInterval(interval.to_string()))?,
        None => ctx.config.refresh.interval_secs()?,
    };

    let config = DaemonConfig {
        update_interval_secs,
        update_on_start: ctx.config.refresh.on_start && !no_initial_refresh,
    };

    Daemon::new(ctx, config).run().await
}

pub fn list_posts(ctx: &AppContext, query: &PostQuery, json: bool) -> Result<()> {
    if let Some(id) = &query.publisher_id {
        if ctx.config.publisher(id).is_none() {
            return Err(ConfluenceError::PublisherNotFound(id.clone()));
        }
    }

    let page = ctx.store.query_posts(query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    for post in &page.posts {
        print_post(post);
    }

    println!(
        "Page {} ({} of {} posts){}",
        page.page,
        page.posts.len(),
        page.total,
        if page.has_more { ", more available" } else { "" }
    );

    Ok(())
}

fn print_post(post: &Post) {
    let date = if post.has_publish_date() {
        post.publish_date.format("%Y-%m-%d").to_string()
    } else {
        "          ".to_string()
    };

    println!("{} {} ({})", date, post.display_title(), post.author);
    if !post.subtitle.is_empty() {
        println!("           {}", post.subtitle);
    }
    println!("           {}", post.link);
}

pub fn list_publishers(ctx: &AppContext) -> Result<()> {
    let counts = ctx.store.count_posts_by_publisher()?;

    for publisher in &ctx.config.publishers {
        println!(
            "{} [{}] ({} posts)\n  feed: {}\n  logo: {}",
            publisher.name,
            publisher.id,
            counts.get(&publisher.id).copied().unwrap_or(0),
            publisher.feed_url().unwrap_or("(none)"),
            ctx.logo_for(publisher)
        );
    }

    Ok(())
}

pub fn show_logo(ctx: &AppContext, id: &str) -> Result<()> {
    let publisher = ctx
        .config
        .publisher(id)
        .ok_or_else(|| ConfluenceError::PublisherNotFound(id.to_string()))?;

    println!("{}", ctx.logo_for(publisher));
    Ok(())
}

pub fn show_stats(ctx: &AppContext) -> Result<()> {
    let counts = ctx.store.count_posts_by_publisher()?;
    let latest_seen = ctx.orchestrator.detector().snapshot();

    println!("Publishers: {}", ctx.config.publishers.len());
    println!("Stored posts: {}", ctx.store.count_posts()?);

    for publisher in &ctx.config.publishers {
        let count = counts.get(&publisher.id).copied().unwrap_or(0);
        let latest = latest_seen
            .get(&publisher.id)
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!("  {:<24} {:>5} posts, latest {}", publisher.name, count, latest);
    }

    Ok(())
}
