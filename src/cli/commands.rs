use std::path::Path;

use chrono::{TimeZone, Utc};

use crate::app::{AppContext, EddyError, Result};
use crate::store::Store;
use crate::threads::{build_forest, ThreadNode};

/// Ingest a batch of seed URLs, best effort: unparsable seeds and failed
/// feeds are reported individually and never abort the rest of the batch.
pub async fn fetch_feeds(ctx: &AppContext, urls: &[String], file: Option<&Path>) -> Result<()> {
    let mut seeds: Vec<String> = urls.to_vec();
    if let Some(path) = file {
        let content = std::fs::read_to_string(path)?;
        seeds.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        );
    }

    if seeds.is_empty() {
        println!("No feeds to fetch");
        return Ok(());
    }

    let mut errors = 0;
    let mut valid = Vec::new();
    for seed in seeds {
        match url::Url::parse(&seed) {
            Ok(_) => valid.push(seed),
            Err(e) => {
                errors += 1;
                eprintln!("  Skipping {}: {}", seed, EddyError::from(e));
            }
        }
    }

    let results = ctx.ingestor.ingest(valid, ctx.store.clone()).await;

    let mut total = 0;
    for (url, result) in results {
        match result {
            Ok(count) => {
                total += count;
                println!("  {} posts from {}", count, url);
            }
            Err(e) => {
                errors += 1;
                eprintln!("  Error fetching {}: {}", url, e);
            }
        }
    }

    println!("Fetch complete: {} posts, {} errors", total, errors);
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let posts = ctx.store.post_count(&feed.url)?;
        println!("{} ({} posts)\n  {}", feed.display_title(), posts, feed.url);
    }

    Ok(())
}

pub fn show_threads(ctx: &AppContext) -> Result<()> {
    let rows = ctx.store.get_posts_with_feeds()?;

    if rows.is_empty() {
        println!("No posts");
        return Ok(());
    }

    let forest = build_forest(rows);
    for root in &forest {
        print_node(root, 0);
    }

    Ok(())
}

fn print_node(node: &ThreadNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let author = node.author.as_deref().unwrap_or("(unknown)");
    let date = Utc
        .timestamp_opt(node.date, 0)
        .single()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| node.date.to_string());

    println!("{}{} * {} ({})", indent, node.title, author, date);
    println!("{}  {}", indent, node.text);

    for reply in &node.replies {
        print_node(reply, depth + 1);
    }
}
