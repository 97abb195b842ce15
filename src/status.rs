// System status display — shows DB stats, label coverage, pipeline progress.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::corpus::traits::CorpusStore;

/// Display system status to the terminal.
pub async fn show(store: &Arc<dyn CorpusStore>, db_display_path: &str) -> Result<()> {
    if !Path::new(db_display_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `sift init` to set up the database.");
        return Ok(());
    }

    // Database file size
    let file_size = std::fs::metadata(db_display_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_display_path, file_size);

    // Review corpus
    let review_count = store.count_reviews().await?;
    if review_count == 0 {
        println!("Reviews: none imported");
        println!("  Run `sift import <file>` to load reviews");
        return Ok(());
    }
    println!("Reviews: {}", review_count);

    let breakdown = store.sentiment_counts().await?;
    if !breakdown.is_empty() {
        let parts: Vec<String> = breakdown
            .iter()
            .map(|(sentiment, count)| format!("{} {}", count, sentiment))
            .collect();
        println!("  Sentiment: {}", parts.join(", "));
    }

    // Topic coverage
    let with_topics = store.topics_assigned_count().await?;
    if with_topics == 0 {
        println!("Topics: not yet assigned");
        println!("  Run `sift topics` to discover them");
    } else {
        println!(
            "Topics: assigned to {} of {} reviews",
            with_topics, review_count
        );
    }

    // Representative sample
    let sample_count = store.count_sample().await?;
    if sample_count == 0 {
        println!("Sample: not yet selected");
        println!("  Run `sift sample` to build it");
    } else {
        println!("Sample: {} representative reviews", sample_count);
    }

    // Pipeline timestamps
    match store.get_state("last_import_at").await? {
        Some(at) => println!("Last import: {}", at),
        None => println!("Last import: never"),
    }
    if let Some(at) = store.get_state("topics_completed_at").await? {
        println!("Topics completed: {}", at);
    }
    if let Some(at) = store.get_state("sample_completed_at").await? {
        println!("Sample completed: {}", at);
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
