// Colored terminal output for topic discovery and sampling results.
//
// This module handles all terminal-specific formatting: colors, alignment,
// summaries. The main.rs display functions delegate here.

use std::collections::BTreeMap;

use colored::Colorize;

use crate::corpus::models::{RepresentativeReview, Sentiment};
use crate::pipeline::aggregate::AggregateSummary;
use crate::pipeline::sample::SampleSummary;

/// Display the per-category topic discovery results.
pub fn display_topic_summary(summary: &AggregateSummary) {
    if summary.outcomes.is_empty() {
        println!("No categories found. Run `sift import` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Topic Discovery ({} categories) ===", summary.outcomes.len()).bold()
    );
    println!();

    for outcome in &summary.outcomes {
        if outcome.skipped {
            println!(
                "  {:<24} {}",
                outcome.category,
                "skipped (below volume threshold)".dimmed()
            );
            continue;
        }

        let failure_note = if outcome.external_failure {
            format!("  {}", "labeling failed".red())
        } else {
            String::new()
        };
        println!(
            "  {:<24} {} clusters, {} outliers{}",
            outcome.category,
            outcome.cluster_count,
            outcome.outlier_count,
            failure_note
        );

        // Topic histogram: how many reviews landed on each topic
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for topic in outcome.assignments.values() {
            *counts.entry(topic.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        for (topic, count) in ranked {
            println!("    {:>5}  {}", count, topic);
        }
    }

    println!();
    println!(
        "  {} categories modeled, {} skipped, {} clusters total",
        summary.categories_processed(),
        summary.categories_skipped(),
        summary.clusters_found()
    );
}

/// Display the representative sample, grouped by category.
pub fn display_sample(summary: &SampleSummary) {
    if summary.selections.is_empty() {
        println!("No representative reviews selected. Run `sift topics` first and check sentiment labels.");
        return;
    }

    println!(
        "\n{}",
        format!(
            "=== Representative Sample ({} of {} reviews — {:.0}% reduction) ===",
            summary.selections.len(),
            summary.total_reviews,
            summary.reduction_pct()
        )
        .bold()
    );
    if summary.used_corpus_fallback {
        println!(
            "  {}",
            "Too few mixed-subjectivity reviews; sampled the full corpus".yellow()
        );
    }
    println!();

    let mut by_category: BTreeMap<&str, Vec<&RepresentativeReview>> = BTreeMap::new();
    for row in &summary.selections {
        by_category
            .entry(row.category.as_str())
            .or_default()
            .push(row);
    }

    for (category, mut rows) in by_category {
        println!("  {}", category.bold());
        rows.sort_by(|a, b| {
            a.topic
                .cmp(&b.topic)
                .then(a.sentiment.as_str().cmp(b.sentiment.as_str()))
        });
        for row in rows {
            let marker = sentiment_marker(row.sentiment);
            let preview = super::truncate_chars(&row.text, 110);
            println!("    {} {:<28} \"{}\"", marker, row.topic, preview.dimmed());
        }
        println!();
    }
}

/// One-character colored marker for a sentiment.
fn sentiment_marker(sentiment: Sentiment) -> colored::ColoredString {
    match sentiment {
        Sentiment::Positive => "+".green().bold(),
        Sentiment::Negative => "-".red().bold(),
        Sentiment::Neutral => "~".yellow(),
    }
}
