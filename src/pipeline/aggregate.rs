// Cross-category topic discovery: model every category, merge the results.
//
// Categories are independent corpora — a review tagged with three categories
// is modeled three times and ends up carrying one topic per category. Work
// runs concurrently up to a cap; the embedding session serializes inference
// internally, so concurrency mostly overlaps labeling I/O with local compute.
//
// Persistence is left to the caller: this module computes merged per-review
// topic maps and hands them back.

use std::collections::{BTreeMap, HashMap, HashSet};

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::corpus::models::ReviewItem;
use crate::labeling::traits::TopicLabeler;
use crate::topics::traits::{Clusterer, Embedder, KeywordRanker, Reducer};

use super::modeler::{self, CategoryModelOutcome, ModelerConfig};

/// Result of a full topic discovery run.
pub struct AggregateSummary {
    /// Per-category outcomes, in first-encounter category order.
    pub outcomes: Vec<CategoryModelOutcome>,
    /// review id → (category → topic), merged across categories and ready
    /// for persistence.
    pub topic_maps: Vec<(i64, BTreeMap<String, String>)>,
}

impl AggregateSummary {
    pub fn categories_processed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.skipped).count()
    }

    pub fn categories_skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped).count()
    }

    pub fn clusters_found(&self) -> usize {
        self.outcomes.iter().map(|o| o.cluster_count).sum()
    }

    pub fn external_failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.external_failure).count()
    }
}

/// Distinct categories across all reviews, in first-encounter order.
pub fn distinct_categories(reviews: &[ReviewItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for review in reviews {
        for category in &review.categories {
            if seen.insert(category.clone()) {
                ordered.push(category.clone());
            }
        }
    }
    ordered
}

/// Run topic discovery across every category found in the reviews.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    reviews: &[ReviewItem],
    embedder: &dyn Embedder,
    reducer: &dyn Reducer,
    clusterer: &dyn Clusterer,
    ranker: &dyn KeywordRanker,
    labeler: &dyn TopicLabeler,
    config: &ModelerConfig,
    concurrency: usize,
) -> AggregateSummary {
    let categories = distinct_categories(reviews);

    // Phase 1: Build each category's corpus up front — a review appears
    // once per category it is tagged with
    let corpora: Vec<(String, Vec<(i64, String)>)> = categories
        .iter()
        .map(|category| {
            let members: Vec<(i64, String)> = reviews
                .iter()
                .filter(|r| r.categories.iter().any(|c| c == category))
                .map(|r| (r.id, r.text.clone()))
                .collect();
            (category.clone(), members)
        })
        .collect();

    println!(
        "Modeling {} categories across {} reviews ({} concurrent)...",
        categories.len(),
        reviews.len(),
        concurrency.max(1)
    );

    let pb = ProgressBar::new(corpora.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Topics [{bar:30}] {pos}/{len} ({eta})")
            .unwrap(),
    );

    // Phase 2: Model categories in parallel
    let pb_ref = &pb;
    let mut outcomes: Vec<CategoryModelOutcome> =
        stream::iter(corpora.iter().map(|(category, members)| async move {
            let outcome = modeler::model_category(
                category, members, embedder, reducer, clusterer, ranker, labeler, config,
            )
            .await;
            pb_ref.inc(1);
            outcome
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    pb.finish_and_clear();

    // buffer_unordered yields completion order; restore category order so
    // output is stable run to run
    let order: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    outcomes.sort_by_key(|o| order.get(o.category.as_str()).copied().unwrap_or(usize::MAX));

    for outcome in &outcomes {
        if outcome.skipped {
            continue;
        }
        info!(
            category = %outcome.category,
            clusters = outcome.cluster_count,
            outliers = outcome.outlier_count,
            "Category modeled"
        );
    }

    // Phase 3: Merge per-category assignments into one topic map per review
    let mut merged: BTreeMap<i64, BTreeMap<String, String>> = BTreeMap::new();
    for outcome in &outcomes {
        for (review_id, topic) in &outcome.assignments {
            merged
                .entry(*review_id)
                .or_default()
                .insert(outcome.category.clone(), topic.clone());
        }
    }

    let summary = AggregateSummary {
        topic_maps: merged.into_iter().collect(),
        outcomes,
    };

    // Every processed category failing on an external call points at the
    // endpoint, not the data
    let processed = summary.categories_processed();
    if processed > 0 && summary.external_failures() == processed {
        warn!(
            categories = processed,
            "Every category fell back to the fallback topic — check the embedding model and labeling endpoint"
        );
    }

    summary
}
