// Per-category topic modeling: profile -> embed -> reduce -> cluster -> label.
//
// Each category is an independent corpus. The corpus profile drives every
// downstream parameter, so a handful of terse Spanish breakfast reviews and
// five hundred rambling English room reviews each get clustering settings
// shaped to their own texture.
//
// Failures degrade instead of aborting: a category that can't be embedded
// or labeled falls back to the sentinel topic for every review, and the
// outcome records that an external call failed so the caller can spot a
// systemic outage across categories.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::labeling::traits::{ClusterSummary, LabelRequest, TopicLabeler, DIVERSE_OPINIONS};
use crate::topics::characterize;
use crate::topics::params;
use crate::topics::traits::{Clusterer, Embedder, KeywordRanker, Reducer, OUTLIER_CLUSTER};

/// Knobs for the per-category modeling pass.
#[derive(Debug, Clone)]
pub struct ModelerConfig {
    /// Categories with fewer reviews than this are skipped outright —
    /// clustering a thin corpus produces junk topics.
    pub min_volume: usize,
    /// Hard ceiling on one labeling call.
    pub label_timeout: Duration,
    /// How many keywords describe each cluster in the labeling prompt.
    pub keyword_limit: usize,
}

impl Default for ModelerConfig {
    fn default() -> Self {
        Self {
            min_volume: 50,
            label_timeout: Duration::from_secs(60),
            keyword_limit: 8,
        }
    }
}

/// What happened when one category was modeled.
#[derive(Debug, Clone)]
pub struct CategoryModelOutcome {
    pub category: String,
    /// review id → topic label for this category.
    pub assignments: BTreeMap<i64, String>,
    /// Clusters that survived (excludes outliers).
    pub cluster_count: usize,
    /// Reviews the clusterer left unassigned.
    pub outlier_count: usize,
    /// Category was below the volume threshold or had no usable text.
    pub skipped: bool,
    /// An embedding or labeling call failed and topics fell back to the
    /// sentinel.
    pub external_failure: bool,
}

impl CategoryModelOutcome {
    fn empty(category: &str) -> Self {
        Self {
            category: category.to_string(),
            assignments: BTreeMap::new(),
            cluster_count: 0,
            outlier_count: 0,
            skipped: false,
            external_failure: false,
        }
    }
}

/// Model one category's reviews into labeled topics.
///
/// `reviews` pairs each review id with its text. Every review gets a topic
/// in the returned assignments unless the whole category is skipped.
#[allow(clippy::too_many_arguments)]
pub async fn model_category(
    category: &str,
    reviews: &[(i64, String)],
    embedder: &dyn Embedder,
    reducer: &dyn Reducer,
    clusterer: &dyn Clusterer,
    ranker: &dyn KeywordRanker,
    labeler: &dyn TopicLabeler,
    config: &ModelerConfig,
) -> CategoryModelOutcome {
    let mut outcome = CategoryModelOutcome::empty(category);

    // Step 1: Volume gate
    if reviews.len() < config.min_volume {
        info!(
            category,
            count = reviews.len(),
            min_volume = config.min_volume,
            "Category below volume threshold, skipping"
        );
        outcome.skipped = true;
        return outcome;
    }

    let texts: Vec<String> = reviews.iter().map(|(_, text)| text.clone()).collect();

    // Step 2: Profile the corpus and derive clustering parameters from it
    let Some(characteristics) = characterize::characterize(&texts) else {
        info!(category, "No usable text in category, skipping");
        outcome.skipped = true;
        return outcome;
    };
    let parameters = params::optimize(&characteristics);

    debug!(
        category,
        count = characteristics.count,
        homogeneity = characteristics.homogeneity,
        diversity = characteristics.lexical_diversity,
        min_cluster_size = parameters.clustering.min_cluster_size,
        target_dims = parameters.reduction.target_dims,
        "Derived clustering parameters"
    );

    // Step 3: Embed — a failure here poisons the whole category
    let vectors = match embedder.embed_batch(&texts).await {
        Ok(v) => v,
        Err(e) => {
            warn!(category, error = %e, "Embedding failed, assigning fallback topic");
            outcome.external_failure = true;
            outcome.assignments = all_fallback(reviews);
            return outcome;
        }
    };

    // Step 4: Reduce — a reduction failure is survivable, cluster the raw
    // vectors instead
    let reduced = match reducer.reduce(&vectors, &parameters.reduction) {
        Ok(r) => r,
        Err(e) => {
            warn!(
                category,
                error = %e,
                "Dimensionality reduction failed, clustering raw vectors"
            );
            vectors.clone()
        }
    };

    // Step 5: Cluster
    let assignments = match clusterer.cluster(&reduced, &parameters.clustering) {
        Ok(a) => a,
        Err(e) => {
            warn!(category, error = %e, "Clustering failed, assigning fallback topic");
            outcome.assignments = all_fallback(reviews);
            return outcome;
        }
    };

    let cluster_ids: BTreeSet<i32> = assignments
        .iter()
        .copied()
        .filter(|&id| id != OUTLIER_CLUSTER)
        .collect();

    outcome.cluster_count = cluster_ids.len();
    outcome.outlier_count = assignments
        .iter()
        .filter(|&&id| id == OUTLIER_CLUSTER)
        .count();

    // Step 6: Everything ended up as noise — nothing worth labeling
    if cluster_ids.is_empty() {
        info!(category, "No clusters survived, assigning fallback topic");
        outcome.assignments = all_fallback(reviews);
        return outcome;
    }

    // Step 7: Summarize each cluster by its top keywords
    let mut summaries = Vec::with_capacity(cluster_ids.len());
    for &cluster_id in &cluster_ids {
        let members: Vec<String> = reviews
            .iter()
            .zip(&assignments)
            .filter(|(_, &id)| id == cluster_id)
            .map(|((_, text), _)| text.clone())
            .collect();
        let keywords = ranker.top_keywords(&members, &parameters.vectorizer, config.keyword_limit);
        summaries.push(ClusterSummary {
            cluster_id,
            keywords,
            size: members.len(),
        });
    }

    // Step 8: Label the clusters, with a hard timeout on the external call
    let request = LabelRequest {
        category: category.to_string(),
        clusters: summaries,
    };
    let labels = match tokio::time::timeout(config.label_timeout, labeler.label(&request)).await {
        Ok(Ok(labels)) => labels,
        Ok(Err(e)) => {
            warn!(
                category,
                error = %e,
                "Labeling failed, using fallback topic for all clusters"
            );
            outcome.external_failure = true;
            BTreeMap::new()
        }
        Err(_) => {
            warn!(
                category,
                timeout_secs = config.label_timeout.as_secs(),
                "Labeling timed out, using fallback topic for all clusters"
            );
            outcome.external_failure = true;
            BTreeMap::new()
        }
    };

    // Step 9: Resolve each review's topic — outliers and unlabeled clusters
    // both get the sentinel
    for ((review_id, _), &cluster_id) in reviews.iter().zip(&assignments) {
        let topic = if cluster_id == OUTLIER_CLUSTER {
            DIVERSE_OPINIONS.to_string()
        } else {
            labels
                .get(&cluster_id)
                .cloned()
                .unwrap_or_else(|| DIVERSE_OPINIONS.to_string())
        };
        outcome.assignments.insert(*review_id, topic);
    }

    outcome
}

fn all_fallback(reviews: &[(i64, String)]) -> BTreeMap<i64, String> {
    reviews
        .iter()
        .map(|(id, _)| (*id, DIVERSE_OPINIONS.to_string()))
        .collect()
}
