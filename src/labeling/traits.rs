// Labeling abstractions — a labeler turns keyword summaries of discovered
// clusters into short human-readable topic labels.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

/// Fallback topic for reviews that land in no cluster and for clusters
/// whose labeling call failed.
pub const DIVERSE_OPINIONS: &str = "Diverse opinions";

/// Keyword summary of one discovered cluster, as sent to the labeler.
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    /// Cluster id from the clustering pass (never the outlier id).
    pub cluster_id: i32,
    /// Top keywords characterizing the cluster, most significant first.
    pub keywords: Vec<String>,
    /// Number of reviews in the cluster.
    pub size: usize,
}

/// A labeling request covering every surviving cluster in one category.
#[derive(Debug, Clone)]
pub struct LabelRequest {
    /// Category the clusters were discovered in, for prompt context.
    pub category: String,
    pub clusters: Vec<ClusterSummary>,
}

/// Trait for topic labelers. Implementations may call external services;
/// the pipeline applies its own timeout and falls back to
/// [`DIVERSE_OPINIONS`] when a call fails or a cluster id is missing
/// from the response.
#[async_trait]
pub trait TopicLabeler: Send + Sync {
    /// Produce a short label for each cluster in the request, keyed by
    /// cluster id. Ids absent from the map are treated as unlabeled.
    async fn label(&self, request: &LabelRequest) -> Result<BTreeMap<i32, String>>;

    /// Free-form completion against the same backend, for callers that
    /// need prose rather than cluster labels.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
