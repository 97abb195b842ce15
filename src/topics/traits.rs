// Backend traits for the topic modeling stages.
//
// The modeler composes four swap-ready stages: embed texts, reduce the
// vectors, cluster the reduced space, and rank keywords per cluster. Each
// stage is a trait so tests can drive the modeler with cheap deterministic
// implementations while production wires in the ONNX embedder and the linfa
// backends.

use anyhow::Result;
use async_trait::async_trait;

use super::params::{ClusteringParams, ReductionParams, VectorizerParams};

/// Cluster id reserved for points no cluster claimed.
pub const OUTLIER_CLUSTER: i32 = -1;

/// Maps texts to fixed-width embedding vectors. Async because the production
/// implementation pushes inference onto a blocking thread.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning vectors in the same order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;

    /// Embed a single text. Default goes through the batch path so
    /// implementations only have one method to get right.
    async fn embed_one(&self, text: &str) -> Result<Vec<f64>> {
        let batch = [text.to_string()];
        let mut vectors = self.embed_batch(&batch).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedder returned no vector for text"))
    }
}

/// Projects embedding vectors down to the dimensionality the parameters ask
/// for. Must return one output row per input row, in order.
pub trait Reducer: Send + Sync {
    fn reduce(&self, vectors: &[Vec<f64>], params: &ReductionParams) -> Result<Vec<Vec<f64>>>;
}

/// Assigns a cluster id to every input vector. Points that belong to no
/// cluster get OUTLIER_CLUSTER.
pub trait Clusterer: Send + Sync {
    fn cluster(&self, vectors: &[Vec<f64>], params: &ClusteringParams) -> Result<Vec<i32>>;
}

/// Ranks the keywords that characterize a set of documents, best first.
pub trait KeywordRanker: Send + Sync {
    fn top_keywords(&self, docs: &[String], params: &VectorizerParams, limit: usize)
        -> Vec<String>;
}
