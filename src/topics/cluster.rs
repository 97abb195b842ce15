// Density clustering over reduced embeddings.
//
// DBSCAN via linfa-clustering. The neighborhood radius isn't a parameter the
// optimizer hands us directly — it derives from the data with the classic
// k-distance heuristic (mean distance to each point's k-th nearest neighbor,
// k = min cluster size), widened by the selection epsilon so corpora with
// diverse vocabulary merge near-neighbor clusters instead of splintering.
// The hierarchy-selection and soft-membership fields in the params are
// advisory for backends that support them; DBSCAN has no hierarchy to select
// from.

use anyhow::{anyhow, Result};
use linfa::traits::Transformer;
use linfa::DatasetBase;
use linfa_clustering::Dbscan;
use ndarray::Array2;

use super::params::ClusteringParams;
use super::traits::{Clusterer, OUTLIER_CLUSTER};

/// DBSCAN with a k-distance derived radius — the production Clusterer.
pub struct DensityClusterer;

impl Clusterer for DensityClusterer {
    fn cluster(&self, vectors: &[Vec<f64>], params: &ClusteringParams) -> Result<Vec<i32>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        let n = vectors.len();
        let dim = vectors[0].len();
        if vectors.iter().any(|v| v.len() != dim) {
            anyhow::bail!("Embedding rows have inconsistent dimensions");
        }
        // Fewer points than one cluster needs: everything is an outlier.
        if n <= params.min_cluster_size {
            return Ok(vec![OUTLIER_CLUSTER; n]);
        }

        let min_points = params.min_cluster_size.max(2);
        let radius = kth_distance_mean(vectors, min_points) + params.selection_epsilon;
        // The backend requires a strictly positive tolerance; duplicates at
        // distance zero still fall inside it.
        let tolerance = radius.max(1e-10);

        let mut data = Array2::zeros((n, dim));
        for (i, vector) in vectors.iter().enumerate() {
            for (j, &value) in vector.iter().enumerate() {
                data[[i, j]] = value;
            }
        }

        let dataset = DatasetBase::from(data.clone());
        let assigned = Dbscan::params(min_points)
            .tolerance(tolerance)
            .transform(dataset)
            .map_err(|e| anyhow!("DBSCAN failed: {e:?}"))?;

        let labels = assigned
            .targets()
            .iter()
            .map(|label| match label {
                Some(cluster_id) => *cluster_id as i32,
                None => OUTLIER_CLUSTER,
            })
            .collect();
        Ok(labels)
    }
}

/// Mean distance to each point's k-th nearest neighbor (excluding itself).
fn kth_distance_mean(vectors: &[Vec<f64>], k: usize) -> f64 {
    let n = vectors.len();
    let mut total = 0.0;
    for i in 0..n {
        let mut dists: Vec<f64> = (0..n)
            .filter(|&j| j != i)
            .map(|j| euclidean(&vectors[i], &vectors[j]))
            .collect();
        dists.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        total += dists[(k - 1).min(dists.len() - 1)];
    }
    total / n as f64
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
