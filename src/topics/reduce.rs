// Dimensionality reduction over embedding matrices.
//
// PCA via linfa-reduction. Of the reduction params, PCA consumes the target
// dimensionality; the neighborhood and spacing knobs exist for manifold-style
// reducers behind the same trait, and the metric/seed fields cost nothing to
// honor since PCA is deterministic. Components are capped by the centered
// matrix rank, so tiny inputs reduce as far as they can rather than erroring.

use anyhow::{anyhow, Result};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_reduction::Pca;
use ndarray::Array2;

use super::params::ReductionParams;
use super::traits::Reducer;

/// PCA projection — the production Reducer.
pub struct PcaReducer;

impl Reducer for PcaReducer {
    fn reduce(&self, vectors: &[Vec<f64>], params: &ReductionParams) -> Result<Vec<Vec<f64>>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        let n = vectors.len();
        let dim = vectors[0].len();
        if vectors.iter().any(|v| v.len() != dim) {
            anyhow::bail!("Embedding rows have inconsistent dimensions");
        }

        // Rank of the centered matrix bounds how many components exist.
        let target = params.target_dims.min(dim).min(n.saturating_sub(1)).max(1);
        if target >= dim {
            return Ok(vectors.to_vec());
        }

        let mut data = Array2::zeros((n, dim));
        for (i, vector) in vectors.iter().enumerate() {
            for (j, &value) in vector.iter().enumerate() {
                data[[i, j]] = value;
            }
        }

        let dataset = DatasetBase::from(data.clone());
        let pca = Pca::params(target)
            .fit(&dataset)
            .map_err(|e| anyhow!("PCA fit failed: {e}"))?;
        let reduced = pca.predict(&data);

        Ok(reduced.outer_iter().map(|row| row.to_vec()).collect())
    }
}
