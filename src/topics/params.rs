// Adaptive parameter selection for reduction, clustering, and vectorization.
//
// Fixed clustering parameters behave badly across categories of very
// different size and texture: a 60-review category needs forgiving settings
// while a 2000-review category needs stricter ones or everything merges into
// a single blob. The rules here map corpus characteristics to parameter
// bundles using piecewise bands tuned on real review corpora. They are
// deliberately simple arithmetic — no search, no iteration — so the same
// corpus always yields the same parameters.

use super::characterize::CorpusCharacteristics;
use super::keywords::stopword_union;

/// Distance metric requested from a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Cosine,
    Euclidean,
}

/// How the clustering backend should pick clusters out of its hierarchy.
/// Excess-of-mass favors larger, stabler clusters over fine-grained leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    ExcessOfMass,
    Leaf,
}

/// Parameters for the dimensionality reduction step.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionParams {
    /// Neighborhood size for manifold-style reducers.
    pub n_neighbors: usize,
    /// Output dimensionality.
    pub target_dims: usize,
    /// Minimum spacing between reduced points. Dense corpora get 0 so
    /// recurring themes can pack tightly.
    pub min_distance: f64,
    pub metric: DistanceMetric,
    /// Fixed seed — reruns over the same corpus must reduce identically.
    pub random_seed: u64,
}

/// Parameters for the clustering step.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringParams {
    pub min_cluster_size: usize,
    /// Distance slack under which nearby clusters merge.
    pub selection_epsilon: f64,
    pub selection: SelectionStrategy,
    /// Whether the backend should record soft membership strengths.
    pub soft_membership: bool,
}

/// Parameters for keyword vectorization over a cluster's documents.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizerParams {
    /// Longest n-gram considered a keyword candidate (lower bound is 1).
    pub ngram_max: usize,
    /// Minimum number of documents a term must appear in.
    pub min_doc_freq: usize,
    /// Terms in more than this fraction of documents are dropped as filler.
    pub max_doc_freq: f64,
    /// Cap on vocabulary size.
    pub max_vocab: usize,
    /// Multilingual stopword union — review corpora routinely mix languages.
    pub stopwords: Vec<String>,
}

/// The full parameter bundle for modeling one category.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParameters {
    pub reduction: ReductionParams,
    pub clustering: ClusteringParams,
    pub vectorizer: VectorizerParams,
}

/// Derive the parameter bundle for a corpus from its characteristics alone.
pub fn optimize(c: &CorpusCharacteristics) -> ClusterParameters {
    ClusterParameters {
        reduction: ReductionParams {
            n_neighbors: neighbor_count(c.count, c.homogeneity),
            target_dims: target_dims(c.count, c.lexical_diversity),
            min_distance: (0.01 - c.semantic_density * 0.01).max(0.0),
            metric: DistanceMetric::Cosine,
            random_seed: 42,
        },
        clustering: ClusteringParams {
            min_cluster_size: min_cluster_size(c.count, c.homogeneity),
            selection_epsilon: selection_epsilon(c.lexical_diversity),
            selection: SelectionStrategy::ExcessOfMass,
            soft_membership: true,
        },
        vectorizer: VectorizerParams {
            ngram_max: ngram_max(c.mean_word_count),
            min_doc_freq: 1,
            max_doc_freq: max_doc_freq(c.lexical_diversity),
            max_vocab: max_vocab(c.count),
            stopwords: stopword_union(),
        },
    }
}

/// Small corpora get a bounded neighborhood; larger ones scale it with
/// homogeneity, since uniform corpora tolerate wider neighborhoods.
fn neighbor_count(count: usize, homogeneity: f64) -> usize {
    if count < 50 {
        (count / 3).clamp(8, 15)
    } else if count < 200 {
        15 + (homogeneity * 8.0).round() as usize
    } else {
        10 + (homogeneity * 10.0).round() as usize
    }
}

fn target_dims(count: usize, diversity: f64) -> usize {
    if diversity > 0.7 {
        (count / 6).clamp(15, 40)
    } else if diversity > 0.4 {
        30
    } else {
        15
    }
}

/// Percentage bands with absolute floors, nudged by homogeneity: uniform
/// corpora can afford bigger clusters, scattered ones need smaller.
/// Never below 5 regardless.
fn min_cluster_size(count: usize, homogeneity: f64) -> usize {
    let base = if count < 50 {
        (count as f64 * 0.08) as usize
    } else if count < 200 {
        (count as f64 * 0.06) as usize
    } else if count < 500 {
        (count as f64 * 0.03) as usize
    } else {
        (count as f64 * 0.025) as usize
    };
    let floor = if count < 50 {
        3
    } else if count < 200 {
        5
    } else if count < 500 {
        8
    } else {
        10
    };
    let mut size = base.max(floor);

    if homogeneity > 0.8 {
        size = (size as f64 * 1.2) as usize;
    } else if homogeneity < 0.5 {
        size = (size as f64 * 0.85) as usize;
    }

    size.max(5)
}

fn selection_epsilon(diversity: f64) -> f64 {
    if diversity > 0.6 {
        0.05
    } else if diversity > 0.4 {
        0.03
    } else {
        0.0
    }
}

fn ngram_max(mean_word_count: f64) -> usize {
    if mean_word_count > 15.0 {
        3
    } else if mean_word_count > 8.0 {
        2
    } else {
        1
    }
}

fn max_doc_freq(diversity: f64) -> f64 {
    if diversity > 0.7 {
        0.95
    } else if diversity > 0.4 {
        0.98
    } else {
        0.99
    }
}

fn max_vocab(count: usize) -> usize {
    if count < 100 {
        250
    } else if count < 500 {
        350
    } else {
        500.min(count)
    }
}
