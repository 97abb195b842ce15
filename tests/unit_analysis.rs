// Unit tests for corpus profiling and adaptive parameter selection.
//
// These tests cross module boundaries on purpose: characterize -> optimize
// over realistic review corpora, derived vectorizer params driving keyword
// ranking, and reduce -> cluster recovering planted structure. Single-module
// edge cases live next to the modules themselves.

use sift::topics::characterize::characterize;
use sift::topics::cluster::DensityClusterer;
use sift::topics::keywords::{stopword_union, TfIdfKeywords};
use sift::topics::params::{
    optimize, ClusteringParams, ReductionParams, SelectionStrategy, VectorizerParams,
};
use sift::topics::reduce::PcaReducer;
use sift::topics::traits::{Clusterer, KeywordRanker, Reducer, OUTLIER_CLUSTER};

// ============================================================
// Chain: characterize -> optimize
// ============================================================

#[test]
fn uniform_terse_corpus_gets_tight_packing() {
    // 120 six-word reviews drawn from four templates: identical lengths,
    // tiny vocabulary, every significant word recurring.
    let templates = [
        "breakfast buffet was great every morning",
        "breakfast buffet was cold every morning",
        "breakfast buffet was great every day",
        "breakfast buffet was cold every day",
    ];
    let texts: Vec<String> = (0..120).map(|i| templates[i % 4].to_string()).collect();

    let profile = characterize(&texts).unwrap();
    assert_eq!(profile.count, 120);
    assert!((profile.mean_word_count - 6.0).abs() < 1e-9);
    assert!((profile.homogeneity - 1.0).abs() < 1e-9);
    assert!(profile.lexical_diversity < 0.4, "{}", profile.lexical_diversity);
    assert!((profile.semantic_density - 1.0).abs() < 1e-9);

    let params = optimize(&profile);
    // Mid-size band, fully homogeneous: 15 + round(8 * 1.0)
    assert_eq!(params.reduction.n_neighbors, 23);
    // Low diversity pins the projection at 15 dims
    assert_eq!(params.reduction.target_dims, 15);
    // Maximal density packs reduced points as tightly as allowed
    assert!((params.reduction.min_distance - 0.0).abs() < 1e-9);
    // trunc(120 * 0.06) = 7, homogeneity bonus trunc(7 * 1.2) = 8
    assert_eq!(params.clustering.min_cluster_size, 8);
    assert!((params.clustering.selection_epsilon - 0.0).abs() < 1e-9);
    // Six-word reviews don't support phrases
    assert_eq!(params.vectorizer.ngram_max, 1);
    assert_eq!(params.vectorizer.max_vocab, 350);
}

#[test]
fn scattered_verbose_corpus_gets_forgiving_parameters() {
    // 50 three-word texts plus 10 sixty-word texts, every token globally
    // unique: wildly uneven lengths and maximal diversity.
    let mut word = 0usize;
    let mut text_of = |count: usize| {
        let tokens: Vec<String> = (0..count)
            .map(|_| {
                word += 1;
                format!("palabra{word:04}")
            })
            .collect();
        tokens.join(" ")
    };
    let mut texts: Vec<String> = (0..50).map(|_| text_of(3)).collect();
    texts.extend((0..10).map(|_| text_of(60)));

    let profile = characterize(&texts).unwrap();
    assert_eq!(profile.count, 60);
    assert!((profile.mean_word_count - 12.5).abs() < 1e-9);
    // cv = sqrt(451.25) / 12.5 ~ 1.699, so homogeneity ~ 0.370
    assert!(profile.homogeneity < 0.5, "{}", profile.homogeneity);
    assert!((profile.lexical_diversity - 1.0).abs() < 1e-9);
    assert!((profile.semantic_density - 0.0).abs() < 1e-9);

    let params = optimize(&profile);
    // 15 + round(8 * 0.370) = 18
    assert_eq!(params.reduction.n_neighbors, 18);
    // High diversity scales dims with size: (60 / 6).clamp(15, 40)
    assert_eq!(params.reduction.target_dims, 15);
    // Zero density keeps the full default spacing
    assert!((params.reduction.min_distance - 0.01).abs() < 1e-9);
    // trunc(60 * 0.06) = 3 raised to the band floor 5; the scatter
    // discount trunc(5 * 0.85) = 4 is caught by the absolute floor.
    assert_eq!(params.clustering.min_cluster_size, 5);
    assert!((params.clustering.selection_epsilon - 0.05).abs() < 1e-9);
    assert_eq!(params.vectorizer.ngram_max, 2);
    assert!((params.vectorizer.max_doc_freq - 0.95).abs() < 1e-9);
    assert_eq!(params.vectorizer.max_vocab, 250);
}

#[test]
fn profile_and_parameters_are_deterministic() {
    let texts: Vec<String> = (0..80)
        .map(|i| format!("the room on floor {} was clean and quiet", i % 9))
        .collect();

    let first = characterize(&texts).unwrap();
    let second = characterize(&texts).unwrap();
    assert_eq!(first, second);
    assert_eq!(optimize(&first), optimize(&second));
}

// ============================================================
// Chain: derived vectorizer params -> keyword ranking
// ============================================================

#[test]
fn derived_vectorizer_params_surface_cluster_themes() {
    let cluster: Vec<String> = [
        "the pool area was spotless",
        "loved the heated pool",
        "pool towels ran out fast",
        "spa treatments were pricey",
        "relaxing afternoon by the pool",
        "spa staff were lovely",
        "the pool bar served snacks",
        "kids enjoyed the pool slide",
        "quiet spa with great sauna",
        "pool water was freezing",
        "sun loungers around the pool",
        "booked the spa twice",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let profile = characterize(&cluster).unwrap();
    let params = optimize(&profile);
    // Terse reviews stay in unigram mode
    assert_eq!(params.vectorizer.ngram_max, 1);

    let keywords = TfIdfKeywords.top_keywords(&cluster, &params.vectorizer, 8);
    assert!(keywords.len() <= 8);
    assert!(keywords.contains(&"pool".to_string()), "{keywords:?}");
    assert!(keywords.contains(&"spa".to_string()), "{keywords:?}");

    let union = stopword_union();
    for keyword in &keywords {
        assert!(!union.contains(keyword), "stopword ranked: {keyword}");
    }
}

#[test]
fn phrase_assembly_follows_mean_length() {
    // Ten-word reviews cross the phrase threshold, and "front desk" recurs
    // across five of them.
    let cluster: Vec<String> = [
        "the front desk team kept us waiting for forty minutes",
        "front desk staff lost our reservation and offered no apology",
        "called the front desk three times before anyone picked up",
        "checkin at the front desk was slow but very friendly",
        "the front desk printed our boarding passes without any fuss",
        "housekeeping left fresh towels and made up the room daily",
        "housekeeping skipped our room twice during the week we stayed",
        "the elevator near our room rattled loudly through the night",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let profile = characterize(&cluster).unwrap();
    let params = optimize(&profile);
    assert_eq!(params.vectorizer.ngram_max, 2);

    let keywords = TfIdfKeywords.top_keywords(&cluster, &params.vectorizer, 10);
    assert!(
        keywords.contains(&"front desk".to_string()),
        "{keywords:?}"
    );
}

// ============================================================
// Chain: reduce -> cluster on planted structure
// ============================================================

fn reduction_params(target_dims: usize) -> ReductionParams {
    ReductionParams {
        n_neighbors: 15,
        target_dims,
        min_distance: 0.0,
        metric: sift::topics::params::DistanceMetric::Cosine,
        random_seed: 42,
    }
}

fn clustering_params(min_cluster_size: usize) -> ClusteringParams {
    ClusteringParams {
        min_cluster_size,
        selection_epsilon: 0.0,
        selection: SelectionStrategy::ExcessOfMass,
        soft_membership: true,
    }
}

/// Two groups of 12 points in 16 dims, 12.0 apart on the first axis, with
/// small per-point variation on different axes per group.
fn planted_groups() -> Vec<Vec<f64>> {
    let mut vectors = Vec::new();
    for group in 0..2usize {
        for i in 0..12usize {
            let mut v = vec![0.0; 16];
            v[0] = (group * 12) as f64;
            v[1] = 0.01 * i as f64;
            v[2 + group] = 0.01 * (11 - i) as f64;
            vectors.push(v);
        }
    }
    vectors
}

#[test]
fn reduce_then_cluster_recovers_planted_groups() {
    let reduced = PcaReducer
        .reduce(&planted_groups(), &reduction_params(3))
        .unwrap();
    assert_eq!(reduced.len(), 24);
    assert!(reduced.iter().all(|row| row.len() == 3));

    let labels = DensityClusterer
        .cluster(&reduced, &clustering_params(6))
        .unwrap();

    assert!(labels.iter().all(|&l| l != OUTLIER_CLUSTER));
    assert!(labels[..12].iter().all(|&l| l == labels[0]));
    assert!(labels[12..].iter().all(|&l| l == labels[12]));
    assert_ne!(labels[0], labels[12]);
}

#[test]
fn outlier_isolation_survives_the_chain() {
    let mut vectors = planted_groups();
    let mut loner = vec![0.0; 16];
    loner[0] = 50.0;
    vectors.push(loner);

    let reduced = PcaReducer.reduce(&vectors, &reduction_params(3)).unwrap();
    let labels = DensityClusterer
        .cluster(&reduced, &clustering_params(6))
        .unwrap();

    assert_eq!(labels[24], OUTLIER_CLUSTER);
    let outliers = labels.iter().filter(|&&l| l == OUTLIER_CLUSTER).count();
    assert_eq!(outliers, 1);
    assert_ne!(labels[0], labels[12]);
}

// ============================================================
// Vectorizer params are plain data
// ============================================================

#[test]
fn vectorizer_params_can_be_reused_across_clusters() {
    let params = VectorizerParams {
        ngram_max: 1,
        min_doc_freq: 1,
        max_doc_freq: 0.95,
        max_vocab: 250,
        stopwords: stopword_union(),
    };

    let first = TfIdfKeywords.top_keywords(
        &[
            "breakfast was good".to_string(),
            "breakfast was fine".to_string(),
            "gym was busy".to_string(),
        ],
        &params,
        5,
    );
    let second = TfIdfKeywords.top_keywords(
        &[
            "parking was easy".to_string(),
            "parking cost nothing".to_string(),
            "lobby was loud".to_string(),
        ],
        &params,
        5,
    );
    assert!(first.contains(&"breakfast".to_string()), "{first:?}");
    assert!(second.contains(&"parking".to_string()), "{second:?}");
}
