// Corpus characterization — summary statistics that drive parameter tuning.
//
// Every category's review slice gets described by four numbers before any
// clustering happens. The downstream optimizer reads nothing else, so the
// whole adaptive behavior of the pipeline reduces to these measurements.
//
// Texts that are empty or whitespace-only are ignored throughout; a corpus
// with no usable text characterizes to None and the caller treats that the
// same as a corpus that's too small to model.

use std::collections::HashMap;

/// Summary statistics for one corpus of review texts.
///
/// All ratio fields are in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusCharacteristics {
    /// Number of usable (non-blank) texts.
    pub count: usize,
    /// Mean words per text, by whitespace splitting.
    pub mean_word_count: f64,
    /// How uniform text lengths are: 1 / (1 + cv) where cv is the
    /// coefficient of variation of word counts. 1.0 means identical lengths.
    pub homogeneity: f64,
    /// Unique lowercase tokens over total tokens across the corpus.
    pub lexical_diversity: f64,
    /// Of the distinct significant tokens, the fraction that recur. High
    /// density means shared vocabulary, which reads as recurring themes.
    pub semantic_density: f64,
}

/// Compute corpus characteristics, or None when no text survives filtering.
pub fn characterize(texts: &[String]) -> Option<CorpusCharacteristics> {
    let usable: Vec<&str> = texts
        .iter()
        .map(|t| t.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect();
    if usable.is_empty() {
        return None;
    }

    let word_counts: Vec<usize> = usable.iter().map(|t| t.split_whitespace().count()).collect();
    let count = usable.len();
    let total_words: usize = word_counts.iter().sum();
    let mean_word_count = total_words as f64 / count as f64;

    Some(CorpusCharacteristics {
        count,
        mean_word_count,
        homogeneity: length_homogeneity(&word_counts, mean_word_count),
        lexical_diversity: lexical_diversity(&usable),
        semantic_density: semantic_density(&usable),
    })
}

/// 1 / (1 + cv) over word counts, clamped to [0, 1]. A single text has no
/// spread to measure, so it's perfectly homogeneous by definition.
fn length_homogeneity(word_counts: &[usize], mean: f64) -> f64 {
    if word_counts.len() < 2 {
        return 1.0;
    }
    let variance = word_counts
        .iter()
        .map(|&c| {
            let d = c as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / word_counts.len() as f64;
    let cv = variance.sqrt() / mean;
    (1.0 / (1.0 + cv)).clamp(0.0, 1.0)
}

/// Unique tokens over total tokens, lowercase, whitespace-split.
fn lexical_diversity(texts: &[&str]) -> f64 {
    let mut unique = std::collections::HashSet::new();
    let mut total = 0usize;
    for text in texts {
        for token in text.split_whitespace() {
            unique.insert(token.to_lowercase());
            total += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    unique.len() as f64 / total as f64
}

/// Fraction of distinct significant tokens that appear more than once.
///
/// A token is significant when it's longer than three characters and isn't
/// purely numeric or purely punctuation. Short function words and stray
/// digits would otherwise dominate the recurrence count.
fn semantic_density(texts: &[&str]) -> f64 {
    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            if is_significant(&token) {
                *frequencies.entry(token).or_insert(0) += 1;
            }
        }
    }
    if frequencies.is_empty() {
        return 0.0;
    }
    let recurring = frequencies.values().filter(|&&c| c > 1).count();
    recurring as f64 / frequencies.len() as f64
}

fn is_significant(token: &str) -> bool {
    if token.chars().count() <= 3 {
        return false;
    }
    let purely_numeric = token.chars().all(|c| c.is_numeric());
    let purely_punctuation = token.chars().all(|c| !c.is_alphanumeric());
    !purely_numeric && !purely_punctuation
}
