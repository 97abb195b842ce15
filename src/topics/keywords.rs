// Keyword ranking for cluster labeling.
//
// Uses the `keyword_extraction` crate for TF-IDF over a cluster's documents —
// each review is one IDF unit, so words distinctive to some reviews outrank
// filler that appears everywhere. On top of the ranked unigrams, consecutive
// non-stopword token runs are assembled into phrases when the vectorizer
// params allow n-grams, since review vocabulary is full of two-word noun
// phrases ("front desk", "buffet breakfast") that single words miss.

use std::collections::{HashMap, HashSet};

use keyword_extraction::tf_idf::{TfIdf, TfIdfParams};
use stop_words::{get, LANGUAGE};

use super::params::VectorizerParams;
use super::traits::KeywordRanker;

/// Stopword union across the languages hotel review corpora actually mix.
/// Order is stable and duplicates across languages collapse to one entry.
pub fn stopword_union() -> Vec<String> {
    let mut union = Vec::new();
    let mut seen = HashSet::new();
    for language in [
        LANGUAGE::Spanish,
        LANGUAGE::English,
        LANGUAGE::Portuguese,
        LANGUAGE::French,
        LANGUAGE::Italian,
    ] {
        for word in get(language) {
            if seen.insert(word.clone()) {
                union.push(word);
            }
        }
    }
    union
}

/// TF-IDF backed keyword ranker — the production KeywordRanker.
pub struct TfIdfKeywords;

impl KeywordRanker for TfIdfKeywords {
    fn top_keywords(
        &self,
        docs: &[String],
        params: &VectorizerParams,
        limit: usize,
    ) -> Vec<String> {
        if docs.is_empty() || limit == 0 {
            return Vec::new();
        }

        let tfidf = TfIdf::new(TfIdfParams::UnprocessedDocuments(
            docs,
            &params.stopwords,
            None,
        ));
        let ranked: Vec<(String, f32)> = tfidf.get_ranked_word_scores(params.max_vocab);

        let stop: HashSet<&str> = params.stopwords.iter().map(|s| s.as_str()).collect();
        let doc_tokens: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d, &stop)).collect();
        // Document frequency counts whole tokens, so "art" never picks up
        // credit from a document that only mentions "apartment".
        let token_sets: Vec<HashSet<&str>> = doc_tokens
            .iter()
            .map(|tokens| tokens.iter().map(String::as_str).collect())
            .collect();
        let n_docs = docs.len();

        struct Candidate {
            term: String,
            score: f64,
        }

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut unigram_scores: HashMap<String, f64> = HashMap::new();

        for (word, score) in ranked {
            let df = token_sets
                .iter()
                .filter(|set| set.contains(word.as_str()))
                .count();
            if df < params.min_doc_freq || too_common(df, n_docs, params.max_doc_freq) {
                continue;
            }
            unigram_scores.insert(word.clone(), score as f64);
            candidates.push(Candidate {
                term: word,
                score: score as f64,
            });
        }

        if params.ngram_max >= 2 {
            // Which documents contain each phrase, in first-encounter order
            // so equal scores rank deterministically.
            let mut phrase_docs: HashMap<String, HashSet<usize>> = HashMap::new();
            let mut phrase_order: Vec<String> = Vec::new();
            for (doc_idx, tokens) in doc_tokens.iter().enumerate() {
                for len in 2..=params.ngram_max {
                    for window in tokens.windows(len) {
                        let phrase = window.join(" ");
                        phrase_docs
                            .entry(phrase.clone())
                            .or_insert_with(|| {
                                phrase_order.push(phrase);
                                HashSet::new()
                            })
                            .insert(doc_idx);
                    }
                }
            }

            for phrase in phrase_order {
                let df = phrase_docs[&phrase].len();
                // A phrase seen in a single document is not a theme.
                if df < params.min_doc_freq.max(2) || too_common(df, n_docs, params.max_doc_freq) {
                    continue;
                }
                let member_sum: f64 = phrase
                    .split(' ')
                    .map(|w| unigram_scores.get(w).copied().unwrap_or(0.0))
                    .sum();
                if member_sum <= 0.0 {
                    continue;
                }
                candidates.push(Candidate {
                    term: phrase,
                    score: member_sum * df as f64,
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.into_iter().take(limit).map(|c| c.term).collect()
    }
}

/// Terms in more than max_doc_freq of the documents are filler, not keywords.
fn too_common(df: usize, n_docs: usize, max_doc_freq: f64) -> bool {
    df as f64 / n_docs as f64 > max_doc_freq
}

fn tokenize(text: &str, stop: &HashSet<&str>) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !stop.contains(t.as_str()))
        .collect()
}
