// Representative sampling: compress labeled reviews into a handful of
// concrete quotes per sentiment, category, and topic.
//
// Strategy: start from mixed-subjectivity reviews (opinion grounded in
// concrete detail quotes best), split by sentiment, resolve each review to
// the category its classifier scores say it speaks to most strongly, keep
// the dominant topics per category, and pick one quote per (sentiment,
// category, topic) cell — favoring longer, more recent reviews.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::info;

use crate::corpus::models::{
    CategoryScores, RepresentativeReview, ReviewItem, Sentiment, Subjectivity,
};

/// Topic recorded for a review whose primary category never got topics
/// assigned (skipped category, or sampling ran before topic discovery).
pub const NO_TOPIC: &str = "no topic";

/// Knobs for the sampling pass.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// How many topics to keep per category, ranked by review count.
    pub top_n_subtopics: usize,
    /// Whether neutral-sentiment reviews may be selected.
    pub include_neutral: bool,
    /// Below this many mixed-subjectivity reviews, the whole corpus becomes
    /// the pool so small corpora still produce a sample.
    pub min_mixed_pool: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            top_n_subtopics: 3,
            include_neutral: false,
            min_mixed_pool: 10,
        }
    }
}

/// Result of a sampling run.
#[derive(Debug, Clone)]
pub struct SampleSummary {
    pub selections: Vec<RepresentativeReview>,
    /// Size of the full corpus the sample was drawn from.
    pub total_reviews: usize,
    /// Reviews that survived the subjectivity and sentiment gates.
    pub eligible_reviews: usize,
    /// The whole corpus was used because too few reviews were mixed.
    pub used_corpus_fallback: bool,
}

impl SampleSummary {
    /// Size reduction relative to the full corpus, as a percentage.
    pub fn reduction_pct(&self) -> f64 {
        if self.total_reviews == 0 {
            return 0.0;
        }
        100.0 * (1.0 - self.selections.len() as f64 / self.total_reviews as f64)
    }
}

/// Select representative quotes from a labeled corpus.
///
/// `scores` maps review ids to per-category classifier scores; a review
/// without a scored category cannot be attributed and is dropped.
pub fn select_representatives(
    reviews: &[ReviewItem],
    scores: &HashMap<i64, CategoryScores>,
    config: &SamplerConfig,
) -> SampleSummary {
    // Step 1: Subjectivity gate — mixed reviews are the preferred pool;
    // when there aren't enough of them the whole corpus is sampled instead
    let mixed: Vec<&ReviewItem> = reviews
        .iter()
        .filter(|r| r.subjectivity == Some(Subjectivity::Mixed))
        .collect();

    let (pool, used_corpus_fallback) = if mixed.len() < config.min_mixed_pool {
        info!(
            mixed = mixed.len(),
            required = config.min_mixed_pool,
            "Too few mixed-subjectivity reviews, sampling from the full corpus"
        );
        (reviews.iter().collect::<Vec<&ReviewItem>>(), true)
    } else {
        (mixed, false)
    };

    // Step 2: Sentiment gate — neutral rarely quotes well, unlabeled never
    let eligible: Vec<&ReviewItem> = pool
        .into_iter()
        .filter(|r| match r.sentiment {
            Some(Sentiment::Positive) | Some(Sentiment::Negative) => true,
            Some(Sentiment::Neutral) => config.include_neutral,
            None => false,
        })
        .collect();

    // Step 3: Resolve each review to its primary category and the topic it
    // was assigned there
    let mut resolved: Vec<(&ReviewItem, String, String)> = Vec::new();
    for &review in &eligible {
        let Some(category) = primary_category(review, scores) else {
            continue; // no scored category to attribute the quote to
        };
        let topic = review
            .topics
            .get(&category)
            .cloned()
            .unwrap_or_else(|| NO_TOPIC.to_string());
        resolved.push((review, category, topic));
    }

    // Step 4: Keep only the dominant topics within each category
    let keep = dominant_topics(&resolved, config.top_n_subtopics);

    // Step 5: One representative per (sentiment, category, topic) cell.
    // The entry starts as the first candidate; later candidates replace it
    // only when strictly better, so ties resolve toward review order.
    let mut cells: BTreeMap<(String, String, String), (&ReviewItem, Sentiment)> = BTreeMap::new();
    for (review, category, topic) in &resolved {
        if !keep.contains(&(category.clone(), topic.clone())) {
            continue;
        }
        let Some(sentiment) = review.sentiment else {
            continue;
        };
        let key = (
            sentiment.as_str().to_string(),
            category.clone(),
            topic.clone(),
        );
        let entry = cells.entry(key).or_insert((*review, sentiment));
        if better(review, entry.0) {
            *entry = (*review, sentiment);
        }
    }

    // Step 6: Emit rows in cell order (sentiment, then category, then topic)
    let selections: Vec<RepresentativeReview> = cells
        .into_iter()
        .map(|((_, category, topic), (review, sentiment))| RepresentativeReview {
            review_id: review.id,
            sentiment,
            category,
            topic,
            text: review.text.clone(),
        })
        .collect();

    SampleSummary {
        selections,
        total_reviews: reviews.len(),
        eligible_reviews: eligible.len(),
        used_corpus_fallback,
    }
}

/// The category a review speaks to most strongly: highest classifier score,
/// with map order breaking ties. A review whose scores are missing, empty,
/// or all NaN has no primary category.
fn primary_category(review: &ReviewItem, scores: &HashMap<i64, CategoryScores>) -> Option<String> {
    let score_map = scores.get(&review.id)?;
    let mut best: Option<(&String, f64)> = None;
    for (category, &score) in score_map {
        // Strict comparison: ties and NaN never displace the incumbent
        if !score.is_nan() && best.map_or(true, |(_, b)| score > b) {
            best = Some((category, score));
        }
    }
    best.map(|(category, _)| category.clone())
}

/// The top-N topics per category by review count. Ties break toward the
/// topic seen first in review order.
fn dominant_topics(
    resolved: &[(&ReviewItem, String, String)],
    top_n: usize,
) -> HashSet<(String, String)> {
    // (category, topic) → count, in first-seen order
    let mut counts: Vec<((String, String), usize)> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for (_, category, topic) in resolved {
        let key = (category.clone(), topic.clone());
        match index.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    let category_names: HashSet<&str> = counts.iter().map(|(key, _)| key.0.as_str()).collect();

    let mut keep = HashSet::new();
    for category in category_names {
        // counts is already in first-seen order, so a stable sort by count
        // leaves ties in encounter order
        let mut topics: Vec<&((String, String), usize)> = counts
            .iter()
            .filter(|(key, _)| key.0 == category)
            .collect();
        topics.sort_by(|a, b| b.1.cmp(&a.1));
        for (key, _) in topics.into_iter().take(top_n) {
            keep.insert(key.clone());
        }
    }
    keep
}

/// Prefer the longer review; break length ties toward the more recent stay.
/// A dated review beats an undated one at equal length.
fn better(candidate: &ReviewItem, incumbent: &ReviewItem) -> bool {
    let candidate_len = candidate.text.chars().count();
    let incumbent_len = incumbent.text.chars().count();
    if candidate_len != incumbent_len {
        return candidate_len > incumbent_len;
    }
    candidate.stay_date > incumbent.stay_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn review(id: i64, text: &str, sentiment: Sentiment, categories: &[&str]) -> ReviewItem {
        ReviewItem {
            id,
            text: text.to_string(),
            stay_date: None,
            rating: None,
            sentiment: Some(sentiment),
            subjectivity: Some(Subjectivity::Mixed),
            categories: categories.iter().map(|s| s.to_string()).collect(),
            topics: BTreeMap::new(),
        }
    }

    fn with_topic(mut review: ReviewItem, category: &str, topic: &str) -> ReviewItem {
        review
            .topics
            .insert(category.to_string(), topic.to_string());
        review
    }

    fn config() -> SamplerConfig {
        SamplerConfig {
            top_n_subtopics: 3,
            include_neutral: false,
            min_mixed_pool: 0,
        }
    }

    fn no_scores() -> HashMap<i64, CategoryScores> {
        HashMap::new()
    }

    /// Score each review 1.0 for its first tagged category.
    fn scored(reviews: &[ReviewItem]) -> HashMap<i64, CategoryScores> {
        reviews
            .iter()
            .filter_map(|r| {
                let category = r.categories.first()?.clone();
                Some((r.id, CategoryScores::from([(category, 1.0)])))
            })
            .collect()
    }

    // ── Sentiment and subjectivity gates ────────────────────────────

    #[test]
    fn test_positive_and_negative_each_get_a_representative() {
        let reviews = vec![
            with_topic(
                review(1, "Loved the breakfast spread", Sentiment::Positive, &["food"]),
                "food",
                "Breakfast",
            ),
            with_topic(
                review(2, "Breakfast was cold and late", Sentiment::Negative, &["food"]),
                "food",
                "Breakfast",
            ),
        ];

        let summary = select_representatives(&reviews, &scored(&reviews), &config());

        assert_eq!(summary.selections.len(), 2);
        let sentiments: Vec<&str> = summary
            .selections
            .iter()
            .map(|s| s.sentiment.as_str())
            .collect();
        assert!(sentiments.contains(&"Positive"));
        assert!(sentiments.contains(&"Negative"));
    }

    #[test]
    fn test_neutral_dropped_by_default() {
        let reviews = vec![with_topic(
            review(1, "The room was a room", Sentiment::Neutral, &["rooms"]),
            "rooms",
            "Room quality",
        )];

        let summary = select_representatives(&reviews, &scored(&reviews), &config());
        assert!(summary.selections.is_empty());
        assert_eq!(summary.eligible_reviews, 0);
    }

    #[test]
    fn test_neutral_kept_when_included() {
        let reviews = vec![with_topic(
            review(1, "The room was a room", Sentiment::Neutral, &["rooms"]),
            "rooms",
            "Room quality",
        )];

        let cfg = SamplerConfig {
            include_neutral: true,
            ..config()
        };
        let summary = select_representatives(&reviews, &scored(&reviews), &cfg);
        assert_eq!(summary.selections.len(), 1);
        assert_eq!(summary.selections[0].sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_unlabeled_sentiment_never_selected() {
        let mut r = review(1, "No sentiment label here", Sentiment::Positive, &["food"]);
        r.sentiment = None;

        let reviews = vec![r];
        let summary = select_representatives(&reviews, &scored(&reviews), &config());
        assert!(summary.selections.is_empty());
    }

    #[test]
    fn test_non_mixed_reviews_stay_out_of_the_pool() {
        let mut r = review(1, "Truly wonderful stay", Sentiment::Positive, &["rooms"]);
        r.subjectivity = Some(Subjectivity::Subjective);

        // Threshold 0 means the mixed pool (empty here) is never widened
        let reviews = vec![r];
        let summary = select_representatives(&reviews, &scored(&reviews), &config());
        assert!(summary.selections.is_empty());
        assert!(!summary.used_corpus_fallback);
    }

    #[test]
    fn test_corpus_fallback_below_threshold() {
        let mut subjective = with_topic(
            review(1, "Wonderful pool area", Sentiment::Positive, &["facilities"]),
            "facilities",
            "Pool",
        );
        subjective.subjectivity = Some(Subjectivity::Subjective);

        let reviews = vec![
            subjective,
            with_topic(
                review(2, "Nice pool but the gym was closed", Sentiment::Positive, &["facilities"]),
                "facilities",
                "Pool",
            ),
        ];

        // Only one mixed review; below the threshold everything samples
        let cfg = SamplerConfig {
            min_mixed_pool: 5,
            ..config()
        };
        let summary = select_representatives(&reviews, &scored(&reviews), &cfg);

        assert!(summary.used_corpus_fallback);
        assert_eq!(summary.eligible_reviews, 2);
    }

    #[test]
    fn test_no_fallback_when_mixed_pool_suffices() {
        let mut subjective = review(1, "Wonderful pool area", Sentiment::Positive, &["facilities"]);
        subjective.subjectivity = Some(Subjectivity::Subjective);

        let reviews = vec![
            subjective,
            with_topic(
                review(2, "Nice pool but loud", Sentiment::Positive, &["facilities"]),
                "facilities",
                "Pool",
            ),
        ];

        let cfg = SamplerConfig {
            min_mixed_pool: 1,
            ..config()
        };
        let summary = select_representatives(&reviews, &scored(&reviews), &cfg);

        assert!(!summary.used_corpus_fallback);
        assert_eq!(summary.eligible_reviews, 1);
        assert_eq!(summary.selections[0].review_id, 2);
    }

    // ── Primary category resolution ─────────────────────────────────

    #[test]
    fn test_primary_category_follows_highest_score() {
        let r = with_topic(
            with_topic(
                review(1, "Great food, average room", Sentiment::Positive, &["rooms", "food"]),
                "rooms",
                "Room quality",
            ),
            "food",
            "Dinner",
        );

        let mut scores = HashMap::new();
        let mut score_map = CategoryScores::new();
        score_map.insert("rooms".to_string(), 0.2);
        score_map.insert("food".to_string(), 0.9);
        scores.insert(1, score_map);

        let summary = select_representatives(&[r], &scores, &config());

        assert_eq!(summary.selections.len(), 1);
        assert_eq!(summary.selections[0].category, "food");
        assert_eq!(summary.selections[0].topic, "Dinner");
    }

    #[test]
    fn test_score_tie_resolves_to_first_category_in_map_order() {
        let r = review(1, "Fine all around", Sentiment::Positive, &["rooms", "food"]);

        let mut scores = HashMap::new();
        let mut score_map = CategoryScores::new();
        score_map.insert("rooms".to_string(), 0.5);
        score_map.insert("food".to_string(), 0.5);
        scores.insert(1, score_map);

        let summary = select_representatives(&[r], &scores, &config());

        // BTreeMap iterates alphabetically: "food" before "rooms"
        assert_eq!(summary.selections[0].category, "food");
    }

    #[test]
    fn test_reviews_without_usable_scores_are_dropped() {
        let reviews = vec![
            with_topic(
                review(1, "Great breakfast spread", Sentiment::Positive, &["food"]),
                "food",
                "Breakfast",
            ),
            with_topic(
                review(2, "Warm welcome at the desk", Sentiment::Positive, &["service"]),
                "service",
                "Check-in",
            ),
            with_topic(
                review(3, "Lovely rooftop view", Sentiment::Positive, &["views"]),
                "views",
                "Rooftop",
            ),
        ];

        // Review 1 has no scores entry, review 2 decoded to an empty map,
        // and review 3 carries only a NaN score. None can be attributed.
        let mut scores = no_scores();
        scores.insert(2, CategoryScores::new());
        scores.insert(3, CategoryScores::from([("views".to_string(), f64::NAN)]));

        let summary = select_representatives(&reviews, &scores, &config());

        // They pass the eligibility gates but never reach a cell
        assert_eq!(summary.eligible_reviews, 3);
        assert!(summary.selections.is_empty());
    }

    #[test]
    fn test_missing_topic_becomes_no_topic() {
        // Category scored but no topic assigned for it
        let r = review(1, "Checked in late at night", Sentiment::Positive, &["service"]);

        let reviews = vec![r];
        let summary = select_representatives(&reviews, &scored(&reviews), &config());
        assert_eq!(summary.selections[0].topic, NO_TOPIC);
    }

    #[test]
    fn test_only_primary_category_is_represented() {
        let r = with_topic(
            review(1, "Food was the highlight", Sentiment::Positive, &["food", "rooms"]),
            "food",
            "Dinner",
        );

        let mut scores = HashMap::new();
        let mut score_map = CategoryScores::new();
        score_map.insert("food".to_string(), 0.9);
        score_map.insert("rooms".to_string(), 0.1);
        scores.insert(1, score_map);

        let summary = select_representatives(&[r], &scores, &config());

        assert_eq!(summary.selections.len(), 1);
        assert!(summary.selections.iter().all(|s| s.category == "food"));
    }

    // ── Dominant topic limiting ─────────────────────────────────────

    #[test]
    fn test_top_n_keeps_dominant_topics_only() {
        let mut reviews = Vec::new();
        let mut id = 0;
        for (topic, count) in [("Breakfast", 3), ("Dinner", 2), ("Snacks", 2), ("Wine", 1)] {
            for _ in 0..count {
                id += 1;
                reviews.push(with_topic(
                    review(id, &format!("review {id} about {topic}"), Sentiment::Positive, &["food"]),
                    "food",
                    topic,
                ));
            }
        }

        let cfg = SamplerConfig {
            top_n_subtopics: 2,
            ..config()
        };
        let summary = select_representatives(&reviews, &scored(&reviews), &cfg);

        let topics: HashSet<&str> = summary.selections.iter().map(|s| s.topic.as_str()).collect();
        // Breakfast (3) wins outright; Dinner and Snacks tie at 2 and the
        // tie breaks toward Dinner, which appears first
        assert!(topics.contains("Breakfast"));
        assert!(topics.contains("Dinner"));
        assert!(!topics.contains("Snacks"));
        assert!(!topics.contains("Wine"));
    }

    // ── Cell representative choice ──────────────────────────────────

    #[test]
    fn test_longest_text_wins_the_cell() {
        let reviews = vec![
            with_topic(
                review(1, "Good pool", Sentiment::Positive, &["facilities"]),
                "facilities",
                "Pool",
            ),
            with_topic(
                review(
                    2,
                    "The pool area was spotless and the loungers plentiful",
                    Sentiment::Positive,
                    &["facilities"],
                ),
                "facilities",
                "Pool",
            ),
        ];

        let summary = select_representatives(&reviews, &scored(&reviews), &config());

        assert_eq!(summary.selections.len(), 1);
        assert_eq!(summary.selections[0].review_id, 2);
    }

    #[test]
    fn test_recent_stay_breaks_length_tie() {
        let mut older = with_topic(
            review(1, "Nice spa day", Sentiment::Positive, &["wellness"]),
            "wellness",
            "Spa",
        );
        older.stay_date = NaiveDate::from_ymd_opt(2024, 1, 10);

        let mut newer = with_topic(
            review(2, "Cool spa day", Sentiment::Positive, &["wellness"]),
            "wellness",
            "Spa",
        );
        newer.stay_date = NaiveDate::from_ymd_opt(2024, 6, 10);

        let reviews = vec![older, newer];
        let summary = select_representatives(&reviews, &scored(&reviews), &config());
        assert_eq!(summary.selections[0].review_id, 2);
    }

    #[test]
    fn test_dated_review_beats_undated_at_equal_length() {
        let undated = with_topic(
            review(1, "Nice spa day", Sentiment::Positive, &["wellness"]),
            "wellness",
            "Spa",
        );
        let mut dated = with_topic(
            review(2, "Cool spa day", Sentiment::Positive, &["wellness"]),
            "wellness",
            "Spa",
        );
        dated.stay_date = NaiveDate::from_ymd_opt(2023, 3, 1);

        let reviews = vec![undated, dated];
        let summary = select_representatives(&reviews, &scored(&reviews), &config());
        assert_eq!(summary.selections[0].review_id, 2);
    }

    #[test]
    fn test_full_tie_keeps_first_review() {
        let reviews = vec![
            with_topic(
                review(1, "Nice spa day", Sentiment::Positive, &["wellness"]),
                "wellness",
                "Spa",
            ),
            with_topic(
                review(2, "Cool spa day", Sentiment::Positive, &["wellness"]),
                "wellness",
                "Spa",
            ),
        ];

        let summary = select_representatives(&reviews, &scored(&reviews), &config());
        assert_eq!(summary.selections[0].review_id, 1);
    }

    // ── Summary arithmetic ──────────────────────────────────────────

    #[test]
    fn test_reduction_pct() {
        let reviews = vec![
            with_topic(
                review(1, "Loved the breakfast spread", Sentiment::Positive, &["food"]),
                "food",
                "Breakfast",
            ),
            with_topic(
                review(2, "Great breakfast options daily", Sentiment::Positive, &["food"]),
                "food",
                "Breakfast",
            ),
            with_topic(
                review(3, "Breakfast was cold and late", Sentiment::Negative, &["food"]),
                "food",
                "Breakfast",
            ),
            with_topic(
                review(4, "Breakfast ran out before nine", Sentiment::Negative, &["food"]),
                "food",
                "Breakfast",
            ),
        ];

        let summary = select_representatives(&reviews, &scored(&reviews), &config());

        // 4 reviews compressed to 2 cells (one per sentiment) = 50%
        assert_eq!(summary.selections.len(), 2);
        let pct = summary.reduction_pct();
        assert!(
            (pct - 50.0).abs() < 1e-9,
            "Expected 50% reduction, got {pct}"
        );
    }

    #[test]
    fn test_empty_corpus() {
        let summary = select_representatives(&[], &no_scores(), &config());
        assert!(summary.selections.is_empty());
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.reduction_pct(), 0.0);
    }
}
