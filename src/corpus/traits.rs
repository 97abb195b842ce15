// Corpus store trait — backend-agnostic async interface for all persistence.
//
// All methods are async so a sync backend (rusqlite via Mutex) and any future
// native-async backend fit behind a single interface. Commands hold an
// `Arc<dyn CorpusStore>` and never see rusqlite types.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;

use super::models::{CategoryScores, NewReview, RepresentativeReview, ReviewItem};

#[async_trait]
pub trait CorpusStore: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Pipeline state ---

    /// Get a pipeline state value by key (e.g., "topics_completed_at").
    async fn get_state(&self, key: &str) -> Result<Option<String>>;

    /// Set a pipeline state value (upsert).
    async fn set_state(&self, key: &str, value: &str) -> Result<()>;

    // --- Reviews ---

    /// Insert a review and return its id.
    async fn insert_review(&self, review: &NewReview) -> Result<i64>;

    /// Load the full corpus in stable id order.
    async fn load_reviews(&self) -> Result<Vec<ReviewItem>>;

    /// Count all reviews.
    async fn count_reviews(&self) -> Result<i64>;

    /// Store topic maps for a batch of reviews.
    async fn save_topic_maps(&self, entries: &[(i64, BTreeMap<String, String>)]) -> Result<()>;

    /// Reset all topic assignments.
    async fn clear_topics(&self) -> Result<()>;

    /// Count reviews that have at least one topic assigned.
    async fn topics_assigned_count(&self) -> Result<i64>;

    /// Count reviews per stored sentiment label.
    async fn sentiment_counts(&self) -> Result<Vec<(String, i64)>>;

    // --- Category scores ---

    /// Save or update the classifier scores for one review.
    async fn upsert_category_scores(&self, review_id: i64, scores: &CategoryScores) -> Result<()>;

    /// Load all classifier scores, keyed by review id.
    async fn load_category_scores(&self) -> Result<HashMap<i64, CategoryScores>>;

    // --- Representative sample ---

    /// Replace the stored sample with a fresh selection.
    async fn replace_sample(&self, rows: &[RepresentativeReview]) -> Result<()>;

    /// Load the stored sample in selection order.
    async fn load_sample(&self) -> Result<Vec<RepresentativeReview>>;

    /// Count stored sample rows.
    async fn count_sample(&self) -> Result<i64>;
}
