// SqliteCorpus — rusqlite backend implementing the CorpusStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points — Rust enforces this because
// MutexGuard is !Send.
//
// The free functions in queries.rs remain unchanged so tests can run against
// a Connection directly.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{CategoryScores, NewReview, RepresentativeReview, ReviewItem};
use super::traits::CorpusStore;

pub struct SqliteCorpus {
    conn: Mutex<Connection>,
}

impl SqliteCorpus {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl CorpusStore for SqliteCorpus {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_state(&conn, key)
    }

    async fn set_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_state(&conn, key, value)
    }

    async fn insert_review(&self, review: &NewReview) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::insert_review(&conn, review)
    }

    async fn load_reviews(&self) -> Result<Vec<ReviewItem>> {
        let conn = self.conn.lock().await;
        super::queries::load_reviews(&conn)
    }

    async fn count_reviews(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::count_reviews(&conn)
    }

    async fn save_topic_maps(&self, entries: &[(i64, BTreeMap<String, String>)]) -> Result<()> {
        let mut conn = self.conn.lock().await;
        // One transaction for the whole batch — a few thousand single-row
        // UPDATEs would otherwise each pay a commit.
        let tx = conn.transaction()?;
        for (review_id, topics) in entries {
            super::queries::save_topic_map(&tx, *review_id, topics)?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn clear_topics(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::clear_topics(&conn)
    }

    async fn topics_assigned_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::topics_assigned_count(&conn)
    }

    async fn sentiment_counts(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().await;
        super::queries::sentiment_counts(&conn)
    }

    async fn upsert_category_scores(&self, review_id: i64, scores: &CategoryScores) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::upsert_category_scores(&conn, review_id, scores)
    }

    async fn load_category_scores(&self) -> Result<HashMap<i64, CategoryScores>> {
        let conn = self.conn.lock().await;
        super::queries::load_category_scores(&conn)
    }

    async fn replace_sample(&self, rows: &[RepresentativeReview]) -> Result<()> {
        let mut conn = self.conn.lock().await;
        super::queries::replace_sample(&mut conn, rows)
    }

    async fn load_sample(&self) -> Result<Vec<RepresentativeReview>> {
        let conn = self.conn.lock().await;
        super::queries::load_sample(&conn)
    }

    async fn count_sample(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::count_sample(&conn)
    }
}
