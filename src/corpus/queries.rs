// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.
//
// Stored sentiment, subjectivity, date, and JSON fields are decoded leniently:
// a value that doesn't parse comes back as None (or an empty collection)
// instead of failing the whole load.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};

use super::models::{
    decode_categories, decode_topic_map, encode_categories, encode_topic_map, CategoryScores,
    NewReview, RepresentativeReview, ReviewItem, Sentiment, Subjectivity,
};

// --- Pipeline state ---

/// Get a pipeline state value by key (e.g., "topics_completed_at").
pub fn get_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM pipeline_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a pipeline state value (upsert).
pub fn set_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO pipeline_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Reviews ---

/// Insert a review, returning its id. When the source carries its own id an
/// existing row with that id is replaced, so re-importing a file is safe.
pub fn insert_review(conn: &Connection, review: &NewReview) -> Result<i64> {
    conn.execute(
        "INSERT OR REPLACE INTO reviews
            (id, text, stay_date, rating, sentiment, subjectivity, categories)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            review.id,
            review.text,
            review.stay_date.map(|d| d.format("%Y-%m-%d").to_string()),
            review.rating,
            review.sentiment.map(|s| s.as_str()),
            review.subjectivity.map(|s| s.as_str()),
            encode_categories(&review.categories),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Load the full corpus in stable id order. This ordering is what the sampler
/// relies on for its "first seen wins" tie-breaks.
pub fn load_reviews(conn: &Connection) -> Result<Vec<ReviewItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, text, stay_date, rating, sentiment, subjectivity, categories, topics
         FROM reviews
         ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        let stay_date: Option<String> = row.get(2)?;
        let sentiment: Option<String> = row.get(4)?;
        let subjectivity: Option<String> = row.get(5)?;
        let categories: String = row.get(6)?;
        let topics: String = row.get(7)?;
        Ok(ReviewItem {
            id: row.get(0)?,
            text: row.get(1)?,
            stay_date: stay_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            rating: row.get(3)?,
            sentiment: sentiment.as_deref().and_then(Sentiment::parse),
            subjectivity: subjectivity.as_deref().and_then(Subjectivity::parse),
            categories: decode_categories(&categories),
            topics: decode_topic_map(&topics),
        })
    })?;

    let mut reviews = Vec::new();
    for row in rows {
        reviews.push(row?);
    }
    Ok(reviews)
}

/// Count all reviews in the corpus.
pub fn count_reviews(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
    Ok(count)
}

/// Store a review's category → topic map.
pub fn save_topic_map(
    conn: &Connection,
    review_id: i64,
    topics: &std::collections::BTreeMap<String, String>,
) -> Result<()> {
    conn.execute(
        "UPDATE reviews SET topics = ?1 WHERE id = ?2",
        params![encode_topic_map(topics), review_id],
    )?;
    Ok(())
}

/// Reset all topic assignments (used by --force re-runs).
pub fn clear_topics(conn: &Connection) -> Result<()> {
    conn.execute("UPDATE reviews SET topics = '{}'", [])?;
    Ok(())
}

/// Count reviews that have at least one topic assigned.
pub fn topics_assigned_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE topics != '{}'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Count reviews per stored sentiment label. NULL sentiment shows up as
/// "Unlabeled" so the status report accounts for every row.
pub fn sentiment_counts(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(sentiment, 'Unlabeled'), COUNT(*)
         FROM reviews
         GROUP BY sentiment
         ORDER BY COUNT(*) DESC",
    )?;

    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

// --- Category scores ---

/// Save or update the classifier scores for one review.
pub fn upsert_category_scores(
    conn: &Connection,
    review_id: i64,
    scores: &CategoryScores,
) -> Result<()> {
    let scores_json = serde_json::to_string(scores)?;
    conn.execute(
        "INSERT INTO category_scores (review_id, scores)
         VALUES (?1, ?2)
         ON CONFLICT(review_id) DO UPDATE SET scores = ?2",
        params![review_id, scores_json],
    )?;
    Ok(())
}

/// Load all classifier scores, keyed by review id. Rows whose JSON doesn't
/// parse decode to an empty map, which the sampler treats as "no scores".
pub fn load_category_scores(
    conn: &Connection,
) -> Result<std::collections::HashMap<i64, CategoryScores>> {
    let mut stmt = conn.prepare("SELECT review_id, scores FROM category_scores")?;

    let rows = stmt.query_map([], |row| {
        let review_id: i64 = row.get(0)?;
        let json: String = row.get(1)?;
        Ok((review_id, json))
    })?;

    let mut scores = std::collections::HashMap::new();
    for row in rows {
        let (review_id, json) = row?;
        let parsed: CategoryScores = serde_json::from_str(&json).unwrap_or_default();
        scores.insert(review_id, parsed);
    }
    Ok(scores)
}

// --- Representative sample ---

/// Replace the stored sample with a fresh selection. The delete and the
/// inserts run in one transaction, so a failure mid-batch leaves the
/// previous selection untouched.
pub fn replace_sample(conn: &mut Connection, rows: &[RepresentativeReview]) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM representative_sample", [])?;
    for row in rows {
        tx.execute(
            "INSERT INTO representative_sample (review_id, sentiment, category, topic, text)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.review_id,
                row.sentiment.as_str(),
                row.category,
                row.topic,
                row.text,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Load the stored sample in selection order.
pub fn load_sample(conn: &Connection) -> Result<Vec<RepresentativeReview>> {
    let mut stmt = conn.prepare(
        "SELECT review_id, sentiment, category, topic, text
         FROM representative_sample
         ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        let sentiment: String = row.get(1)?;
        Ok((
            row.get::<_, i64>(0)?,
            sentiment,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut sample = Vec::new();
    for row in rows {
        let (review_id, sentiment, category, topic, text) = row?;
        // A sample row with an unreadable sentiment is dropped rather than
        // surfaced with a made-up label.
        let Some(sentiment) = Sentiment::parse(&sentiment) else {
            continue;
        };
        sample.push(RepresentativeReview {
            review_id,
            sentiment,
            category,
            topic,
            text,
        });
    }
    Ok(sample)
}

/// Count stored sample rows.
pub fn count_sample(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM representative_sample", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

// rusqlite's optional() helper — converts "no rows" into None
use rusqlite::OptionalExtension;
