// Database schema — table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run, and each migration is a function that
// executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- The review corpus with upstream annotations.
        -- categories is a JSON array of category names; topics is a JSON
        -- object mapping category name -> discovered topic label.
        CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            stay_date TEXT,                    -- ISO-8601 date, null when unknown
            sentiment TEXT,                    -- Positive / Neutral / Negative
            subjectivity TEXT,                 -- Subjective / Mixed
            categories TEXT NOT NULL DEFAULT '[]',
            topics TEXT NOT NULL DEFAULT '{}',
            imported_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Per-review relevance scores from the upstream category classifier
        CREATE TABLE IF NOT EXISTS category_scores (
            review_id INTEGER PRIMARY KEY,
            scores TEXT NOT NULL               -- JSON object: category -> score
        );

        -- Output of the representative sampler, replaced wholesale each run
        CREATE TABLE IF NOT EXISTS representative_sample (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_id INTEGER NOT NULL,
            sentiment TEXT NOT NULL,
            category TEXT NOT NULL,
            topic TEXT NOT NULL,
            text TEXT NOT NULL,
            selected_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Pipeline state — phase completion markers and counters
        CREATE TABLE IF NOT EXISTS pipeline_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Index for sentiment breakdowns in status output
        CREATE INDEX IF NOT EXISTS idx_reviews_sentiment
            ON reviews(sentiment);

        -- Index for browsing the sample by category
        CREATE INDEX IF NOT EXISTS idx_sample_category
            ON representative_sample(category);
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: add rating column so imports keep the source's numeric
    // score alongside the derived annotations.
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE reviews ADD COLUMN rating REAL;")
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
/// The migration function receives the connection and should execute its SQL.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        // Running create_tables twice should not error
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let count = table_count(&conn).unwrap();
        // schema_version, reviews, category_scores,
        // representative_sample, pipeline_state = 5 tables
        assert_eq!(count, 5i64);
    }

    #[test]
    fn test_migration_v2_adds_rating_column() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        conn.execute(
            "INSERT INTO reviews (id, text, rating) VALUES (1, 'great stay', 4.5)",
            [],
        )
        .unwrap();

        let rating: f64 = conn
            .query_row("SELECT rating FROM reviews WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!((rating - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        // Run create_tables three times — the migration should only run once
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }
}
