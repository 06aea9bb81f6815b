// src/store.rs
// =============================================================================
// SQLite storage for pages worth keeping.
//
// One table, `links`:
//   id    INTEGER PRIMARY KEY
//   url   TEXT UNIQUE
//   data  TEXT          (normalized page text)
//
// Writes are "insert if absent": the first worker to store a URL wins, and
// every later attempt (including two workers racing on the same URL) is a
// harmless no-op. SQLite serializes the writes for us.
//
// Rust concepts:
// - sqlx: async database access with a connection pool
// - thiserror: a small error enum callers can match on
// =============================================================================

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// Schema migrations, embedded into the binary at compile time
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

// Workers write one row at a time; a handful of connections is plenty
const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to apply database migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
}

// Row counts around a deduplication pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupReport {
    pub before: u64,
    pub removed: u64,
    pub after: u64,
}

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    // Opens (or creates) the database file and brings the schema up to date
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let options = Self::base_options()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Connect {
                path: path.display().to_string(),
                source,
            })?;

        Self::from_pool(pool).await
    }

    // A private in-memory database, used by tests.
    //
    // Limited to one connection that never expires: every new connection to
    // ":memory:" would see a different, empty database.
    #[cfg(test)]
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let options = Self::base_options().filename(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Connect {
                path: ":memory:".to_string(),
                source,
            })?;

        Self::from_pool(pool).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .synchronous(SqliteSynchronous::Normal)
            // Several workers may write at once; wait for the lock instead
            // of failing with SQLITE_BUSY
            .busy_timeout(Duration::from_secs(5))
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    // Stores a page unless its URL is already there.
    //
    // Returns true if a new row was written, false if the URL existed.
    // An existing row is never overwritten.
    pub async fn upsert_if_absent(&self, url: &str, data: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT OR IGNORE INTO links (url, data) VALUES (?, ?)")
            .bind(url)
            .bind(data)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    // Every stored URL, oldest first
    pub async fn list_all_urls(&self) -> Result<Vec<String>, StoreError> {
        let urls = sqlx::query_scalar("SELECT url FROM links WHERE url IS NOT NULL ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(urls)
    }

    // Up to `limit` stored URLs in random order
    pub async fn sample_random_urls(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let urls = sqlx::query_scalar(
            "SELECT url FROM links WHERE url IS NOT NULL ORDER BY RANDOM() LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(urls)
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    // Removes rows that share a URL, keeping the earliest one.
    //
    // The UNIQUE constraint stops new duplicates, but databases created by
    // older versions of the schema may still have some.
    pub async fn deduplicate(&self) -> Result<DedupReport, StoreError> {
        let before = self.count().await?;
        sqlx::query("DELETE FROM links WHERE id NOT IN (SELECT MIN(id) FROM links GROUP BY url)")
            .execute(&self.pool)
            .await?;
        let after = self.count().await?;

        Ok(DedupReport {
            before,
            removed: before - after,
            after,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
