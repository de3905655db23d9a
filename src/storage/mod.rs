//! Persistent deduplication store.
//!
//! Delivered articles are recorded in a SQLite database keyed by their
//! lowercased ID. [`use_store`] wraps a feed so that every article is
//! forwarded at most once across runs, and recorded only after the
//! downstream consumer accepted it.

mod schema;

pub use schema::MIGRATIONS;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::article::Article;
use crate::pipeline::{check_cancelled, wrap, Feed, Middleware, Next, Wrap};
use crate::{FeedbotError, Result};

/// Handle to the article store.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the store at `path`, creating the file and its parent
    /// directories when missing. Migrations are applied automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        info!("Opening store at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory store");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every in-memory connection is a separate database, so keep exactly
        // one alive for the lifetime of the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        let (table_exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        )
        .fetch_one(&self.pool)
        .await?;

        if !table_exists {
            return Ok(0);
        }

        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Store is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating store from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            debug!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }

        Ok(())
    }

    /// Whether an article with this ID was recorded.
    pub async fn contains(&self, id: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM articles WHERE key = ?)")
            .bind(id.to_lowercase())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// The recorded snapshot of an article.
    pub async fn get(&self, id: &str) -> Result<Option<Article>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM articles WHERE key = ?")
            .bind(id.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        match value {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Number of recorded articles.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Middleware forwarding only articles the store has not seen.
pub struct Deduplicate {
    store: Store,
}

impl Deduplicate {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Look up `key`, forward when unseen and record on success.
    ///
    /// Runs inside the caller's open transaction.
    async fn process(
        &self,
        conn: &mut SqliteConnection,
        key: &str,
        article: Article,
        next: Next<'_>,
    ) -> Result<()> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM articles WHERE key = ?)")
            .bind(key)
            .fetch_one(&mut *conn)
            .await?;

        if exists {
            debug!("Skipping already delivered article {}", article.id);
            return Ok(());
        }

        let value = serde_json::to_string(&article)?;
        next.run(article).await?;

        sqlx::query("INSERT INTO articles (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Middleware for Deduplicate {
    async fn handle(
        &self,
        cancel: &CancellationToken,
        article: Article,
        next: Next<'_>,
    ) -> Result<()> {
        if article.id.is_empty() {
            return Err(FeedbotError::InvalidArticle(format!(
                "article {:?} has an empty ID",
                article.title
            )));
        }
        check_cancelled(cancel)?;

        let key = article.store_key();

        // IMMEDIATE takes the write lock up front, so two processes sharing
        // the file cannot both see the key as missing. Dropping the guard
        // without a commit rolls back and releases the lock.
        let mut tx = self.store.pool.begin_with("BEGIN IMMEDIATE").await?;
        self.process(&mut *tx, &key, article, next).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Wrap `feed` so each article reaches the consumer at most once.
pub fn use_store<F: Feed>(feed: F, store: Store) -> Wrap<F, Deduplicate> {
    wrap(feed, Deduplicate::new(store))
}
