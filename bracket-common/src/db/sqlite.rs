//! SQLite prediction store
//!
//! File database under the service's root folder. WAL journaling lets
//! history reads proceed while a round is being written.

use super::gateway::{PendingBatch, PredictionDriver};
use super::models::PredictionRecord;
use super::PREDICTIONS_TABLE;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout; rounds are tiny so contention clears quickly
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Open (creating if needed) the database file at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl PredictionDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn table_exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(PREDICTIONS_TABLE)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn create_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                round INTEGER NOT NULL CHECK (round >= 1),
                "match" TEXT NOT NULL,
                winner TEXT NOT NULL,
                "timestamp" TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_predictions_username ON predictions(username)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn begin_batch(&self) -> Result<Box<dyn PendingBatch>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteBatch { tx }))
    }

    async fn fetch_records(&self, username: Option<&str>) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query_as::<_, (String, i64, String, String, DateTime<Utc>)>(
            r#"
            SELECT username, round, "match", winner, "timestamp"
            FROM predictions
            WHERE ?1 IS NULL OR username = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(username, round, match_label, winner, timestamp)| {
                Ok(PredictionRecord {
                    username,
                    round: u32::try_from(round)
                        .map_err(|_| Error::InvalidInput(format!("stored round {} out of range", round)))?,
                    match_label,
                    winner,
                    timestamp,
                })
            })
            .collect()
    }
}

/// Open transaction; rolled back by sqlx if dropped before commit
struct SqliteBatch {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl PendingBatch for SqliteBatch {
    async fn insert(&mut self, records: &[PredictionRecord]) -> Result<()> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO predictions (username, round, "match", winner, "timestamp")
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.username)
            .bind(i64::from(record.round))
            .bind(&record.match_label)
            .bind(&record.winner)
            .bind(record.timestamp)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
