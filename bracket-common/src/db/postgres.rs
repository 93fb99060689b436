//! PostgreSQL prediction store
//!
//! Pooled network connection built from host/user/password/database
//! credentials.

use super::gateway::{PendingBatch, PredictionDriver};
use super::models::PredictionRecord;
use super::PREDICTIONS_TABLE;
use crate::config::PostgresCredentials;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::info;

pub struct PostgresDriver {
    pool: PgPool,
}

impl PostgresDriver {
    pub async fn connect(credentials: &PostgresCredentials) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.username)
            .password(&credentials.password)
            .database(&credentials.dbname);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        info!(
            "Connected to PostgreSQL {}:{}/{} as {}",
            credentials.host, credentials.port, credentials.dbname, credentials.username
        );

        Ok(Self { pool })
    }
}

fn to_db_round(round: u32) -> Result<i32> {
    i32::try_from(round).map_err(|_| Error::InvalidInput(format!("round {} out of range", round)))
}

#[async_trait]
impl PredictionDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn table_exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name = $1
            "#,
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
                id BIGSERIAL PRIMARY KEY,
                username VARCHAR(100) NOT NULL,
                round INTEGER NOT NULL CHECK (round >= 1),
                "match" VARCHAR(255) NOT NULL,
                winner VARCHAR(100) NOT NULL,
                "timestamp" TIMESTAMPTZ NOT NULL DEFAULT now()
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
        Ok(Box::new(PostgresBatch { tx }))
    }

    async fn fetch_records(&self, username: Option<&str>) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query_as::<_, (String, i32, String, String, DateTime<Utc>)>(
            r#"
            SELECT username, round, "match", winner, "timestamp"
            FROM predictions
            WHERE $1::TEXT IS NULL OR username = $1
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

struct PostgresBatch {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PendingBatch for PostgresBatch {
    async fn insert(&mut self, records: &[PredictionRecord]) -> Result<()> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO predictions (username, round, "match", winner, "timestamp")
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&record.username)
            .bind(to_db_round(record.round)?)
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
