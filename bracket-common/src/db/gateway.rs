//! Persistence gateway and driver contract
//!
//! Drivers expose four operations: a schema-existence check, schema
//! creation, a batch insert and a commit. A batch that is dropped without
//! `commit` leaves nothing behind, so a round is either stored whole or not
//! at all.

use super::models::PredictionRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Storage backend for prediction records
#[async_trait]
pub trait PredictionDriver: Send + Sync {
    /// Backend identifier for logs (e.g. "sqlite", "postgres")
    fn name(&self) -> &'static str;

    /// Check whether the predictions table exists
    async fn table_exists(&self) -> Result<bool>;

    /// Create the predictions table
    ///
    /// Must be a conditional create: succeeding when another session
    /// created the table first.
    async fn create_table(&self) -> Result<()>;

    /// Open a write batch
    async fn begin_batch(&self) -> Result<Box<dyn PendingBatch>>;

    /// Read back stored records, oldest first, optionally for one user
    async fn fetch_records(&self, username: Option<&str>) -> Result<Vec<PredictionRecord>>;
}

/// An open, uncommitted write batch
#[async_trait]
pub trait PendingBatch: Send {
    /// Stage records inside the batch
    async fn insert(&mut self, records: &[PredictionRecord]) -> Result<()>;

    /// Make every staged record visible at once
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Append-only writer for prediction records
#[derive(Clone)]
pub struct PersistenceGateway {
    driver: Arc<dyn PredictionDriver>,
}

impl PersistenceGateway {
    pub fn new(driver: Arc<dyn PredictionDriver>) -> Self {
        Self { driver }
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Guarantee the predictions table exists
    ///
    /// Safe to call at every session start.
    pub async fn ensure_schema(&self) -> Result<()> {
        if self.driver.table_exists().await? {
            debug!("Predictions table already present ({})", self.driver.name());
            return Ok(());
        }

        if let Err(e) = self.driver.create_table().await {
            // Another session may have won a concurrent first-time create
            if self.driver.table_exists().await? {
                debug!("Predictions table created concurrently: {}", e);
                return Ok(());
            }
            return Err(e);
        }
        info!("Created predictions table ({})", self.driver.name());
        Ok(())
    }

    /// Durably append a round's records as one batch
    ///
    /// Any failure is reported as `Error::Persistence` and nothing from the
    /// batch remains stored. Callers do not retry on their own.
    pub async fn record(&self, records: &[PredictionRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let write = async {
            let mut batch = self.driver.begin_batch().await?;
            batch.insert(records).await?;
            batch.commit().await?;
            Ok::<_, Error>(())
        };

        write.await.map_err(|e| match e {
            e @ Error::Persistence(_) => e,
            other => Error::Persistence(other.to_string()),
        })?;

        debug!(
            "Stored {} prediction(s) via {}",
            records.len(),
            self.driver.name()
        );
        Ok(())
    }

    /// Stored records, oldest first
    pub async fn history(&self, username: Option<&str>) -> Result<Vec<PredictionRecord>> {
        self.driver.fetch_records(username).await
    }
}
