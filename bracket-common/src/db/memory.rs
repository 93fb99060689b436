//! In-memory prediction store
//!
//! Non-durable. Used for dry runs and tests; commit failures can be
//! injected to exercise the retry path.

use super::gateway::{PendingBatch, PredictionDriver};
use super::models::PredictionRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryStore {
    table_created: bool,
    create_calls: usize,
    fail_commits: bool,
    rows: Vec<PredictionRecord>,
}

/// Shared handle to an in-memory table; clones see the same rows
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail until switched off
    pub fn fail_commits(&self, fail: bool) {
        self.store().fail_commits = fail;
    }

    pub fn row_count(&self) -> usize {
        self.store().rows.len()
    }

    pub fn rows(&self) -> Vec<PredictionRecord> {
        self.store().rows.clone()
    }

    /// Number of times the table was actually created
    pub fn create_calls(&self) -> usize {
        self.store().create_calls
    }

    fn store(&self) -> MutexGuard<'_, MemoryStore> {
        lock(&self.store)
    }
}

fn lock(store: &Mutex<MemoryStore>) -> MutexGuard<'_, MemoryStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl PredictionDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn table_exists(&self) -> Result<bool> {
        Ok(self.store().table_created)
    }

    async fn create_table(&self) -> Result<()> {
        let mut store = self.store();
        if !store.table_created {
            store.table_created = true;
            store.create_calls += 1;
        }
        Ok(())
    }

    async fn begin_batch(&self) -> Result<Box<dyn PendingBatch>> {
        Ok(Box::new(MemoryBatch {
            store: Arc::clone(&self.store),
            staged: Vec::new(),
        }))
    }

    async fn fetch_records(&self, username: Option<&str>) -> Result<Vec<PredictionRecord>> {
        Ok(self
            .store()
            .rows
            .iter()
            .filter(|r| username.map_or(true, |u| r.username == u))
            .cloned()
            .collect())
    }
}

struct MemoryBatch {
    store: Arc<Mutex<MemoryStore>>,
    staged: Vec<PredictionRecord>,
}

#[async_trait]
impl PendingBatch for MemoryBatch {
    async fn insert(&mut self, records: &[PredictionRecord]) -> Result<()> {
        if !lock(&self.store).table_created {
            return Err(Error::Persistence(
                "predictions table does not exist".to_string(),
            ));
        }
        self.staged.extend_from_slice(records);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryBatch { store: shared, staged } = *self;
        let mut store = lock(&shared);
        if store.fail_commits {
            return Err(Error::Persistence("commit rejected by store".to_string()));
        }
        store.rows.extend(staged);
        Ok(())
    }
}
