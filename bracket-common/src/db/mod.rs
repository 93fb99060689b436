//! Prediction persistence
//!
//! [`PersistenceGateway`] is the only entry point the bracket logic uses.
//! Storage backends implement [`PredictionDriver`] and are interchangeable.

pub mod gateway;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod sqlite;

pub use gateway::{PendingBatch, PersistenceGateway, PredictionDriver};
pub use memory::MemoryDriver;
pub use models::PredictionRecord;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;

use crate::config::DatabaseConfig;
use crate::Result;
use std::sync::Arc;

/// Name of the predictions table in every SQL backend
pub const PREDICTIONS_TABLE: &str = "predictions";

/// Build the driver selected by configuration
pub async fn connect_driver(config: &DatabaseConfig) -> Result<Arc<dyn PredictionDriver>> {
    let driver: Arc<dyn PredictionDriver> = match config {
        DatabaseConfig::Sqlite { path } => Arc::new(SqliteDriver::open(path).await?),
        DatabaseConfig::Postgres(credentials) => {
            Arc::new(PostgresDriver::connect(credentials).await?)
        }
        DatabaseConfig::Memory => {
            tracing::warn!("Using in-memory prediction store; records are not durable");
            Arc::new(MemoryDriver::new())
        }
    };
    Ok(driver)
}
