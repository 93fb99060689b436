//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decided matchup, as stored
///
/// Append-only: rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub username: String,
    pub round: u32,
    /// "<entrant A> vs <entrant B>"
    #[serde(rename = "match")]
    pub match_label: String,
    pub winner: String,
    pub timestamp: DateTime<Utc>,
}
