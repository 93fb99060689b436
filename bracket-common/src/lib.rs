//! # Bracket Common Library
//!
//! Shared code for the bracket voting service including:
//! - Entrant list and matchup generation
//! - Bracket session state machine and event dispatch
//! - Prediction persistence gateway with interchangeable drivers
//! - Configuration loading
//! - Error types

pub mod bracket;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use bracket::{BracketEvent, BracketSession, BracketView, Entrant, Matchup, Phase};
pub use db::{PersistenceGateway, PredictionRecord};
pub use error::{Error, Result};
