//! Common error types for the bracket service

use thiserror::Error;

/// Common result type for bracket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the state machine, gateway and configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected user selection; session state is unchanged
    #[error("Invalid selection: {0}")]
    Selection(String),

    /// Internal invariant violation (e.g. odd-length matchup input)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Event not accepted in the session's current phase
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Durable write failed; the round was not advanced
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
