//! Common error types for OPSD

use thiserror::Error;

/// Common result type for OPSD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across OPSD services
///
/// The resolution workflow depends on callers being able to discriminate
/// `NotFound` from `AlreadyResolved`: with multiple review channels running
/// at once, losing a resolve race is routine and must surface as a distinct
/// "already handled" condition rather than a generic failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error for stored payload columns
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resolution or proposal is already in a terminal state
    #[error("Already resolved: {0}")]
    AlreadyResolved(String),

    /// Invalid decision payload or request parameter
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A bounded transactional operation exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
