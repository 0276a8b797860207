//! Database error types.

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The creator is over the reminder quota, by count or by text size.
    #[error("reminder quota exceeded")]
    QuotaExceeded,

    /// The due instant is essentially now and not worth scheduling.
    #[error("due instant is too close to now")]
    TooSoon,
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
