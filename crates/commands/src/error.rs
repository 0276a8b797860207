//! Command handling error types.

use thiserror::Error;

/// Infrastructure failures while handling a command.
///
/// User-correctable outcomes never appear here; they are rendered as reply
/// text by the handler.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Storage error from the persistence layer.
    #[error("database error: {0}")]
    Database(#[from] database::DatabaseError),
}
