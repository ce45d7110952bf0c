//! Common error types for ClipScore

use thiserror::Error;

/// Common result type for ClipScore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ClipScore services
///
/// Business-rule rejections (watch time, duplicate, coherence) are NOT errors;
/// they are returned as values by the submission pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Persistence failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required policy or bootstrap configuration absent or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session missing, not owned by the caller, or no longer in `draft`
    #[error("Session state error: {0}")]
    SessionState(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Write refused because it conflicts with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for transient SQLite lock contention the caller may retry
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Database(db_err) => {
                let msg = db_err.to_string();
                msg.contains("database is locked") || msg.contains("database is busy")
            }
            _ => false,
        }
    }

    /// True when a unique index rejected the write
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_transient() {
        assert!(!Error::Config("missing".to_string()).is_transient());
        assert!(!Error::SessionState("validated".to_string()).is_transient());
        assert!(!Error::InvalidInput("bad".to_string()).is_unique_violation());
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        let err = Error::Database(sqlx::Error::RowNotFound);
        assert!(!err.is_transient());
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::SessionState("session abc is validated".to_string());
        assert_eq!(err.to_string(), "Session state error: session abc is validated");
    }
}
