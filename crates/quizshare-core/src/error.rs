//! Error types for quizshare-core

use thiserror::Error;

/// Result type alias using quizshare-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by callers to pick a fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout or unreachable network
    Connectivity,
    /// Remote side explicitly reported failure
    Server,
    /// Record absent in every tier
    NotFound,
    /// Missing or malformed user input
    Validation,
    /// Local persistence, I/O or configuration failure
    Storage,
}

/// Errors that can occur in quizshare-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Network unreachable or request timed out
    #[error("Connection failed: {0}")]
    Connectivity(String),

    /// Server answered but reported failure
    #[error("Server error: {0}")]
    Server(String),

    /// Record not found
    #[error("Quiz not found: {0}")]
    NotFound(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::Server(_) => ErrorKind::Server,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Database(_)
            | Self::Sqlite(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Config(_) => ErrorKind::Storage,
        }
    }

    /// Whether the fallback chain (retry, cache, offline) should handle this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connectivity | ErrorKind::Server)
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Server(format!("invalid response body: {error}"))
        } else if error.is_timeout() {
            Self::Connectivity(format!("request timed out: {error}"))
        } else {
            Self::Connectivity(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_recoverable() {
        assert!(Error::Connectivity("timeout".into()).is_recoverable());
        assert!(Error::Server("success=false".into()).is_recoverable());
        assert!(!Error::NotFound("abc".into()).is_recoverable());
        assert!(!Error::Validation("user name".into()).is_recoverable());
    }

    #[test]
    fn storage_errors_classify_as_storage() {
        let error = Error::Database("locked".into());
        assert_eq!(error.kind(), ErrorKind::Storage);
        assert!(!error.is_recoverable());
    }
}
