//! Error types for journeylog.

use thiserror::Error;

/// Common error type for journeylog.
#[derive(Error, Debug)]
pub enum JourneyError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    ///
    /// Raised at startup, for example when a production deployment has no
    /// signing secret.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for journeylog operations.
pub type Result<T> = std::result::Result<T, JourneyError>;
