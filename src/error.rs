//! Error types for the limiter.

use thiserror::Error;

/// Main error type for limiter operations.
#[derive(Error, Debug)]
pub enum LimiterError {
    /// A policy with a zero request ceiling or a zero-length window
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Identifier was empty or whitespace only
    #[error("Identifier must not be empty")]
    EmptyIdentifier,

    /// No policy registered under the requested name
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for limiter operations.
pub type Result<T> = std::result::Result<T, LimiterError>;
