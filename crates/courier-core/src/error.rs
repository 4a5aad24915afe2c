//! Error types for core domain operations.
//!
//! Covers construction of domain values from untrusted input. Ingestion has
//! its own error type in [`crate::ingest`] because it also carries file
//! positions.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for domain value construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Destination string is not an absolute HTTP(S) URL.
    #[error("invalid destination '{raw}': {reason}")]
    InvalidDestination {
        /// The rejected input, trimmed
        raw: String,
        /// Why the input was rejected
        reason: String,
    },
}

impl CoreError {
    /// Creates an invalid destination error.
    pub fn invalid_destination(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDestination { raw: raw.into(), reason: reason.into() }
    }
}
