//! Error types for tagstore
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for tagstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for tagstore
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, network, etc.)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Serialization error while encoding a value
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Stored bytes could not be decompressed or decoded
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Generation mismatch on a conditional write
    #[error("Generation mismatch: expected {expected}, got {actual}")]
    GenerationMismatch {
        /// Generation the writer read
        expected: u32,
        /// Generation currently stored
        actual: u32,
    },

    /// Create-only write found an existing record
    #[error("Key already exists: {0}")]
    KeyExists(String),

    /// Store connectivity, timeout or any other store-side failure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Caller supplied a malformed argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Conditional write kept losing the race past the configured cap
    #[error("Retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Number of write attempts made
        attempts: usize,
    },
}

impl Error {
    /// Whether this error is a lost optimistic-concurrency race.
    ///
    /// Conflicts are recovered locally by re-reading and retrying; every
    /// other error is propagated to the caller.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::GenerationMismatch { .. } | Error::KeyExists(_)
        )
    }

    /// Shorthand for [`Error::InvalidInput`]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Shorthand for [`Error::StoreUnavailable`]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Error::StoreUnavailable(msg.into())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Corruption(e.to_string())
    }
}
