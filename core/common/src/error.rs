//! Common error types for coffer.

use thiserror::Error;

/// Top-level error type for coffer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A field or construction argument was malformed (empty label, wrong
    /// salt or nonce length, ...). Nothing was changed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Tag verification failed while decrypting.
    ///
    /// Wrong passphrase and corrupted or tampered data are deliberately
    /// indistinguishable.
    #[error("Authentication failed: wrong passphrase or corrupted data")]
    Authentication,

    /// The container is not valid JSON, misses required keys or names an
    /// unknown key-derivation or cipher scheme.
    #[error("Format error: {0}")]
    Format(String),

    /// Cryptographic primitive could not be constructed or run.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Serialization or deserialization of the tree failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
