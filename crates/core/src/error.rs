//! Error types for blobsync-core
//!
//! One error type covers local path problems, account identity problems and
//! remote storage failures, so single-item operations can propagate whatever
//! the store reports without rewrapping.

use thiserror::Error;

/// Result type alias for blobsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for blobsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file or value error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local path does not exist or has the wrong kind
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Malformed account identity
    #[error("Invalid credentials: {0}")]
    Credential(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Blob key filter pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Container or blob absent where required
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote call failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether the error reports a missing container or blob
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Classify a backend error message the way S3-compatible services word them
    pub fn from_storage_message(message: impl Into<String>, subject: &str) -> Self {
        let message = message.into();
        if message.contains("NotFound")
            || message.contains("NoSuchKey")
            || message.contains("NoSuchBucket")
        {
            Error::NotFound(subject.to_string())
        } else {
            Error::Storage(message)
        }
    }
}
