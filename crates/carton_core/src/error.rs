//! Error types for Carton core.

use crate::key::ContentKey;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Carton core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Volume backend error.
    #[error("volume error: {0}")]
    Volume(#[from] carton_storage::VolumeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream does not support seeking.
    #[error("stream does not support seeking: {0}")]
    Unseekable(#[source] io::Error),

    /// Content key not found in the store.
    #[error("content key not found: {key}")]
    KeyNotFound {
        /// The key that was looked up.
        key: ContentKey,
    },

    /// Name has no history in the archive.
    #[error("name not found: {name}")]
    NameNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// A recorded location cannot be satisfied by the volume.
    #[error("integrity violation: {message}")]
    Integrity {
        /// Description of the violation.
        message: String,
    },

    /// The index manifest is malformed.
    #[error("invalid manifest: {message}")]
    InvalidManifest {
        /// Description of the format issue.
        message: String,
    },
}

impl CoreError {
    /// Creates an unseekable-stream error from the failed seek.
    pub fn unseekable(source: io::Error) -> Self {
        Self::Unseekable(source)
    }

    /// Creates a key-not-found error.
    pub fn key_not_found(key: ContentKey) -> Self {
        Self::KeyNotFound { key }
    }

    /// Creates a name-not-found error.
    pub fn name_not_found(name: impl Into<String>) -> Self {
        Self::NameNotFound { name: name.into() }
    }

    /// Creates an integrity violation error.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Creates an invalid manifest error.
    pub fn invalid_manifest(message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            message: message.into(),
        }
    }
}
