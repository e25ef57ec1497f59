//! Error types for volume operations.

use std::io;
use thiserror::Error;

/// Result type for volume operations.
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Errors that can occur during volume operations.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the volume.
    #[error("read beyond end of volume: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current volume size.
        size: u64,
    },
}
