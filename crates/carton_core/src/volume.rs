//! Append-only volume wrapper.
//!
//! [`Volume`] turns an opaque [`VolumeBackend`] into the unit the store
//! layer works with: a chunked transfer from a reader that yields a
//! verifiable `(offset, length)` location. The volume never overwrites and
//! carries no embedded framing; the index above it is the only record of
//! where one piece of content ends and the next begins.

use crate::error::{CoreError, CoreResult};
use crate::key::{ByteSource, ContentKey};
use carton_storage::{VolumeBackend, VolumeError};
use std::io::Read;
use tracing::trace;

/// Chunk size used when copying a reader into the volume.
const COPY_CHUNK: usize = 8192;

/// A contiguous byte range within a volume.
///
/// Locations are created once per stored content and never mutated.
/// Ranges returned by successive appends ascend and never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoredLocation {
    /// Starting offset within the volume.
    pub offset: u64,
    /// Number of bytes stored.
    pub length: u64,
}

impl StoredLocation {
    /// Creates a stored location.
    #[must_use]
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Returns the offset one past the last byte of the range.
    #[must_use]
    pub const fn end(self) -> u64 {
        self.offset + self.length
    }
}

/// An append-only binary container over a [`VolumeBackend`].
///
/// `append` is unconditional: deduplication is the responsibility of the
/// store layer, which consults its index before ever touching the volume.
pub struct Volume {
    backend: Box<dyn VolumeBackend>,
}

impl Volume {
    /// Creates a volume over the given backend.
    pub fn new(backend: Box<dyn VolumeBackend>) -> Self {
        Self { backend }
    }

    /// Appends the reader's remaining content to the physical end of the
    /// volume.
    ///
    /// Reads from the reader's current position; callers that want the full
    /// content are responsible for rewinding first. The key identifies the
    /// content for diagnostics and future embedded indexing; the append
    /// itself is unconditional.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the reader or writing to the
    /// backend fails.
    pub fn append(
        &mut self,
        key: &ContentKey,
        reader: &mut dyn ByteSource,
    ) -> CoreResult<StoredLocation> {
        let offset = self.backend.size()?;
        let mut length = 0u64;
        let mut buf = [0u8; COPY_CHUNK];

        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.backend.append(&buf[..n])?;
            length += n as u64;
        }

        trace!(key = %key, offset, length, "appended content to volume");
        Ok(StoredLocation { offset, length })
    }

    /// Reads back the bytes recorded at a location.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Integrity`] if the recorded range cannot be
    /// satisfied by the backend (e.g. a truncated volume file), and the
    /// backend's error for any other I/O failure.
    pub fn read_at(&self, location: StoredLocation) -> CoreResult<Vec<u8>> {
        match self.backend.read_at(location.offset, location.length as usize) {
            Ok(bytes) => Ok(bytes),
            Err(VolumeError::ReadPastEnd { offset, len, size }) => Err(CoreError::integrity(
                format!("recorded range ({offset}, {len}) exceeds volume size {size}"),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Flushes buffered writes down to the backend's durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend flush fails.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.backend.flush()?;
        Ok(())
    }

    /// Syncs data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend sync fails.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    /// Returns the total size of the volume in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?)
    }
}

impl std::fmt::Debug for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("size", &self.backend.size().ok())
            .finish_non_exhaustive()
    }
}
