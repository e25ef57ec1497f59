//! Volume backend trait definition.

use crate::error::VolumeResult;

/// A low-level append-only volume backend for Carton.
///
/// Volume backends are **opaque byte stores**. They provide simple
/// operations for appending, reading back, and flushing data. The layers
/// above own all interpretation - backends do not understand content keys,
/// stored locations, or name histories.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - Offsets returned by successive appends strictly ascend; ranges never
///   overlap and are never reused
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `flush` ensures all appended data is durable
/// - There is no overwrite, update, or delete operation
/// - Backends must be `Send + Sync` for shared access
///
/// # Implementors
///
/// - [`super::InMemoryVolume`] - For testing
/// - [`super::FileVolume`] - For persistent storage
pub trait VolumeBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The offset is beyond the current size
    /// - The read would extend beyond the current size
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> VolumeResult<Vec<u8>>;

    /// Appends data to the end of the volume.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> VolumeResult<u64>;

    /// Flushes all pending writes to durable storage.
    ///
    /// After this returns successfully, all previously appended data
    /// is guaranteed to survive process termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> VolumeResult<()>;

    /// Returns the current size of the volume in bytes.
    ///
    /// This is the offset where the next `append` will write.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> VolumeResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// This is a stronger guarantee than `flush` - it ensures that
    /// file metadata (size, timestamps) is also durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> VolumeResult<()>;
}
