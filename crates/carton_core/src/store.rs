//! Deduplicating key-to-bytes store.
//!
//! [`ContentStore`] is the append-only key-value layer: insertion and
//! lookup only, never update or delete. Including a key that is already
//! present is a silent success and performs no new write. Two backends are
//! provided: [`MemoryStore`] holds raw bytes in a map, [`VolumeStore`]
//! records `(offset, length)` locations into an append-only [`Volume`].

use crate::error::{CoreError, CoreResult};
use crate::key::{ByteSource, ContentKey};
use crate::manifest;
use crate::volume::{StoredLocation, Volume};
use carton_storage::{FileVolume, VolumeBackend};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Append-only key-value store over content keys.
///
/// # Invariants
///
/// - A key, once present, maps to an immutable value for the lifetime of
///   the store
/// - `include` with a duplicate key is a no-op, never an error
/// - `get` returns a fresh independent stream per call
pub trait ContentStore: Send + Sync {
    /// Stores the stream's content under `key`.
    ///
    /// The stream is rewound to its start before storing. If `key` is
    /// already present this is a silent success: the existing bytes are
    /// untouched and no duplicate write occurs.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be seeked or read, or if the
    /// underlying storage fails. A duplicate key is never an error.
    fn include(&mut self, key: &ContentKey, stream: &mut dyn ByteSource) -> CoreResult<()>;

    /// Returns a fresh readable stream over the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyNotFound`] if the key was never included,
    /// and [`CoreError::Integrity`] if the recorded bytes cannot be read
    /// back in full.
    fn get(&self, key: &ContentKey) -> CoreResult<Cursor<Vec<u8>>>;

    /// Returns whether `key` is present.
    fn has(&self, key: &ContentKey) -> bool;

    /// Returns the number of distinct keys stored.
    fn len(&self) -> usize;

    /// Returns whether the store holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn rewind(stream: &mut dyn ByteSource) -> CoreResult<()> {
    stream
        .seek(SeekFrom::Start(0))
        .map_err(CoreError::unseekable)?;
    Ok(())
}

/// An in-memory content store.
///
/// Stores raw bytes directly in a map. Suitable for tests and ephemeral
/// archives; every `get` wraps a copy of the stored bytes so repeated
/// independent reads are supported.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<ContentKey, Vec<u8>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryStore {
    fn include(&mut self, key: &ContentKey, stream: &mut dyn ByteSource) -> CoreResult<()> {
        if self.entries.contains_key(key) {
            debug!(key = %key, "duplicate include, content already stored");
            return Ok(());
        }

        rewind(stream)?;
        let mut content = Vec::new();
        stream.read_to_end(&mut content)?;

        debug!(key = %key, length = content.len(), "stored content in memory");
        self.entries.insert(*key, content);
        Ok(())
    }

    fn get(&self, key: &ContentKey) -> CoreResult<Cursor<Vec<u8>>> {
        self.entries
            .get(key)
            .cloned()
            .map(Cursor::new)
            .ok_or_else(|| CoreError::key_not_found(*key))
    }

    fn has(&self, key: &ContentKey) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A volume-backed content store.
///
/// Physical bytes live in an append-only [`Volume`]; the store records
/// only `key -> (offset, length)` in an in-memory index. The index is
/// consulted before any volume write, which is what guarantees the
/// at-most-once-per-key append invariant.
///
/// The index itself is not durable. Use [`VolumeStore::save_manifest`] and
/// [`VolumeStore::open_with_manifest`] to carry it across restarts.
#[derive(Debug)]
pub struct VolumeStore {
    volume: Volume,
    index: HashMap<ContentKey, StoredLocation>,
}

impl VolumeStore {
    /// Creates a volume store over a fresh backend with an empty index.
    pub fn new(backend: Box<dyn VolumeBackend>) -> Self {
        Self {
            volume: Volume::new(backend),
            index: HashMap::new(),
        }
    }

    /// Creates a volume store over an existing backend with a recovered
    /// index.
    pub fn with_index(
        backend: Box<dyn VolumeBackend>,
        index: HashMap<ContentKey, StoredLocation>,
    ) -> Self {
        Self {
            volume: Volume::new(backend),
            index,
        }
    }

    /// Opens a file-backed store, recovering its index from a manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume file cannot be opened or the
    /// manifest is missing or malformed.
    pub fn open_with_manifest(volume_path: &Path, manifest_path: &Path) -> CoreResult<Self> {
        let backend = FileVolume::open(volume_path)?;
        let index = manifest::read_manifest(manifest_path)?;
        debug!(
            volume = %volume_path.display(),
            entries = index.len(),
            "opened volume store from manifest"
        );
        Ok(Self::with_index(Box::new(backend), index))
    }

    /// Writes the current index to a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be written.
    pub fn save_manifest(&self, path: &Path) -> CoreResult<()> {
        manifest::write_manifest(path, &self.index)
    }

    /// Returns the recorded location for `key`, if present.
    #[must_use]
    pub fn location(&self, key: &ContentKey) -> Option<StoredLocation> {
        self.index.get(key).copied()
    }

    /// Returns the total size of the underlying volume in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn volume_size(&self) -> CoreResult<u64> {
        self.volume.size()
    }

    /// Flushes buffered volume writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.volume.flush()
    }
}

impl ContentStore for VolumeStore {
    fn include(&mut self, key: &ContentKey, stream: &mut dyn ByteSource) -> CoreResult<()> {
        // Index check before any volume write: at most one append per key.
        if self.index.contains_key(key) {
            debug!(key = %key, "duplicate include, content already stored");
            return Ok(());
        }

        rewind(stream)?;
        let location = self.volume.append(key, stream)?;

        debug!(
            key = %key,
            offset = location.offset,
            length = location.length,
            "stored content in volume"
        );
        self.index.insert(*key, location);
        Ok(())
    }

    fn get(&self, key: &ContentKey) -> CoreResult<Cursor<Vec<u8>>> {
        let location = self
            .index
            .get(key)
            .copied()
            .ok_or_else(|| CoreError::key_not_found(*key))?;

        let bytes = self.volume.read_at(location)?;
        Ok(Cursor::new(bytes))
    }

    fn has(&self, key: &ContentKey) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::derive_key;
    use carton_storage::InMemoryVolume;

    fn key_of(bytes: &[u8]) -> ContentKey {
        derive_key(&mut Cursor::new(bytes.to_vec())).unwrap()
    }

    fn read_all(mut stream: Cursor<Vec<u8>>) -> Vec<u8> {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn memory_include_and_get() {
        let mut store = MemoryStore::new();
        let key = key_of(b"hello");

        store
            .include(&key, &mut Cursor::new(b"hello".to_vec()))
            .unwrap();

        assert!(store.has(&key));
        assert_eq!(store.len(), 1);
        assert_eq!(read_all(store.get(&key).unwrap()), b"hello");
    }

    #[test]
    fn memory_get_absent_key_fails() {
        let store = MemoryStore::new();
        let result = store.get(&key_of(b"missing"));
        assert!(matches!(result, Err(CoreError::KeyNotFound { .. })));
    }

    #[test]
    fn memory_get_returns_independent_streams() {
        let mut store = MemoryStore::new();
        let key = key_of(b"shared");
        store
            .include(&key, &mut Cursor::new(b"shared".to_vec()))
            .unwrap();

        let mut first = store.get(&key).unwrap();
        let mut drained = Vec::new();
        first.read_to_end(&mut drained).unwrap();

        // A second get starts fresh even though the first was drained.
        assert_eq!(read_all(store.get(&key).unwrap()), b"shared");
    }

    #[test]
    fn memory_duplicate_include_keeps_original() {
        let mut store = MemoryStore::new();
        let key = key_of(b"original");

        store
            .include(&key, &mut Cursor::new(b"original".to_vec()))
            .unwrap();
        // Same key, different bytes: the original value must be untouched.
        store
            .include(&key, &mut Cursor::new(b"impostor".to_vec()))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(read_all(store.get(&key).unwrap()), b"original");
    }

    #[test]
    fn memory_include_rewinds_stream() {
        let mut store = MemoryStore::new();
        let key = key_of(b"full content");

        let mut stream = Cursor::new(b"full content".to_vec());
        stream.set_position(5);
        store.include(&key, &mut stream).unwrap();

        assert_eq!(read_all(store.get(&key).unwrap()), b"full content");
    }

    #[test]
    fn volume_include_and_get() {
        let mut store = VolumeStore::new(Box::new(InMemoryVolume::new()));
        let key = key_of(b"hello");

        store
            .include(&key, &mut Cursor::new(b"hello".to_vec()))
            .unwrap();

        assert!(store.has(&key));
        assert_eq!(store.len(), 1);
        assert_eq!(store.location(&key), Some(StoredLocation::new(0, 5)));
        assert_eq!(read_all(store.get(&key).unwrap()), b"hello");
    }

    #[test]
    fn volume_get_absent_key_fails() {
        let store = VolumeStore::new(Box::new(InMemoryVolume::new()));
        let result = store.get(&key_of(b"missing"));
        assert!(matches!(result, Err(CoreError::KeyNotFound { .. })));
    }

    #[test]
    fn volume_duplicate_include_does_not_grow_volume() {
        let mut store = VolumeStore::new(Box::new(InMemoryVolume::new()));
        let key = key_of(b"once");

        store
            .include(&key, &mut Cursor::new(b"once".to_vec()))
            .unwrap();
        let size_after_first = store.volume_size().unwrap();

        store
            .include(&key, &mut Cursor::new(b"once".to_vec()))
            .unwrap();
        assert_eq!(store.volume_size().unwrap(), size_after_first);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn volume_locations_are_contiguous() {
        let mut store = VolumeStore::new(Box::new(InMemoryVolume::new()));

        let foo = key_of(b"foo");
        let bartleby = key_of(b"bartleby");

        store
            .include(&foo, &mut Cursor::new(b"foo".to_vec()))
            .unwrap();
        store
            .include(&bartleby, &mut Cursor::new(b"bartleby".to_vec()))
            .unwrap();

        assert_eq!(store.location(&foo), Some(StoredLocation::new(0, 3)));
        assert_eq!(store.location(&bartleby), Some(StoredLocation::new(3, 8)));
        assert_eq!(store.volume_size().unwrap(), 11);
    }

    #[test]
    fn volume_get_is_bounded_to_recorded_length() {
        let mut store = VolumeStore::new(Box::new(InMemoryVolume::new()));

        let foo = key_of(b"foo");
        let bar = key_of(b"bar");
        store
            .include(&foo, &mut Cursor::new(b"foo".to_vec()))
            .unwrap();
        store
            .include(&bar, &mut Cursor::new(b"bar".to_vec()))
            .unwrap();

        // Neither read bleeds into the neighboring range.
        assert_eq!(read_all(store.get(&foo).unwrap()), b"foo");
        assert_eq!(read_all(store.get(&bar).unwrap()), b"bar");
    }

    #[test]
    fn volume_reset_index_reports_integrity_on_bad_location() {
        let mut store = VolumeStore::new(Box::new(InMemoryVolume::new()));
        let key = key_of(b"data");
        store
            .include(&key, &mut Cursor::new(b"data".to_vec()))
            .unwrap();

        // Simulate a recovered index pointing past the volume end.
        let mut bad_index = HashMap::new();
        bad_index.insert(key, StoredLocation::new(100, 4));
        let broken = VolumeStore::with_index(Box::new(InMemoryVolume::new()), bad_index);

        let result = broken.get(&key);
        assert!(matches!(result, Err(CoreError::Integrity { .. })));
    }

    #[test]
    fn volume_flush_succeeds() {
        let mut store = VolumeStore::new(Box::new(InMemoryVolume::new()));
        let key = key_of(b"data");
        store
            .include(&key, &mut Cursor::new(b"data".to_vec()))
            .unwrap();
        assert!(store.flush().is_ok());
    }
}
