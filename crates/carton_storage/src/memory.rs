//! Heap-backed volume.

use crate::backend::VolumeBackend;
use crate::error::{VolumeError, VolumeResult};
use parking_lot::RwLock;

/// A volume backed by a growable byte buffer.
///
/// Nothing is durable: the volume lives and dies with the process. That
/// makes it the backend of choice for unit tests and for ephemeral
/// archives that never touch disk.
///
/// `flush` and `sync` are accepted and do nothing, so code written
/// against [`VolumeBackend`] runs unchanged.
///
/// # Example
///
/// ```rust
/// use carton_storage::{VolumeBackend, InMemoryVolume};
///
/// let mut volume = InMemoryVolume::new();
/// assert_eq!(volume.append(b"foo").unwrap(), 0);
/// assert_eq!(volume.append(b"bartleby").unwrap(), 3);
/// assert_eq!(volume.read_at(3, 8).unwrap(), b"bartleby");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVolume {
    bytes: RwLock<Vec<u8>>,
}

impl InMemoryVolume {
    /// Creates an empty volume.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a volume whose bytes are already `bytes`, as if they had
    /// been appended earlier. Handy for simulating a reopen.
    #[must_use]
    pub fn with_data(bytes: Vec<u8>) -> Self {
        Self {
            bytes: RwLock::new(bytes),
        }
    }

    /// Returns a snapshot of the volume's full contents.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }
}

impl VolumeBackend for InMemoryVolume {
    fn read_at(&self, offset: u64, len: usize) -> VolumeResult<Vec<u8>> {
        let bytes = self.bytes.read();
        let size = bytes.len() as u64;
        let start = offset as usize;
        let end = start.saturating_add(len);

        if offset > size || end > bytes.len() {
            return Err(VolumeError::ReadPastEnd { offset, len, size });
        }

        Ok(bytes[start..end].to_vec())
    }

    fn append(&mut self, data: &[u8]) -> VolumeResult<u64> {
        let mut bytes = self.bytes.write();
        let offset = bytes.len() as u64;
        bytes.extend_from_slice(data);
        Ok(offset)
    }

    fn flush(&mut self) -> VolumeResult<()> {
        // Writes land in the buffer directly; nothing is buffered.
        Ok(())
    }

    fn size(&self) -> VolumeResult<u64> {
        Ok(self.bytes.read().len() as u64)
    }

    fn sync(&mut self) -> VolumeResult<()> {
        // No durability to establish.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let volume = InMemoryVolume::new();
        assert_eq!(volume.size().unwrap(), 0);
        assert!(volume.data().is_empty());
    }

    #[test]
    fn append_reports_the_range_start() {
        let mut volume = InMemoryVolume::new();

        assert_eq!(volume.append(b"foo").unwrap(), 0);
        assert_eq!(volume.append(b"bartleby").unwrap(), 3);
        assert_eq!(volume.size().unwrap(), 11);
    }

    #[test]
    fn read_at_returns_the_recorded_range() {
        let mut volume = InMemoryVolume::new();
        volume.append(b"foo").unwrap();
        volume.append(b"bartleby").unwrap();

        assert_eq!(volume.read_at(0, 3).unwrap(), b"foo");
        assert_eq!(volume.read_at(3, 8).unwrap(), b"bartleby");
    }

    #[test]
    fn read_outside_the_volume_is_an_error() {
        let mut volume = InMemoryVolume::new();
        volume.append(b"foo").unwrap();

        let result = volume.read_at(7, 2);
        assert!(matches!(result, Err(VolumeError::ReadPastEnd { .. })));
    }

    #[test]
    fn read_crossing_the_end_is_an_error() {
        let mut volume = InMemoryVolume::new();
        volume.append(b"bartleby").unwrap();

        let result = volume.read_at(5, 8);
        assert!(matches!(result, Err(VolumeError::ReadPastEnd { .. })));
    }

    #[test]
    fn zero_length_ranges_are_fine() {
        let mut volume = InMemoryVolume::new();

        assert_eq!(volume.append(b"").unwrap(), 0);
        assert_eq!(volume.size().unwrap(), 0);

        volume.append(b"foo").unwrap();
        assert!(volume.read_at(1, 0).unwrap().is_empty());
    }

    #[test]
    fn with_data_behaves_like_prior_appends() {
        let volume = InMemoryVolume::with_data(b"foobartleby".to_vec());
        assert_eq!(volume.size().unwrap(), 11);
        assert_eq!(volume.read_at(3, 8).unwrap(), b"bartleby");
    }

    #[test]
    fn memory_appends_are_contiguous() {
        let mut volume = InMemoryVolume::new();

        let mut expected_offset = 0u64;
        for chunk in [&b"foo"[..], b"bartleby", b"", b"x"] {
            let offset = volume.append(chunk).unwrap();
            assert_eq!(offset, expected_offset);
            expected_offset += chunk.len() as u64;
        }

        assert_eq!(volume.data(), b"foobartlebyx");
    }

    #[test]
    fn flush_and_sync_are_no_ops() {
        let mut volume = InMemoryVolume::new();
        volume.append(b"foo").unwrap();
        assert!(volume.flush().is_ok());
        assert!(volume.sync().is_ok());
        assert_eq!(volume.size().unwrap(), 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_appends_stay_contiguous(
                chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 0..32)
            ) {
                let mut volume = InMemoryVolume::new();
                let mut expected = Vec::new();

                for chunk in &chunks {
                    let offset = volume.append(chunk).unwrap();
                    prop_assert_eq!(offset, expected.len() as u64);
                    expected.extend_from_slice(chunk);
                }

                prop_assert_eq!(volume.size().unwrap(), expected.len() as u64);
                prop_assert_eq!(volume.read_at(0, expected.len()).unwrap(), expected);
            }
        }
    }
}
