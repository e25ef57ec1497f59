//! Index manifest persistence.
//!
//! A volume's bytes are durable but its key-to-location index lives in
//! memory; without a recovery artifact, a restart would strand stored
//! content. The manifest is that artifact: a sidecar file holding the
//! index as fixed-width triples.
//!
//! ## Format
//!
//! ```text
//! ManifestFile {
//!     magic: [0x43, 0x56, 0x49, 0x58]  // "CVIX"
//!     version: u8
//!     entry_count: u64 (big-endian)
//!     entries: [(key: 32 bytes, offset: u64 BE, length: u64 BE)]
//! }
//! ```
//!
//! Entries are sorted by key so that equal indexes encode to identical
//! bytes.
//!
//! ## Invariants
//!
//! - The volume is the source of truth; the manifest is a recovery
//!   artifact and never alters volume bytes
//! - A corrupt or truncated manifest is a reportable error, not a silent
//!   partial recovery

use crate::error::{CoreError, CoreResult};
use crate::key::{ContentKey, KEY_LEN};
use crate::volume::StoredLocation;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Magic bytes for manifest files: "CVIX"
const MANIFEST_MAGIC: [u8; 4] = [0x43, 0x56, 0x49, 0x58];

/// Current manifest format version.
const MANIFEST_VERSION: u8 = 1;

/// Fixed header length: magic + version + entry count.
const HEADER_LEN: usize = 4 + 1 + 8;

/// Fixed length of one entry: key + offset + length.
const ENTRY_LEN: usize = KEY_LEN + 8 + 8;

/// Serializes an index to manifest bytes.
#[must_use]
pub fn encode_manifest(index: &HashMap<ContentKey, StoredLocation>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + index.len() * ENTRY_LEN);

    buf.extend_from_slice(&MANIFEST_MAGIC);
    buf.push(MANIFEST_VERSION);
    buf.extend_from_slice(&(index.len() as u64).to_be_bytes());

    let mut entries: Vec<_> = index.iter().collect();
    entries.sort_by_key(|&(key, _)| *key);

    for (key, location) in entries {
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(&location.offset.to_be_bytes());
        buf.extend_from_slice(&location.length.to_be_bytes());
    }

    buf
}

/// Deserializes manifest bytes back into an index.
///
/// # Errors
///
/// Returns [`CoreError::InvalidManifest`] if the magic, version, or
/// framing does not match the format.
pub fn decode_manifest(data: &[u8]) -> CoreResult<HashMap<ContentKey, StoredLocation>> {
    if data.len() < HEADER_LEN {
        return Err(CoreError::invalid_manifest("manifest file too small"));
    }

    if data[0..4] != MANIFEST_MAGIC {
        return Err(CoreError::invalid_manifest("invalid manifest magic"));
    }

    let version = data[4];
    if version != MANIFEST_VERSION {
        return Err(CoreError::invalid_manifest(format!(
            "unsupported manifest version: {version}"
        )));
    }

    let count_bytes: [u8; 8] = data[5..13]
        .try_into()
        .map_err(|_| CoreError::invalid_manifest("truncated entry count"))?;
    let count = u64::from_be_bytes(count_bytes);

    // The count is untrusted input; reject anything the file cannot
    // possibly hold before computing the expected length.
    if count > ((data.len() - HEADER_LEN) / ENTRY_LEN) as u64 {
        return Err(CoreError::invalid_manifest(format!(
            "entry count {count} exceeds manifest size {}",
            data.len()
        )));
    }
    let count = count as usize;

    let expected_len = HEADER_LEN + count * ENTRY_LEN;
    if data.len() != expected_len {
        return Err(CoreError::invalid_manifest(format!(
            "expected {expected_len} bytes for {count} entries, got {}",
            data.len()
        )));
    }

    let mut index = HashMap::with_capacity(count);
    let mut pos = HEADER_LEN;

    for _ in 0..count {
        let key = ContentKey::from_slice(&data[pos..pos + KEY_LEN])
            .ok_or_else(|| CoreError::invalid_manifest("truncated key"))?;
        pos += KEY_LEN;

        let offset_bytes: [u8; 8] = data[pos..pos + 8]
            .try_into()
            .map_err(|_| CoreError::invalid_manifest("truncated offset"))?;
        let offset = u64::from_be_bytes(offset_bytes);
        pos += 8;

        let length_bytes: [u8; 8] = data[pos..pos + 8]
            .try_into()
            .map_err(|_| CoreError::invalid_manifest("truncated length"))?;
        let length = u64::from_be_bytes(length_bytes);
        pos += 8;

        if index.insert(key, StoredLocation { offset, length }).is_some() {
            return Err(CoreError::invalid_manifest(format!(
                "duplicate key in manifest: {key}"
            )));
        }
    }

    Ok(index)
}

/// Writes an index manifest to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_manifest(path: &Path, index: &HashMap<ContentKey, StoredLocation>) -> CoreResult<()> {
    fs::write(path, encode_manifest(index))?;
    debug!(path = %path.display(), entries = index.len(), "wrote index manifest");
    Ok(())
}

/// Reads an index manifest from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed.
pub fn read_manifest(path: &Path) -> CoreResult<HashMap<ContentKey, StoredLocation>> {
    let data = fs::read(path)?;
    decode_manifest(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> HashMap<ContentKey, StoredLocation> {
        let mut index = HashMap::new();
        index.insert(ContentKey::from_bytes([1u8; 32]), StoredLocation::new(0, 3));
        index.insert(ContentKey::from_bytes([2u8; 32]), StoredLocation::new(3, 8));
        index.insert(
            ContentKey::from_bytes([0xFF; 32]),
            StoredLocation::new(11, 1024),
        );
        index
    }

    #[test]
    fn roundtrip() {
        let index = sample_index();
        let decoded = decode_manifest(&encode_manifest(&index)).unwrap();
        assert_eq!(decoded, index);
    }

    #[test]
    fn empty_index_roundtrips() {
        let index = HashMap::new();
        let encoded = encode_manifest(&index);
        assert_eq!(encoded.len(), HEADER_LEN);
        assert_eq!(decode_manifest(&encoded).unwrap(), index);
    }

    #[test]
    fn encoding_is_deterministic() {
        let index = sample_index();
        assert_eq!(encode_manifest(&index), encode_manifest(&index));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut encoded = encode_manifest(&sample_index());
        encoded[0] = b'X';
        let result = decode_manifest(&encoded);
        assert!(matches!(result, Err(CoreError::InvalidManifest { .. })));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut encoded = encode_manifest(&sample_index());
        encoded[4] = 99;
        let result = decode_manifest(&encoded);
        assert!(matches!(result, Err(CoreError::InvalidManifest { .. })));
    }

    #[test]
    fn rejects_truncated_file() {
        let encoded = encode_manifest(&sample_index());
        let result = decode_manifest(&encoded[..encoded.len() - 1]);
        assert!(matches!(result, Err(CoreError::InvalidManifest { .. })));

        let result = decode_manifest(&encoded[..HEADER_LEN - 2]);
        assert!(matches!(result, Err(CoreError::InvalidManifest { .. })));
    }

    #[test]
    fn rejects_entry_count_larger_than_the_file() {
        // Header-only manifest claiming an absurd number of entries. The
        // decoder must report this, not overflow while sizing the payload.
        let mut encoded = Vec::new();
        encoded.extend_from_slice(&MANIFEST_MAGIC);
        encoded.push(MANIFEST_VERSION);
        encoded.extend_from_slice(&(1u64 << 60).to_be_bytes());

        let result = decode_manifest(&encoded);
        assert!(matches!(result, Err(CoreError::InvalidManifest { .. })));
    }

    #[test]
    fn rejects_count_inflated_past_the_payload() {
        let index = sample_index();
        let mut encoded = encode_manifest(&index);
        // Claim one more entry than the payload holds.
        encoded[5..13].copy_from_slice(&(index.len() as u64 + 1).to_be_bytes());

        let result = decode_manifest(&encoded);
        assert!(matches!(result, Err(CoreError::InvalidManifest { .. })));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let mut encoded = encode_manifest(&sample_index());
        encoded.push(0);
        let result = decode_manifest(&encoded);
        assert!(matches!(result, Err(CoreError::InvalidManifest { .. })));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.manifest");

        let index = sample_index();
        write_manifest(&path, &index).unwrap();
        assert_eq!(read_manifest(&path).unwrap(), index);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_manifest(&dir.path().join("absent.manifest"));
        assert!(matches!(result, Err(CoreError::Io(_))));
    }
}
