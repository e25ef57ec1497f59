//! Content key derivation.
//!
//! A content key is the SHA-256 digest of a stream's full byte content.
//! Derivation never disturbs the caller's read position: the position at
//! entry is recorded, the stream is hashed from its start in fixed-size
//! chunks, and the position is restored before returning.

use crate::error::{CoreError, CoreResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Length of a content key in bytes (SHA-256 digest width).
pub const KEY_LEN: usize = 32;

/// Chunk size used when feeding a stream into the digest.
const HASH_CHUNK: usize = 8192;

/// Deterministic identifier for a stream's content.
///
/// Two streams with identical byte content always yield the same key;
/// streams with differing content yield different keys with overwhelming
/// probability. Keys are immutable once derived and are used as map keys
/// throughout the store and archive layers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentKey([u8; KEY_LEN]);

impl ContentKey {
    /// Creates a content key from raw digest bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Creates a content key from a slice.
    ///
    /// Returns `None` if the slice is not exactly [`KEY_LEN`] bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == KEY_LEN {
            let mut bytes = [0u8; KEY_LEN];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Parses a content key from its lowercase hex encoding.
    ///
    /// Returns `None` if the string is not exactly 64 hex digits.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != KEY_LEN * 2 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; KEY_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// Returns the stable lowercase hex encoding of the key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use fmt::Write;

        let mut out = String::with_capacity(KEY_LEN * 2);
        for byte in &self.0 {
            // Writing to a String cannot fail.
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", self.to_hex())
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; KEY_LEN]> for ContentKey {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<ContentKey> for [u8; KEY_LEN] {
    fn from(key: ContentKey) -> Self {
        key.0
    }
}

/// Seekable byte input consumed by the deriver, volume, and store layers.
///
/// Implemented for every `Read + Seek` type; exists so those layers can
/// take a single trait object at their boundaries.
pub trait ByteSource: Read + Seek {}

impl<T: Read + Seek + ?Sized> ByteSource for T {}

/// Derives the content key of a seekable stream.
///
/// The stream is hashed from its start regardless of the current read
/// position, and the position held at entry is restored before returning.
///
/// # Errors
///
/// Returns [`CoreError::Unseekable`] if the stream rejects a seek, and
/// [`CoreError::Io`] if a read fails.
pub fn derive_key<S: Read + Seek + ?Sized>(stream: &mut S) -> CoreResult<ContentKey> {
    let entry = stream.stream_position().map_err(CoreError::unseekable)?;
    stream
        .seek(SeekFrom::Start(0))
        .map_err(CoreError::unseekable)?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    stream
        .seek(SeekFrom::Start(entry))
        .map_err(CoreError::unseekable)?;

    Ok(ContentKey::from_bytes(hasher.finalize().into()))
}

/// A named, seekable byte source with a memoized content key.
///
/// The key is derived on first access and cached for the lifetime of the
/// source; repeated calls return the cached value without re-reading the
/// stream. The logical name is supplied at construction and is independent
/// of the content.
#[derive(Debug)]
pub struct Source<R> {
    name: String,
    stream: R,
    key: Option<ContentKey>,
}

impl<R: Read + Seek> Source<R> {
    /// Creates a source over a stream with the given logical name.
    pub fn new(name: impl Into<String>, stream: R) -> Self {
        Self {
            name: name.into(),
            stream,
            key: None,
        }
    }

    /// Returns the logical name of this source.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the content key, deriving and caching it on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream cannot be seeked or read.
    pub fn content_key(&mut self) -> CoreResult<ContentKey> {
        if let Some(key) = self.key {
            return Ok(key);
        }
        let key = derive_key(&mut self.stream)?;
        self.key = Some(key);
        Ok(key)
    }

    /// Returns a mutable reference to the underlying stream.
    pub fn stream_mut(&mut self) -> &mut R {
        &mut self.stream
    }

    /// Consumes the source, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.stream
    }
}

impl Source<File> {
    /// Opens a file as a source, using its path as the logical name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let file = File::open(path)?;
        Ok(Self::new(path.display().to_string(), file))
    }
}
