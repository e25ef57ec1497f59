//! # Carton Core
//!
//! Content-addressed, append-only archive core.
//!
//! This crate provides:
//! - Content key derivation (position-restoring SHA-256 over a stream)
//! - A volume wrapper that turns an opaque byte store into
//!   `(offset, length)` locations
//! - A deduplicating key-to-bytes store with in-memory and volume-backed
//!   backends
//! - A name-to-history archive facade with latest-wins retrieval
//! - A sidecar manifest format for persisting the volume index
//!
//! ## Layering
//!
//! ```text
//! Archive            names -> ordered key histories
//!   └── ContentStore keys -> bytes (dedup before any write)
//!         └── Volume keys -> (offset, length) ranges
//!               └── carton_storage::VolumeBackend   raw append-only bytes
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::io::{Cursor, Read};
//! use carton_core::{Archive, MemoryStore, Source};
//!
//! let mut archive = Archive::new(MemoryStore::new());
//! let mut source = Source::new("notes.txt", Cursor::new(b"hello".to_vec()));
//! archive.include(&mut source).unwrap();
//!
//! let mut out = String::new();
//! archive.get("notes.txt").unwrap().read_to_string(&mut out).unwrap();
//! assert_eq!(out, "hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod archive;
mod error;
mod key;
pub mod manifest;
mod store;
mod volume;

pub use archive::Archive;
pub use error::{CoreError, CoreResult};
pub use key::{derive_key, ByteSource, ContentKey, Source, KEY_LEN};
pub use store::{ContentStore, MemoryStore, VolumeStore};
pub use volume::{StoredLocation, Volume};
