//! # Carton Storage
//!
//! Append-only volume backends for Carton.
//!
//! This crate provides the lowest-level storage abstraction for Carton.
//! Volume backends are **opaque byte stores** - they never interpret the
//! data they hold and never overwrite it.
//!
//! ## Design Principles
//!
//! - Backends are simple append-only byte stores (append, read back, flush)
//! - No knowledge of content keys, indexes, or name histories
//! - Must be `Send + Sync` for shared access
//! - The layers above own all interpretation of stored ranges
//!
//! ## Available Backends
//!
//! - [`InMemoryVolume`] - heap-backed, for tests and ephemeral stores
//! - [`FileVolume`] - a single append-only file on disk
//!
//! ## Example
//!
//! ```rust
//! use carton_storage::{VolumeBackend, InMemoryVolume};
//!
//! let mut volume = InMemoryVolume::new();
//! volume.append(b"foo").unwrap();
//! let offset = volume.append(b"bartleby").unwrap();
//! assert_eq!(volume.read_at(offset, 8).unwrap(), b"bartleby");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::VolumeBackend;
pub use error::{VolumeError, VolumeResult};
pub use file::FileVolume;
pub use memory::InMemoryVolume;
