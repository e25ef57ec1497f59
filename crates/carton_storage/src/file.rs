//! File-backed volume.

use crate::backend::VolumeBackend;
use crate::error::{VolumeError, VolumeResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A volume persisted to a single file.
///
/// The file carries no framing of its own: it is exactly the
/// concatenation of every append, in order. Reopening the same path
/// picks up where the last process left off, and every `(offset, len)`
/// range handed out before remains valid.
///
/// Durability comes in two levels: `flush` pushes buffered writes to the
/// operating system, `sync` additionally asks the OS to commit them to
/// the device.
///
/// Access is serialized through internal locks, so a shared reference
/// can serve concurrent reads.
///
/// # Example
///
/// ```no_run
/// use carton_storage::{VolumeBackend, FileVolume};
/// use std::path::Path;
///
/// let mut volume = FileVolume::open(Path::new("carton.vol")).unwrap();
/// let offset = volume.append(b"bartleby").unwrap();
/// volume.sync().unwrap();
/// assert_eq!(volume.read_at(offset, 8).unwrap(), b"bartleby");
/// ```
#[derive(Debug)]
pub struct FileVolume {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileVolume {
    /// Opens the volume at `path`, creating the file if it is missing.
    ///
    /// An existing file is never truncated; its current length becomes
    /// the offset of the next append.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its length
    /// cannot be read.
    pub fn open(path: &Path) -> VolumeResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }

    /// Like [`open`](Self::open), but first creates any missing parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the file cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> VolumeResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path the volume was opened at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VolumeBackend for FileVolume {
    fn read_at(&self, offset: u64, len: usize) -> VolumeResult<Vec<u8>> {
        let size = *self.size.read();
        let end = match offset.checked_add(len as u64) {
            Some(end) if offset <= size && end <= size => end,
            _ => return Err(VolumeError::ReadPastEnd { offset, len, size }),
        };

        if offset == end {
            return Ok(Vec::new());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> VolumeResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();

        let offset = *size;
        if !data.is_empty() {
            file.seek(SeekFrom::End(0))?;
            file.write_all(data)?;
            *size += data.len() as u64;
        }

        Ok(offset)
    }

    fn flush(&mut self) -> VolumeResult<()> {
        self.file.write().flush()?;
        Ok(())
    }

    fn size(&self) -> VolumeResult<u64> {
        Ok(*self.size.read())
    }

    fn sync(&mut self) -> VolumeResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }
}
