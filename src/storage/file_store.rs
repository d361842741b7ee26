//! File-backed snapshot store.

use crate::debug;
use crate::storage::snapshot::{Snapshot, SnapshotView};
use crate::storage::{ChainStore, StorageError};
use fs2::FileExt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Directory under the home directory that holds the default ledger.
pub const DATA_DIR: &str = ".zakat-ledger";

/// File name of the default ledger inside [`DATA_DIR`].
pub const LEDGER_FILE: &str = "ledger.bin";

/// Returns `~/.zakat-ledger/ledger.bin`.
pub fn default_data_path() -> io::Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "home directory not found"))?;
    Ok(home.join(DATA_DIR).join(LEDGER_FILE))
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Snapshot store backed by a single file.
///
/// Holds an exclusive lock on `<path>.lock` for as long as the store lives,
/// so only one process can write a given ledger. Saves go to `<path>.tmp`
/// first and are renamed over the ledger, so a crash mid-write leaves the
/// previous snapshot intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Released when dropped.
    _lock: File,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle already holds the
    /// ledger's lock.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let lock_path = sibling(&path, ".lock");
        let lock = File::create(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| StorageError::Locked(lock_path.display().to_string()))?;

        debug!("Opened ledger store at {}", path.display());
        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChainStore for FileStore {
    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let snapshot = Snapshot::from_file_bytes(&data)?;
        debug!(
            "Loaded snapshot from {}: {} bytes, {} blocks",
            self.path.display(),
            data.len(),
            snapshot.blocks.len()
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &SnapshotView<'_>) -> Result<(), StorageError> {
        let data = snapshot.to_file_bytes();
        let tmp_path = sibling(&self.path, ".tmp");

        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&data)?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path)?;

        debug!("Saved snapshot to {} ({} bytes)", self.path.display(), data.len());
        Ok(())
    }
}
