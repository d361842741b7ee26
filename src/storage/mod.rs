//! Ledger persistence.
//!
//! - [`snapshot`]: the on-disk image of accounts, blocks and pending
//!   transactions
//! - [`file_store`]: file-backed store with an exclusive lock and atomic
//!   writes
//! - [`MemoryStore`]: in-process store for tests and `--memory` sessions

pub mod file_store;
pub mod snapshot;

use crate::types::encoding::DecodeError;
use ledger_derive::Error;
use snapshot::{Snapshot, SnapshotView};
use std::io;
use std::sync::Mutex;

/// Errors raised while loading or saving a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(String),

    #[error("corrupt snapshot: {0}")]
    Decode(DecodeError),

    #[error("not a ledger snapshot (bad magic bytes)")]
    BadMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),

    #[error("ledger is locked by another process: {0}")]
    Locked(String),

    #[error("snapshot holds no genesis block")]
    MissingGenesis,

    #[error("snapshot holds an invalid account: {0}")]
    InvalidAccount(String),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<DecodeError> for StorageError {
    fn from(err: DecodeError) -> Self {
        StorageError::Decode(err)
    }
}

/// Backend that persists whole-ledger snapshots.
///
/// Implementations must be thread-safe; the service calls `save` while
/// holding its write lock, so saves never race each other.
pub trait ChainStore: Send + Sync {
    /// Returns the last saved snapshot, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>, StorageError>;

    /// Replaces the stored snapshot.
    fn save(&self, snapshot: &SnapshotView<'_>) -> Result<(), StorageError>;
}

/// Keeps the encoded snapshot in memory.
///
/// Goes through the same byte format as [`file_store::FileStore`], so a
/// round trip through it exercises the codec.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the stored snapshot in bytes, if any.
    pub fn stored_len(&self) -> Option<usize> {
        self.bytes
            .lock()
            .ok()
            .and_then(|bytes| bytes.as_ref().map(Vec::len))
    }
}

impl ChainStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let bytes = self
            .bytes
            .lock()
            .map_err(|_| StorageError::Io("memory store poisoned".into()))?;
        bytes
            .as_deref()
            .map(Snapshot::from_file_bytes)
            .transpose()
    }

    fn save(&self, snapshot: &SnapshotView<'_>) -> Result<(), StorageError> {
        let encoded = snapshot.to_file_bytes();
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| StorageError::Io("memory store poisoned".into()))?;
        *bytes = Some(encoded);
        Ok(())
    }
}
