//! Whole-ledger snapshot and its file framing.
//!
//! File format:
//! - `[4 bytes]` magic `ZKLG`
//! - `[1 byte]` format version
//! - `[variable]` canonical encoding of [`Snapshot`]
//!
//! Blocks keep their stored hash, and loading never recomputes it, so an
//! edited file shows up as a validation fault rather than being silently
//! resealed.

use crate::core::account::Account;
use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::storage::StorageError;
use crate::types::encoding::{Decode, Encode, EncodeSink};
use ledger_derive::BinaryCodec;

/// Magic bytes identifying a ledger snapshot.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"ZKLG";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 1;

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub blocks: Vec<Block>,
    pub pending: Vec<Transaction>,
}

/// Borrowed snapshot, encoded straight from live ledger state.
///
/// Encodes to the same bytes as the [`Snapshot`] it mirrors.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotView<'a> {
    pub accounts: &'a [&'a Account],
    pub blocks: &'a [Block],
    pub pending: &'a [Transaction],
}

impl Encode for SnapshotView<'_> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.accounts.len().encode(out);
        for account in self.accounts {
            account.encode(out);
        }
        self.blocks.encode(out);
        self.pending.encode(out);
    }
}

impl SnapshotView<'_> {
    /// Encodes the snapshot behind its magic and version header.
    pub fn to_file_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_LEN + 256);
        data.extend_from_slice(SNAPSHOT_MAGIC);
        data.push(SNAPSHOT_VERSION);
        self.encode(&mut data);
        data
    }
}

impl Snapshot {
    /// Runs `f` over a borrowed view of this snapshot.
    pub fn with_view<R>(&self, f: impl FnOnce(&SnapshotView<'_>) -> R) -> R {
        let accounts: Vec<&Account> = self.accounts.iter().collect();
        f(&SnapshotView {
            accounts: &accounts,
            blocks: &self.blocks,
            pending: &self.pending,
        })
    }

    pub fn to_file_bytes(&self) -> Vec<u8> {
        self.with_view(|view| view.to_file_bytes())
    }

    /// Checks the header and decodes the rest of `data`.
    pub fn from_file_bytes(data: &[u8]) -> Result<Self, StorageError> {
        if data.len() < HEADER_LEN || &data[0..4] != SNAPSHOT_MAGIC {
            return Err(StorageError::BadMagic);
        }
        if data[4] != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion(data[4]));
        }
        Ok(Snapshot::from_bytes(&data[HEADER_LEN..])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::AccountId;
    use crate::types::amount::Amount;
    use crate::types::encoding::DecodeError;

    fn snapshot() -> Snapshot {
        let tx = Transaction::transfer(
            AccountId::from("Alice"),
            AccountId::from("Bob"),
            Amount::from_coins(50),
            AccountId::from("Zakat_Account"),
            1,
        );
        let genesis = Block::genesis("0000", 0);
        let block = Block::seal(vec![tx.clone()], 2, "1001", genesis.hash);
        Snapshot {
            accounts: vec![Account::new("Alice", Amount::from_coins(200), "1001", 0).unwrap()],
            blocks: vec![genesis, block],
            pending: vec![tx],
        }
    }

    #[test]
    fn header_leads_the_file() {
        let data = snapshot().to_file_bytes();
        assert_eq!(&data[0..4], SNAPSHOT_MAGIC);
        assert_eq!(data[4], SNAPSHOT_VERSION);
    }

    #[test]
    fn file_bytes_reload_identically() {
        let original = snapshot();
        let reloaded = Snapshot::from_file_bytes(&original.to_file_bytes()).unwrap();
        assert_eq!(reloaded, original);
        assert_eq!(reloaded.blocks[1].hash, reloaded.blocks[1].recompute_hash());
    }

    #[test]
    fn view_encodes_like_owned_snapshot() {
        let original = snapshot();
        let accounts: Vec<&Account> = original.accounts.iter().collect();
        let view = SnapshotView {
            accounts: &accounts,
            blocks: &original.blocks,
            pending: &original.pending,
        };
        assert_eq!(view.to_vec(), original.to_vec());
        assert_eq!(
            Snapshot::from_file_bytes(&view.to_file_bytes()).unwrap(),
            original
        );
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut data = snapshot().to_file_bytes();
        data[0] = b'X';
        assert_eq!(Snapshot::from_file_bytes(&data), Err(StorageError::BadMagic));
        assert_eq!(Snapshot::from_file_bytes(b"ZK"), Err(StorageError::BadMagic));
    }

    #[test]
    fn future_version_is_rejected() {
        let mut data = snapshot().to_file_bytes();
        data[4] = SNAPSHOT_VERSION + 1;
        assert_eq!(
            Snapshot::from_file_bytes(&data),
            Err(StorageError::UnsupportedVersion(SNAPSHOT_VERSION + 1))
        );
    }

    #[test]
    fn truncated_body_is_rejected() {
        let data = snapshot().to_file_bytes();
        assert_eq!(
            Snapshot::from_file_bytes(&data[..data.len() - 3]),
            Err(StorageError::Decode(DecodeError::UnexpectedEof))
        );
    }
}
