//! Hash-sealed batches of transactions.

use crate::core::transaction::Transaction;
use crate::core::validator::BlockValidatorError;
use crate::types::hash::Hash;
use ledger_derive::BinaryCodec;

/// Predecessor link carried by the genesis block.
pub const GENESIS_PREV_HASH: Hash = Hash::zero();

/// Computes a block digest from its parts.
///
/// The digest covers a `BLOCK` domain tag, then the encoded transactions,
/// timestamp, seed key and previous hash in that order, then the raw seed key
/// bytes once more as a suffix. Two blocks that differ only in seed key
/// therefore never collide.
pub fn compute_hash(
    transactions: &[Transaction],
    timestamp: u64,
    seed_key: &str,
    prev_hash: &Hash,
) -> Hash {
    let mut h = Hash::sha3();
    h.update(b"BLOCK");
    let mut h = h
        .chain(transactions)
        .chain(&timestamp)
        .chain(seed_key)
        .chain(prev_hash);
    h.update(seed_key.as_bytes());
    h.finalize()
}

/// Sealed block.
///
/// `hash` is stored rather than derived so that editing any other field
/// leaves a detectable mismatch.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Block {
    pub transactions: Vec<Transaction>,
    /// Sealing time, nanoseconds since the Unix epoch.
    pub timestamp: u64,
    pub seed_key: String,
    pub prev_hash: Hash,
    pub hash: Hash,
}

impl Block {
    /// Seals `transactions` behind `prev_hash`.
    pub fn seal(
        transactions: Vec<Transaction>,
        timestamp: u64,
        seed_key: impl Into<String>,
        prev_hash: Hash,
    ) -> Self {
        let seed_key = seed_key.into();
        let hash = compute_hash(&transactions, timestamp, &seed_key, &prev_hash);
        Self {
            transactions,
            timestamp,
            seed_key,
            prev_hash,
            hash,
        }
    }

    /// Empty first block of a chain.
    pub fn genesis(seed_key: impl Into<String>, timestamp: u64) -> Self {
        Self::seal(Vec::new(), timestamp, seed_key, GENESIS_PREV_HASH)
    }

    /// Digest of the block's current contents, ignoring the stored hash.
    pub fn recompute_hash(&self) -> Hash {
        compute_hash(
            &self.transactions,
            self.timestamp,
            &self.seed_key,
            &self.prev_hash,
        )
    }

    /// Checks the stored hash against the block's contents.
    pub fn verify(&self) -> Result<(), BlockValidatorError> {
        let computed = self.recompute_hash();
        if computed != self.hash {
            return Err(BlockValidatorError::HashMismatch {
                stored: self.hash,
                computed,
            });
        }
        Ok(())
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash == GENESIS_PREV_HASH
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::AccountId;
    use crate::types::amount::Amount;
    use crate::types::encoding::{Decode, DecodeError, Encode};

    fn transfer(amount: i64, timestamp: u64) -> Transaction {
        Transaction::transfer(
            AccountId::from("Alice"),
            AccountId::from("Bob"),
            Amount::from_coins(amount),
            AccountId::from("Zakat_Account"),
            timestamp,
        )
    }

    #[test]
    fn genesis_links_to_zero() {
        let genesis = Block::genesis("0000", 1);
        assert!(genesis.is_genesis());
        assert!(genesis.is_empty());
        assert!(genesis.verify().is_ok());
    }

    #[test]
    fn hash_is_deterministic() {
        let a = Block::seal(vec![transfer(50, 1)], 10, "1001", Hash::zero());
        let b = Block::seal(vec![transfer(50, 1)], 10, "1001", Hash::zero());
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.to_hex().len(), 64);
    }

    #[test]
    fn different_seed_keys_give_different_hashes() {
        let txs = vec![transfer(50, 1)];
        let a = Block::seal(txs.clone(), 10, "1001", Hash::zero());
        let b = Block::seal(txs, 10, "1002", Hash::zero());
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn every_field_feeds_the_hash() {
        let prev = Block::genesis("0000", 0).hash;
        let base = compute_hash(&[transfer(50, 1)], 10, "1001", &prev);
        assert_ne!(base, compute_hash(&[transfer(51, 1)], 10, "1001", &prev));
        assert_ne!(base, compute_hash(&[transfer(50, 1)], 11, "1001", &prev));
        assert_ne!(base, compute_hash(&[transfer(50, 1)], 10, "1001", &Hash::zero()));
        assert_ne!(base, compute_hash(&[], 10, "1001", &prev));
    }

    #[test]
    fn transaction_order_feeds_the_hash() {
        let a = compute_hash(&[transfer(1, 1), transfer(2, 2)], 5, "k", &Hash::zero());
        let b = compute_hash(&[transfer(2, 2), transfer(1, 1)], 5, "k", &Hash::zero());
        assert_ne!(a, b);
    }

    #[test]
    fn edited_transaction_fails_verification() {
        let mut block = Block::seal(vec![transfer(50, 1)], 10, "1001", Hash::zero());
        block.transactions[0].amount = Amount::from_coins(500);
        match block.verify() {
            Err(BlockValidatorError::HashMismatch { stored, computed }) => {
                assert_eq!(stored, block.hash);
                assert_ne!(stored, computed);
            }
            other => panic!("expected hash mismatch, got {other:?}"),
        }
    }

    #[test]
    fn codec_keeps_stored_hash() {
        let block = Block::seal(vec![transfer(50, 1)], 10, "1001", Hash::zero());
        let decoded = Block::from_bytes(&block.to_vec()).unwrap();
        assert_eq!(decoded, block);
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn truncated_block_fails_to_decode() {
        let bytes = Block::genesis("0000", 0).to_vec();
        assert_eq!(
            Block::from_bytes(&bytes[..bytes.len() - 1]),
            Err(DecodeError::UnexpectedEof)
        );
    }
}
