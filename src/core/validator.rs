//! Chain integrity checks.
//!
//! Provides the [`Validator`] trait for per-block rules, [`ChainValidator`] as
//! the default rule set, and [`validate_chain`], which walks every block and
//! collects one fault per failing block into a [`ValidationReport`].

use crate::core::account::AccountId;
use crate::core::block::{Block, GENESIS_PREV_HASH};
use crate::core::blockchain::Blockchain;
use crate::core::errors::LedgerError;
use crate::core::transaction::zakat_of;
use crate::types::amount::Amount;
use crate::types::hash::Hash;
use crate::warn;
use ledger_derive::Error;
use std::fmt::Debug;

/// Rules a single block must satisfy given its predecessor.
///
/// Implementations must be thread-safe so validation can run under a shared
/// read lock.
pub trait Validator: Send + Sync {
    type Error: Debug + std::error::Error;

    /// Checks `block`, found at `index`, against `previous` (`None` for the
    /// genesis block).
    fn validate_block(
        &self,
        index: usize,
        block: &Block,
        previous: Option<&Block>,
    ) -> Result<(), Self::Error>;
}

/// Default rules.
///
/// Checks, in order:
/// - The stored hash matches the block contents.
/// - Genesis links to the zero hash; every other block links to the stored
///   hash of its predecessor.
/// - Each transaction has a positive amount no larger than [`Amount::MAX`],
///   the zakat its amount implies, the configured collection account, and a
///   timestamp no earlier than the transaction before it.
#[derive(Clone, Debug)]
pub struct ChainValidator {
    zakat_account: AccountId,
}

impl ChainValidator {
    pub fn new(zakat_account: AccountId) -> Self {
        Self { zakat_account }
    }
}

/// Reasons a block fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockValidatorError {
    #[error("block hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: Hash, computed: Hash },

    #[error("previous block hash mismatch: expected {expected}, found {found}")]
    PreviousHashMismatch { expected: Hash, found: Hash },

    #[error("genesis block must link to the zero hash, found {found}")]
    InvalidGenesisLink { found: Hash },

    #[error("transaction {position} has non-positive amount {amount}")]
    NonPositiveAmount { position: usize, amount: Amount },

    #[error("transaction {position} amount {amount} exceeds the ledger maximum")]
    AmountAboveMax { position: usize, amount: Amount },

    #[error("transaction {position} carries zakat {found}, expected {expected}")]
    ZakatMismatch {
        position: usize,
        expected: Amount,
        found: Amount,
    },

    #[error("transaction {position} pays zakat to '{found}'")]
    WrongZakatReceiver { position: usize, found: AccountId },

    #[error("transaction {position} is timestamped before its predecessor")]
    TimestampRegression { position: usize },
}

impl Validator for ChainValidator {
    type Error = BlockValidatorError;

    fn validate_block(
        &self,
        _index: usize,
        block: &Block,
        previous: Option<&Block>,
    ) -> Result<(), Self::Error> {
        block.verify()?;

        match previous {
            None if block.prev_hash != GENESIS_PREV_HASH => {
                return Err(BlockValidatorError::InvalidGenesisLink {
                    found: block.prev_hash,
                });
            }
            Some(prev) if block.prev_hash != prev.hash => {
                return Err(BlockValidatorError::PreviousHashMismatch {
                    expected: prev.hash,
                    found: block.prev_hash,
                });
            }
            _ => {}
        }

        let mut last_timestamp = 0;
        for (position, tx) in block.transactions.iter().enumerate() {
            if !tx.amount.is_positive() {
                return Err(BlockValidatorError::NonPositiveAmount {
                    position,
                    amount: tx.amount,
                });
            }
            if tx.amount.exceeds_max() {
                return Err(BlockValidatorError::AmountAboveMax {
                    position,
                    amount: tx.amount,
                });
            }
            if !tx.has_consistent_zakat() {
                return Err(BlockValidatorError::ZakatMismatch {
                    position,
                    expected: zakat_of(tx.amount),
                    found: tx.zakat_amount,
                });
            }
            if tx.zakat_receiver != self.zakat_account {
                return Err(BlockValidatorError::WrongZakatReceiver {
                    position,
                    found: tx.zakat_receiver.clone(),
                });
            }
            if tx.timestamp < last_timestamp {
                return Err(BlockValidatorError::TimestampRegression { position });
            }
            last_timestamp = tx.timestamp;
        }

        Ok(())
    }
}

/// A failing block and the first rule it broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFault<E> {
    pub index: usize,
    pub error: E,
}

/// Outcome of a full chain walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport<E = BlockValidatorError> {
    blocks_checked: usize,
    faults: Vec<BlockFault<E>>,
}

impl<E> ValidationReport<E> {
    pub fn is_valid(&self) -> bool {
        self.faults.is_empty()
    }

    /// Index of the earliest failing block.
    pub fn first_invalid(&self) -> Option<usize> {
        self.faults.first().map(|fault| fault.index)
    }

    pub fn faults(&self) -> &[BlockFault<E>] {
        &self.faults
    }

    pub fn blocks_checked(&self) -> usize {
        self.blocks_checked
    }

    /// `(is_valid, first_invalid_index)`.
    pub fn summary(&self) -> (bool, Option<usize>) {
        (self.is_valid(), self.first_invalid())
    }

    /// Converts a failed report into [`LedgerError::ChainTampered`].
    pub fn ensure_valid(&self) -> Result<(), LedgerError> {
        match self.first_invalid() {
            Some(index) => Err(LedgerError::ChainTampered { index }),
            None => Ok(()),
        }
    }
}

/// Walks every block of `chain`, recording a fault for each one that fails.
pub fn validate_chain<V: Validator>(validator: &V, chain: &Blockchain) -> ValidationReport<V::Error> {
    let blocks = chain.blocks();
    let mut faults = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        let previous = index.checked_sub(1).map(|i| &blocks[i]);
        if let Err(error) = validator.validate_block(index, block, previous) {
            warn!("Block {} failed validation: {}", index, error);
            faults.push(BlockFault { index, error });
        }
    }

    ValidationReport {
        blocks_checked: blocks.len(),
        faults,
    }
}
