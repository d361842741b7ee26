//! Ordered block sequence plus the pending buffer.

use crate::core::block::Block;
use crate::core::errors::{LedgerError, Result};
use crate::core::transaction::Transaction;
use crate::info;
use crate::storage::StorageError;

/// A committed transaction together with where it was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub block_index: usize,
    pub block_timestamp: u64,
    pub transaction: Transaction,
}

/// Append-only chain of blocks.
///
/// Index 0 is always the genesis block. Blocks are only ever appended by
/// [`mine`](Blockchain::mine); nothing removes or reorders them.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Blockchain {
    /// Starts a chain holding only a genesis block sealed with `genesis_seed`.
    pub fn new(genesis_seed: &str, now: u64) -> Self {
        let genesis = Block::genesis(genesis_seed, now);
        info!(
            "Initializing chain with genesis block: hash={} seed={}",
            genesis.hash, genesis.seed_key
        );
        Self {
            blocks: vec![genesis],
            pending: Vec::new(),
        }
    }

    /// Rebuilds a chain from persisted parts without recomputing any hash.
    pub fn from_parts(
        blocks: Vec<Block>,
        pending: Vec<Transaction>,
    ) -> std::result::Result<Self, StorageError> {
        if blocks.is_empty() {
            return Err(StorageError::MissingGenesis);
        }
        Ok(Self { blocks, pending })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a chain holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest_block(&self) -> &Block {
        // from_parts and new both guarantee a genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    /// Earliest timestamp that keeps time non-decreasing along the chain and
    /// through the pending buffer.
    pub fn next_timestamp(&self, now: u64) -> u64 {
        let last_pending = self.pending.last().map_or(0, |tx| tx.timestamp);
        now.max(last_pending).max(self.latest_block().timestamp)
    }

    /// Queues a transaction for the next block.
    pub fn push_pending(&mut self, transaction: Transaction) {
        self.pending.push(transaction);
    }

    /// Seals the whole pending buffer into a new block and returns its index.
    ///
    /// The block links to the current tip, records `seed_key` verbatim and is
    /// timestamped no earlier than anything before it.
    pub fn mine(&mut self, seed_key: &str, now: u64) -> Result<usize> {
        if self.pending.is_empty() {
            return Err(LedgerError::NothingToMine);
        }

        let timestamp = self.next_timestamp(now);
        let prev_hash = self.latest_block().hash;
        let transactions = std::mem::take(&mut self.pending);
        let block = Block::seal(transactions, timestamp, seed_key, prev_hash);

        info!(
            "Mined block: index={} hash={} transactions={} seed={}",
            self.blocks.len(),
            block.hash,
            block.transactions.len(),
            block.seed_key
        );

        self.blocks.push(block);
        Ok(self.blocks.len() - 1)
    }

    /// Committed transactions in block then transaction order.
    pub fn committed_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.blocks.iter().flat_map(|block| block.transactions.iter())
    }

    pub fn committed_count(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(block_index, block)| {
                block.transactions.iter().map(move |tx| HistoryEntry {
                    block_index,
                    block_timestamp: block.timestamp,
                    transaction: tx.clone(),
                })
            })
            .collect()
    }

    /// Distinct seed keys in the order they first sealed a block.
    pub fn seed_keys_used(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for block in &self.blocks {
            if !seen.contains(&block.seed_key.as_str()) {
                seen.push(block.seed_key.as_str());
            }
        }
        seen
    }

    /// Whether the block at `index` still matches its stored hash, or `None`
    /// if there is no such block.
    pub fn verify_block(&self, index: usize) -> Option<bool> {
        self.block(index).map(|block| block.verify().is_ok())
    }

    pub fn into_parts(self) -> (Vec<Block>, Vec<Transaction>) {
        (self.blocks, self.pending)
    }

    #[cfg(test)]
    pub(crate) fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }
}
