//! Ledger service: accounts, chain, balance cache and persistence behind a
//! single read/write lock.
//!
//! Every mutation takes the write lock for its whole check-then-append unit,
//! stages the change on a copy of the state, saves that copy and only then
//! swaps it in. A failed save leaves the in-memory ledger untouched.

use crate::config::{LedgerConfig, TamperPolicy};
use crate::core::account::{Account, AccountId, AccountRegistry};
use crate::core::block::Block;
use crate::core::blockchain::{Blockchain, HistoryEntry};
use crate::core::errors::{LedgerError, Result};
use crate::core::ledger::{self, BalanceCache};
use crate::core::transaction::{Transaction, TransactionId};
use crate::core::validator::{ChainValidator, ValidationReport, validate_chain};
use crate::storage::snapshot::{Snapshot, SnapshotView};
use crate::storage::{ChainStore, MemoryStore, StorageError};
use crate::types::amount::Amount;
use crate::utils::time::now_nanos;
use crate::{error, info, warn};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry and chain, always replaced together.
#[derive(Debug, Clone)]
struct State {
    accounts: AccountRegistry,
    chain: Blockchain,
}

impl State {
    /// Writes this state to `store` without copying it.
    fn save(&self, store: &impl ChainStore) -> std::result::Result<(), StorageError> {
        let accounts: Vec<&Account> = self.accounts.iter().collect();
        store.save(&SnapshotView {
            accounts: &accounts,
            blocks: self.chain.blocks(),
            pending: self.chain.pending(),
        })
    }

    fn from_snapshot(snapshot: Snapshot) -> std::result::Result<Self, StorageError> {
        let accounts = AccountRegistry::from_accounts(snapshot.accounts)
            .map_err(|e| StorageError::InvalidAccount(e.to_string()))?;
        let chain = Blockchain::from_parts(snapshot.blocks, snapshot.pending)?;
        Ok(Self { accounts, chain })
    }
}

/// Headline figures for a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStats {
    pub accounts: usize,
    /// Blocks including genesis.
    pub blocks: usize,
    pub pending: usize,
    pub committed_transactions: usize,
}

/// A zakat ledger bound to a snapshot store.
pub struct ZakatLedger<S: ChainStore = MemoryStore> {
    state: RwLock<State>,
    cache: BalanceCache,
    validator: ChainValidator,
    store: S,
    config: LedgerConfig,
}

impl ZakatLedger<MemoryStore> {
    /// Fresh ledger that lives only in memory.
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        Self::open(config, MemoryStore::new())
    }
}

impl<S: ChainStore> ZakatLedger<S> {
    /// Loads the ledger held by `store`, or starts a new one if it is empty.
    ///
    /// A new ledger holds a genesis block and the zakat collection account.
    /// A loaded ledger is validated once and any fault is logged; loading
    /// itself never rewrites stored hashes.
    pub fn open(config: LedgerConfig, store: S) -> Result<Self> {
        let validator = ChainValidator::new(config.zakat_account.clone());

        let (state, fresh) = match store.load()? {
            Some(snapshot) => (State::from_snapshot(snapshot)?, false),
            None => {
                let chain = Blockchain::new(&config.genesis_seed, now_nanos());
                (
                    State {
                        accounts: AccountRegistry::new(),
                        chain,
                    },
                    true,
                )
            }
        };

        let ledger = Self {
            state: RwLock::new(state),
            cache: BalanceCache::new(),
            validator,
            store,
            config,
        };

        {
            let mut state = ledger.write();
            if !state.accounts.contains(ledger.config.zakat_account.as_str()) {
                let mut staged = state.clone();
                staged.accounts.register(Account::new(
                    ledger.config.zakat_account.as_str(),
                    Amount::ZERO,
                    &ledger.config.zakat_seed,
                    now_nanos(),
                )?)?;
                ledger.commit(&mut state, staged)?;
            } else if fresh {
                state.save(&ledger.store)?;
            }

            if fresh {
                info!(
                    "Created new ledger: collection account={}",
                    ledger.config.zakat_account
                );
            } else {
                info!(
                    "Loaded ledger: accounts={} blocks={} pending={}",
                    state.accounts.len(),
                    state.chain.len(),
                    state.chain.pending().len()
                );
                let report = validate_chain(&ledger.validator, &state.chain);
                if let Some(index) = report.first_invalid() {
                    warn!(
                        "Loaded chain fails validation at block {} ({} faulty blocks)",
                        index,
                        report.faults().len()
                    );
                }
            }
        }

        Ok(ledger)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persists `staged` and makes it current.
    fn commit(&self, state: &mut State, staged: State) -> Result<()> {
        if let Err(err) = staged.save(&self.store) {
            error!("Failed to save ledger: {}", err);
            return Err(err.into());
        }
        *state = staged;
        Ok(())
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers an account. `initial_balance` defaults to the configured
    /// opening balance.
    pub fn register_account(
        &self,
        name: &str,
        initial_balance: Option<Amount>,
        seed_key: &str,
    ) -> Result<AccountId> {
        let balance = initial_balance.unwrap_or(self.config.default_balance);
        let account = Account::new(name, balance, seed_key, now_nanos())?;
        let id = account.id.clone();

        let mut state = self.write();
        let mut staged = state.clone();
        if let Err(err) = staged.accounts.register(account) {
            warn!("Rejected registration of '{}': {}", id, err);
            return Err(err);
        }
        self.commit(&mut state, staged)?;

        info!("Registered account {} with balance {}", id, balance);
        Ok(id)
    }

    /// Queues a transfer after checking it against the sender's balance,
    /// pending transactions included.
    pub fn submit_transfer(
        &self,
        sender: &str,
        receiver: &str,
        amount: Amount,
    ) -> Result<TransactionId> {
        let mut state = self.write();
        let tx = match ledger::create_transfer(
            &state.accounts,
            &state.chain,
            sender,
            receiver,
            amount,
            &self.config.zakat_account,
            now_nanos(),
        ) {
            Ok(tx) => tx,
            Err(err) => {
                warn!("Rejected transfer {} -> {} of {}: {}", sender, receiver, amount, err);
                return Err(err);
            }
        };

        let id = tx.id();
        info!(
            "Accepted transfer {} -> {}: amount={} zakat={} id={}",
            tx.sender,
            tx.receiver,
            tx.amount,
            tx.zakat_amount,
            id.short(16)
        );

        let mut staged = state.clone();
        staged.chain.push_pending(tx);
        self.commit(&mut state, staged)?;
        Ok(id)
    }

    /// Seals the pending buffer into a block carrying `seed_key`.
    ///
    /// Under [`TamperPolicy::Reject`] a chain that fails validation is not
    /// extended and the first bad block is reported.
    pub fn mine(&self, seed_key: &str) -> Result<usize> {
        let mut state = self.write();
        self.mine_locked(&mut state, seed_key)
    }

    /// Mines with the seed key of the first pending sender, or the genesis
    /// seed if that sender is no longer registered.
    pub fn mine_with_sender_seed(&self) -> Result<usize> {
        let mut state = self.write();
        let first = state
            .chain
            .pending()
            .first()
            .ok_or(LedgerError::NothingToMine)?;
        let seed_key = state
            .accounts
            .get(first.sender.as_str())
            .map(|account| account.seed_key.clone())
            .unwrap_or_else(|| self.config.genesis_seed.clone());
        self.mine_locked(&mut state, &seed_key)
    }

    fn mine_locked(&self, state: &mut State, seed_key: &str) -> Result<usize> {
        if state.chain.pending().is_empty() {
            return Err(LedgerError::NothingToMine);
        }

        let report = validate_chain(&self.validator, &state.chain);
        if let Some(index) = report.first_invalid() {
            match self.config.tamper_policy {
                TamperPolicy::Reject => {
                    error!("Refusing to mine: chain invalid at block {}", index);
                    return Err(LedgerError::ChainTampered { index });
                }
                TamperPolicy::Flag => {
                    warn!("Mining on a chain invalid at block {}", index);
                }
            }
        }

        let mut staged = state.clone();
        let index = staged.chain.mine(seed_key, now_nanos())?;
        self.commit(state, staged)?;
        Ok(index)
    }

    /// Walks the whole chain and reports every faulty block.
    pub fn validate(&self) -> ValidationReport {
        let state = self.read();
        let report = validate_chain(&self.validator, &state.chain);
        match report.first_invalid() {
            None => info!("Chain valid: {} blocks checked", report.blocks_checked()),
            Some(index) => warn!(
                "Chain invalid: first bad block {}, {} faulty of {}",
                index,
                report.faults().len(),
                report.blocks_checked()
            ),
        }
        report
    }

    /// Committed balance of `account`.
    pub fn balance_of(&self, account: &str) -> Result<Amount> {
        let state = self.read();
        self.cache
            .committed_balance(&state.accounts, &state.chain, account)
    }

    /// Balance of `account` once every pending transaction is committed.
    pub fn balance_including_pending(&self, account: &str) -> Result<Amount> {
        let state = self.read();
        self.cache
            .balance_including_pending(&state.accounts, &state.chain, account)
    }

    /// Every registered account with its balance, ordered by name.
    pub fn balances(&self, include_pending: bool) -> Result<Vec<(AccountId, Amount)>> {
        let state = self.read();
        let replayed = ledger::replay(&state.accounts, &state.chain, include_pending)?;
        Ok(state
            .accounts
            .ids()
            .map(|id| (id.clone(), replayed.get(id).copied().unwrap_or_default()))
            .collect())
    }

    /// Sum of every registered balance, pending transactions included.
    pub fn total_supply(&self) -> Result<Amount> {
        let balances = self.balances(true)?;
        Amount::checked_sum(balances.into_iter().map(|(_, amount)| amount))
            .ok_or(LedgerError::SupplyOverflow)
    }

    pub fn stats(&self) -> LedgerStats {
        let state = self.read();
        LedgerStats {
            accounts: state.accounts.len(),
            blocks: state.chain.len(),
            pending: state.chain.pending().len(),
            committed_transactions: state.chain.committed_count(),
        }
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.read().chain.history()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.read().accounts.to_vec()
    }

    pub fn account(&self, name: &str) -> Option<Account> {
        self.read().accounts.get(name).cloned()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.read().chain.pending().to_vec()
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.read().chain.blocks().to_vec()
    }

    pub fn block(&self, index: usize) -> Option<Block> {
        self.read().chain.block(index).cloned()
    }

    pub fn latest_block(&self) -> Block {
        self.read().chain.latest_block().clone()
    }

    /// Number of blocks, genesis included.
    pub fn chain_len(&self) -> usize {
        self.read().chain.len()
    }

    pub fn seed_keys_used(&self) -> Vec<String> {
        self.read()
            .chain
            .seed_keys_used()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn verify_block(&self, index: usize) -> Option<bool> {
        self.read().chain.verify_block(index)
    }

    /// Edits the committed chain in place, bypassing every check.
    #[cfg(test)]
    pub(crate) fn tamper(&self, edit: impl FnOnce(&mut Blockchain)) {
        let mut state = self.write();
        edit(&mut state.chain);
        self.cache.clear();
    }
}
