//! Account identities and the registry of opening balances.
//!
//! Balances are never stored here: an account only records what it started
//! with, and everything after that is replayed from the chain.

use crate::core::errors::{LedgerError, Result};
use crate::types::amount::Amount;
use ledger_derive::BinaryCodec;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Account name as it appears in transactions.
#[derive(BinaryCodec, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(name: impl Into<String>) -> Self {
        AccountId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(name: &str) -> Self {
        AccountId(name.to_string())
    }
}

impl From<String> for AccountId {
    fn from(name: String) -> Self {
        AccountId(name)
    }
}

impl Borrow<str> for AccountId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A registered participant.
#[derive(BinaryCodec, Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    /// Balance before any transaction touches the account.
    pub initial_balance: Amount,
    /// Roll number, also used as the block seed when this account mines.
    pub seed_key: String,
    /// Registration time, nanoseconds since the Unix epoch.
    pub created_at: u64,
}

impl Account {
    /// Builds an account after checking the name, balance and seed key.
    pub fn new(
        name: &str,
        initial_balance: Amount,
        seed_key: &str,
        created_at: u64,
    ) -> Result<Self> {
        let account = Self {
            id: AccountId::from(name.trim()),
            initial_balance,
            seed_key: seed_key.trim().to_string(),
            created_at,
        };
        account.check()?;
        Ok(account)
    }

    /// Checks the invariants [`Account::new`] enforces. Accounts decoded from
    /// a snapshot go through this again.
    pub fn check(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(LedgerError::EmptyAccountName);
        }
        if self.initial_balance.is_negative() {
            return Err(LedgerError::InvalidAmount {
                amount: self.initial_balance,
            });
        }
        if self.initial_balance.exceeds_max() {
            return Err(LedgerError::AmountTooLarge {
                amount: self.initial_balance,
            });
        }
        if self.seed_key.trim().is_empty() {
            return Err(LedgerError::EmptySeedKey);
        }
        Ok(())
    }
}

/// All registered accounts, ordered by name.
#[derive(Clone, Debug, Default)]
pub struct AccountRegistry {
    accounts: BTreeMap<AccountId, Account>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a registry from persisted accounts, rejecting duplicates and
    /// any account [`Account::new`] would have refused.
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self> {
        let mut registry = Self::new();
        for account in accounts {
            account.check()?;
            registry.register(account)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, account: Account) -> Result<&Account> {
        if self.accounts.contains_key(&account.id) {
            return Err(LedgerError::DuplicateAccount(account.id));
        }
        let id = account.id.clone();
        Ok(self.accounts.entry(id).or_insert(account))
    }

    pub fn get(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    /// Opening balance of a registered account.
    pub fn opening_balance(&self, id: &str) -> Result<Amount> {
        self.get(id)
            .map(|account| account.initial_balance)
            .ok_or_else(|| LedgerError::UnknownAccount(AccountId::from(id)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &AccountId> {
        self.accounts.keys()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Account> {
        self.accounts.values().cloned().collect()
    }
}
