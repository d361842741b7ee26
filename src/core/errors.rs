//! Errors surfaced by ledger operations.

use crate::core::account::AccountId;
use crate::storage::StorageError;
use crate::types::amount::Amount;
use ledger_derive::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("amount must be positive, got {amount}")]
    InvalidAmount { amount: Amount },

    #[error("amount {amount} exceeds the ledger maximum")]
    AmountTooLarge { amount: Amount },

    #[error("balance of '{0}' overflows")]
    BalanceOverflow(AccountId),

    #[error("total supply overflows")]
    SupplyOverflow,

    #[error("unknown account '{0}'")]
    UnknownAccount(AccountId),

    #[error("account '{0}' already exists")]
    DuplicateAccount(AccountId),

    #[error("account name must not be empty")]
    EmptyAccountName,

    #[error("seed key must not be empty")]
    EmptySeedKey,

    #[error("account '{0}' cannot transfer to itself")]
    SelfTransfer(AccountId),

    #[error("insufficient balance in '{account}': available {available}, required {required}")]
    InsufficientBalance {
        account: AccountId,
        available: Amount,
        required: Amount,
    },

    #[error("chain integrity violated at block {index}")]
    ChainTampered { index: usize },

    #[error("no pending transactions to mine")]
    NothingToMine,

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        LedgerError::Storage(err)
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_context() {
        let err = LedgerError::InsufficientBalance {
            account: AccountId::from("Alice"),
            available: Amount::from_coins(10),
            required: "51.25".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance in 'Alice': available 10.00, required 51.25"
        );
        assert_eq!(
            LedgerError::ChainTampered { index: 1 }.to_string(),
            "chain integrity violated at block 1"
        );
        assert_eq!(
            LedgerError::BalanceOverflow(AccountId::from("Bob")).to_string(),
            "balance of 'Bob' overflows"
        );
        assert_eq!(
            LedgerError::UnknownAccount(AccountId::from("Carol")).to_string(),
            "unknown account 'Carol'"
        );
    }

    #[test]
    fn storage_errors_convert() {
        let err: LedgerError = StorageError::BadMagic.into();
        assert!(matches!(err, LedgerError::Storage(StorageError::BadMagic)));
    }
}
