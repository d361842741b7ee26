//! Ledger engine.
//!
//! - `Transaction`: one transfer plus its derived zakat
//! - `Block`: hash-sealed batch of transactions linked to its predecessor
//! - `Blockchain`: the block sequence, the pending buffer and mining
//! - `validator`: integrity rules and the full-chain walk
//! - `ledger`: balances derived by replay, and the checked transfer builder
//! - `account`: registered accounts and their opening balances

pub mod account;
pub mod block;
pub mod blockchain;
pub mod errors;
pub mod ledger;
pub mod transaction;
pub mod validator;
