//! Zakat ledger.
//!
//! An append-only, hash-linked ledger of transfers in which every transfer
//! also pays a 2.5% levy into a collection account. Balances are derived by
//! replaying the chain, and any edit to committed data is caught by
//! revalidating hashes and links.

pub mod config;
pub mod core;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;
