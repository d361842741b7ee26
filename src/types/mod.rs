//! Primitive value types shared across the ledger.
//!
//! - `Amount`: fixed-point money with exact arithmetic
//! - `Hash`: 32-byte SHA3-256 digest and its streaming builder
//! - `encoding`: the canonical byte layout used for hashing and snapshots

pub mod amount;
pub mod encoding;
pub mod hash;
