//! Shared fixtures for unit tests.

use crate::config::{LedgerConfig, TamperPolicy};
use crate::service::ZakatLedger;
use crate::types::amount::Amount;

/// Parses a decimal amount, panicking on bad input.
pub fn amt(text: &str) -> Amount {
    text.parse()
        .unwrap_or_else(|e| panic!("bad test amount {text:?}: {e}"))
}

/// In-memory ledger with Alice (seed 1001) and Bob (seed 1002) at the
/// default 200 each.
pub fn alice_bob_ledger() -> ZakatLedger {
    ledger_with_policy(TamperPolicy::Reject)
}

pub fn ledger_with_policy(tamper_policy: TamperPolicy) -> ZakatLedger {
    let config = LedgerConfig {
        tamper_policy,
        ..LedgerConfig::default()
    };
    let ledger = ZakatLedger::in_memory(config).unwrap();
    ledger.register_account("Alice", None, "1001").unwrap();
    ledger.register_account("Bob", None, "1002").unwrap();
    ledger
}
