//! Ledger benchmark binary.
//!
//! Measures hashing, mining, validation and replay over synthetic chains.
//! Run with: `cargo run --release --bin bench`

use std::time::{Duration, Instant};

use zakat_ledger::core::account::{Account, AccountId, AccountRegistry};
use zakat_ledger::core::block::compute_hash;
use zakat_ledger::core::blockchain::Blockchain;
use zakat_ledger::core::ledger::{self, BalanceCache};
use zakat_ledger::core::validator::{ChainValidator, validate_chain};
use zakat_ledger::storage::snapshot::Snapshot;
use zakat_ledger::types::amount::Amount;

const ZAKAT_ACCOUNT: &str = "Zakat_Account";
const ACCOUNTS: usize = 16;

// ---------------------------------------------------------------------------
// Benchmark harness
// ---------------------------------------------------------------------------

struct BenchResult {
    name: String,
    iterations: u64,
    total: Duration,
    /// Items processed per run (transactions or blocks), for the per-item column.
    items: u64,
}

impl BenchResult {
    fn avg(&self) -> Duration {
        self.total / self.iterations.max(1) as u32
    }

    fn print(&self) {
        let ns_per_op = self.avg().as_nanos();
        let ns_per_item = if self.items > 0 {
            format!("{:>10.1}", ns_per_op as f64 / self.items as f64)
        } else {
            "         -".to_string()
        };
        println!(
            "  {:<36} {:>7} iters {:>12.3} us/iter {} ns/item",
            self.name,
            self.iterations,
            ns_per_op as f64 / 1000.0,
            ns_per_item,
        );
    }
}

/// Runs `f` for at least `min_duration`, returning aggregated results.
fn bench<F>(name: impl Into<String>, min_duration: Duration, items: u64, mut f: F) -> BenchResult
where
    F: FnMut(),
{
    // Warmup
    for _ in 0..3 {
        f();
    }

    let mut iterations = 0u64;
    let start = Instant::now();
    while start.elapsed() < min_duration {
        f();
        iterations += 1;
    }

    BenchResult {
        name: name.into(),
        iterations,
        total: start.elapsed(),
        items,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn account_name(i: usize) -> String {
    format!("acct{:02}", i)
}

fn registry() -> AccountRegistry {
    let mut accounts: Vec<Account> = (0..ACCOUNTS)
        .filter_map(|i| {
            Account::new(&account_name(i), Amount::from_coins(1_000_000), &format!("{}", 1000 + i), 0)
                .ok()
        })
        .collect();
    accounts.extend(Account::new(ZAKAT_ACCOUNT, Amount::ZERO, "0000", 0).ok());
    AccountRegistry::from_accounts(accounts).unwrap_or_default()
}

/// Chain of `blocks` blocks with `per_block` checked transfers each.
fn build_chain(registry: &AccountRegistry, blocks: usize, per_block: usize) -> Blockchain {
    let zakat = AccountId::from(ZAKAT_ACCOUNT);
    let mut chain = Blockchain::new("0000", 0);
    let mut clock = 1u64;
    for b in 0..blocks {
        for t in 0..per_block {
            let from = account_name((b + t) % ACCOUNTS);
            let to = account_name((b + t + 1) % ACCOUNTS);
            let amount = Amount::from_units(1_000_000 + (t as i128) * 37);
            match ledger::create_transfer(registry, &chain, &from, &to, amount, &zakat, clock) {
                Ok(tx) => chain.push_pending(tx),
                Err(e) => eprintln!("fixture transfer failed: {}", e),
            }
            clock += 1;
        }
        let seed = format!("{}", 1000 + b % ACCOUNTS);
        if let Err(e) = chain.mine(&seed, clock) {
            eprintln!("fixture mine failed: {}", e);
        }
    }
    chain
}

fn main() {
    let min = Duration::from_millis(500);
    let registry = registry();
    let validator = ChainValidator::new(AccountId::from(ZAKAT_ACCOUNT));

    println!("Block hashing");
    for per_block in [1usize, 10, 100] {
        let chain = build_chain(&registry, 1, per_block);
        let Some(block) = chain.block(1) else {
            continue;
        };
        bench(
            format!("compute_hash ({} txs)", per_block),
            min,
            per_block as u64,
            || {
                std::hint::black_box(compute_hash(
                    &block.transactions,
                    block.timestamp,
                    &block.seed_key,
                    &block.prev_hash,
                ));
            },
        )
        .print();
    }

    println!("\nSubmit and mine");
    for per_block in [10usize, 50] {
        bench(
            format!("build 10 blocks x {} txs", per_block),
            min,
            (10 * per_block) as u64,
            || {
                std::hint::black_box(build_chain(&registry, 10, per_block));
            },
        )
        .print();
    }

    println!("\nValidation and replay");
    for blocks in [10usize, 100, 500] {
        let chain = build_chain(&registry, blocks, 10);
        let txs = chain.committed_count() as u64;

        bench(format!("validate_chain ({} blocks)", blocks), min, blocks as u64, || {
            std::hint::black_box(validate_chain(&validator, &chain).is_valid());
        })
        .print();

        bench(format!("replay all ({} txs)", txs), min, txs, || {
            std::hint::black_box(ledger::replay(&registry, &chain, false).ok());
        })
        .print();

        bench(format!("balance_of uncached ({} txs)", txs), min, txs, || {
            std::hint::black_box(ledger::balance_of(&registry, &chain, "acct00", false).ok());
        })
        .print();

        let cache = BalanceCache::new();
        bench(format!("balance_of cached ({} txs)", txs), min, 0, || {
            std::hint::black_box(cache.committed_balance(&registry, &chain, "acct00").ok());
        })
        .print();

        let (blocks_vec, pending) = chain.clone().into_parts();
        let snapshot = Snapshot {
            accounts: registry.to_vec(),
            blocks: blocks_vec,
            pending,
        };
        let bytes = snapshot.to_file_bytes();
        bench(
            format!("snapshot encode ({} KiB)", bytes.len() / 1024),
            min,
            txs,
            || {
                std::hint::black_box(snapshot.to_file_bytes());
            },
        )
        .print();
        bench(
            format!("snapshot decode ({} KiB)", bytes.len() / 1024),
            min,
            txs,
            || {
                std::hint::black_box(Snapshot::from_file_bytes(&bytes).ok());
            },
        )
        .print();
    }
}
