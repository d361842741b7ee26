//! Interactive zakat ledger shell.
//!
//! Opens a ledger and reads commands from stdin, one per line.
//!
//! # Usage
//! ```text
//! zakat-ledger [OPTIONS]
//! ```
//!
//! # Options
//! - `--data <path>`: Ledger file (defaults to `ZAKAT_DATA`, then
//!   `~/.zakat-ledger/ledger.bin`)
//! - `--memory`: Keep the ledger in memory only
//!
//! Other settings come from `ZAKAT_*` environment variables; see
//! `LedgerConfig::from_env`.

use ledger_derive::Error;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use zakat_ledger::config::LedgerConfig;
use zakat_ledger::core::errors::LedgerError;
use zakat_ledger::service::ZakatLedger;
use zakat_ledger::storage::ChainStore;
use zakat_ledger::storage::file_store::FileStore;
use zakat_ledger::types::amount::{Amount, AmountParseError};
use zakat_ledger::utils::log::set_level;
use zakat_ledger::utils::time::format_utc;
use zakat_ledger::{error, info};

const HELP: &str = "\
Commands:
  register <name> <seed> [balance]   register an account (balance defaults to the configured opening balance)
  transfer <from> <to> <amount>      queue a transfer; 2.5% zakat is added to the sender's debit
  mine [seed]                        seal pending transfers into a block (seed defaults to the first sender's)
  balance <name>                     committed and pending-inclusive balance
  accounts                           list accounts and balances
  pending                            list transfers waiting to be mined
  history                            list committed transfers
  chain                              list blocks
  validate                           check every block hash and link
  stats                              ledger totals
  help                               show this message
  quit                               leave the shell";

#[derive(Debug, Error)]
enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Ledger(LedgerError),

    #[error("{0}")]
    Amount(AmountParseError),

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
}

impl From<LedgerError> for CommandError {
    fn from(err: LedgerError) -> Self {
        CommandError::Ledger(err)
    }
}

impl From<AmountParseError> for CommandError {
    fn from(err: AmountParseError) -> Self {
        CommandError::Amount(err)
    }
}

enum Flow {
    Continue,
    Quit,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut data_path: Option<PathBuf> = None;
    let mut in_memory = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--data" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("--data requires an argument");
                    process::exit(1);
                }
                data_path = Some(PathBuf::from(&args[i]));
                i += 1;
            }
            "--memory" => {
                in_memory = true;
                i += 1;
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                eprintln!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let mut config = match LedgerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    set_level(config.log_level);
    if data_path.is_some() {
        config.data_path = data_path;
    }

    if in_memory {
        info!("Starting in-memory ledger");
        match ZakatLedger::in_memory(config) {
            Ok(ledger) => run_shell(&ledger),
            Err(e) => {
                error!("Failed to create ledger: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let path = match config.resolve_data_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let store = match FileStore::open(&path) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            process::exit(1);
        }
    };
    info!("Using ledger file {}", path.display());
    match ZakatLedger::open(config, store) {
        Ok(ledger) => run_shell(&ledger),
        Err(e) => {
            error!("Failed to load ledger: {}", e);
            process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [--data <path>] [--memory]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --data <path>  Ledger file (default: $ZAKAT_DATA or ~/.zakat-ledger/ledger.bin)");
    eprintln!("  --memory       Keep the ledger in memory only");
    eprintln!();
    eprintln!("{}", HELP);
}

fn run_shell<S: ChainStore>(ledger: &ZakatLedger<S>) {
    println!("Zakat ledger ready. Type 'help' for commands.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                error!("Failed to read input: {}", e);
                break;
            }
            None => break,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        match execute(ledger, &words) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("error: {}", e),
        }
    }
}

fn execute<S: ChainStore>(ledger: &ZakatLedger<S>, words: &[&str]) -> Result<Flow, CommandError> {
    match words {
        ["register", name, seed] => {
            let id = ledger.register_account(name, None, seed)?;
            println!("registered {}", id);
        }
        ["register", name, seed, balance] => {
            let balance: Amount = balance.parse()?;
            let id = ledger.register_account(name, Some(balance), seed)?;
            println!("registered {} with {}", id, balance);
        }
        ["register", ..] => return Err(CommandError::Usage("register <name> <seed> [balance]")),

        ["transfer", from, to, amount] => {
            let amount: Amount = amount.parse()?;
            let id = ledger.submit_transfer(from, to, amount)?;
            println!("queued transfer {}", id.short(16));
        }
        ["transfer", ..] => return Err(CommandError::Usage("transfer <from> <to> <amount>")),

        ["mine"] => print_mined(ledger, ledger.mine_with_sender_seed()?),
        ["mine", seed] => print_mined(ledger, ledger.mine(seed)?),
        ["mine", ..] => return Err(CommandError::Usage("mine [seed]")),

        ["balance", name] => {
            let committed = ledger.balance_of(name)?;
            let pending = ledger.balance_including_pending(name)?;
            println!("{}: {} (with pending: {})", name, committed, pending);
        }
        ["balance", ..] => return Err(CommandError::Usage("balance <name>")),

        ["accounts"] => print_accounts(ledger)?,
        ["pending"] => print_pending(ledger),
        ["history"] => print_history(ledger),
        ["chain"] => print_chain(ledger),
        ["validate"] => print_validation(ledger),
        ["stats"] => print_stats(ledger)?,
        ["help"] => println!("{}", HELP),
        ["quit"] | ["exit"] => return Ok(Flow::Quit),
        [other, ..] => return Err(CommandError::Unknown(other.to_string())),
        [] => {}
    }
    Ok(Flow::Continue)
}

fn print_mined<S: ChainStore>(ledger: &ZakatLedger<S>, index: usize) {
    if let Some(block) = ledger.block(index) {
        println!(
            "mined block {} with {} transfers, hash {}",
            index,
            block.transactions.len(),
            block.hash
        );
    }
}

fn print_accounts<S: ChainStore>(ledger: &ZakatLedger<S>) -> Result<(), CommandError> {
    let committed = ledger.balances(false)?;
    let pending = ledger.balances(true)?;
    println!("{:<20} {:<10} {:>18} {:>18}", "ACCOUNT", "SEED", "BALANCE", "WITH PENDING");
    for ((id, committed), (_, with_pending)) in committed.iter().zip(&pending) {
        let seed = ledger
            .account(id.as_str())
            .map(|a| a.seed_key)
            .unwrap_or_default();
        println!("{:<20} {:<10} {:>18} {:>18}", id, seed, committed, with_pending);
    }
    Ok(())
}

fn print_pending<S: ChainStore>(ledger: &ZakatLedger<S>) {
    let pending = ledger.pending();
    if pending.is_empty() {
        println!("no pending transfers");
        return;
    }
    println!(
        "{:<23} {:<15} {:<15} {:>14} {:>12}",
        "TIME", "FROM", "TO", "AMOUNT", "ZAKAT"
    );
    for tx in pending {
        println!(
            "{:<23} {:<15} {:<15} {:>14} {:>12}",
            format_utc(tx.timestamp),
            tx.sender,
            tx.receiver,
            tx.amount,
            tx.zakat_amount
        );
    }
}

fn print_history<S: ChainStore>(ledger: &ZakatLedger<S>) {
    let history = ledger.history();
    if history.is_empty() {
        println!("no committed transfers");
        return;
    }
    println!(
        "{:>5} {:<23} {:<15} {:<15} {:>14} {:>12}",
        "BLOCK", "TIME", "FROM", "TO", "AMOUNT", "ZAKAT"
    );
    for entry in history {
        let tx = entry.transaction;
        println!(
            "{:>5} {:<23} {:<15} {:<15} {:>14} {:>12}",
            entry.block_index,
            format_utc(tx.timestamp),
            tx.sender,
            tx.receiver,
            tx.amount,
            tx.zakat_amount
        );
    }
}

fn print_chain<S: ChainStore>(ledger: &ZakatLedger<S>) {
    println!(
        "{:>5} {:<23} {:>4} {:<10} {:<18} {:<18}",
        "INDEX", "SEALED", "TXS", "SEED", "HASH", "PREVIOUS"
    );
    for (index, block) in ledger.blocks().iter().enumerate() {
        println!(
            "{:>5} {:<23} {:>4} {:<10} {:<18} {:<18}",
            index,
            format_utc(block.timestamp),
            block.transactions.len(),
            block.seed_key,
            block.hash.short(16),
            block.prev_hash.short(16)
        );
    }
}

fn print_validation<S: ChainStore>(ledger: &ZakatLedger<S>) {
    let report = ledger.validate();
    if report.is_valid() {
        println!("chain valid ({} blocks)", report.blocks_checked());
        return;
    }
    println!(
        "chain INVALID: {} of {} blocks failed",
        report.faults().len(),
        report.blocks_checked()
    );
    for fault in report.faults() {
        println!("  block {}: {}", fault.index, fault.error);
    }
}

fn print_stats<S: ChainStore>(ledger: &ZakatLedger<S>) -> Result<(), CommandError> {
    let stats = ledger.stats();
    println!("accounts:               {}", stats.accounts);
    println!("blocks:                 {}", stats.blocks);
    println!("pending transfers:      {}", stats.pending);
    println!("committed transfers:    {}", stats.committed_transactions);
    println!("total supply:           {}", ledger.total_supply()?);
    println!("seed keys used:         {}", ledger.seed_keys_used().join(", "));
    let collected = ledger.balance_of(ledger.config().zakat_account.as_str())?;
    println!("zakat collected:        {}", collected);
    Ok(())
}
