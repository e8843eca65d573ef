//! Account Ledger CLI
//!
//! Replays a CSV file of ledger operations and prints the resulting
//! account states.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > accounts.csv
//! cargo run -- operations.csv --snapshot ledger.json
//! cargo run -- more.csv --restore ledger.json --history alice
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use account_ledger::{create_tracker, replay, Address, Ledger, LedgerSnapshot, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "ledger", version, about = "Replay ledger operations from CSV")]
struct Cli {
    /// CSV file of operations (op,address,counterparty,amount,timestamp)
    input: PathBuf,

    /// Start from this JSON snapshot instead of an empty ledger
    #[arg(long, value_name = "PATH")]
    restore: Option<PathBuf>,

    /// Write the resulting ledger to this JSON snapshot
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Print this account's transaction history instead of the summary
    #[arg(long, value_name = "ADDRESS")]
    history: Option<String>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let ledger = match &cli.restore {
        Some(path) => {
            let snapshot = LedgerSnapshot::read_json(BufReader::new(File::open(path)?))?;
            Ledger::restore(snapshot)?
        }
        None => create_tracker(),
    };

    let file = File::open(&cli.input)?;
    let summary = replay::process_csv(&ledger, BufReader::new(file))?;
    info!(
        "Applied {} operations, rejected {}",
        summary.applied, summary.rejected
    );

    if let Some(path) = &cli.snapshot {
        ledger.snapshot().write_json(BufWriter::new(File::create(path)?))?;
    }

    let stdout = io::stdout();
    let handle = stdout.lock();
    match &cli.history {
        Some(address) => replay::write_history(&ledger, &Address::new(address), handle)?,
        None => replay::write_output(&ledger, handle)?,
    }

    Ok(())
}
