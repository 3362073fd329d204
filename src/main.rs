//! Rust Accounts Engine CLI
//!
//! Command-line interface for replaying account creations and transfers from
//! CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > balances.csv
//! cargo run -- --strategy sync operations.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --workers 8 operations.csv > balances.csv
//! RUST_LOG=debug cargo run -- --max-scale 2 operations.csv > balances.csv
//! ```
//!
//! Final balances go to stdout; logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success (rejected operations are logged, not fatal)
//! - 1: Error (file not found, file not readable, store failure, etc.)

use rust_accounts_engine::cli;
use rust_accounts_engine::logging;
use rust_accounts_engine::strategy;
use std::process;
use tracing::error;

fn main() {
    let args = cli::parse_args();
    logging::init_logging(&args.log_level);

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config, args.amount_policy())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!(error = %e, "processing failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
