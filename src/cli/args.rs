use crate::io::csv_format::AmountPolicy;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay account creations and transfers, then print final balances
#[derive(Parser, Debug)]
#[command(name = "accounts-engine")]
#[command(about = "Replay account creations and transfers, then print final balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing operation records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for replaying operations
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for in-order replay or 'async' for concurrent transfers"
    )]
    pub strategy: StrategyType,

    /// Number of operations per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of transfers executing at once (async mode only)
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Maximum number of transfers executing concurrently (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "info",
        help = "Log level or filter directive; overridden by RUST_LOG"
    )]
    pub log_level: String,

    /// Maximum number of fractional digits accepted in amounts
    #[arg(
        long = "max-scale",
        value_name = "DIGITS",
        help = "Reject amounts with more fractional digits than this (default: unlimited)"
    )]
    pub max_scale: Option<u32>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to defaults. Zero values are replaced by
    /// defaults with a warning (see [`BatchConfig::new`]).
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.workers.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.workers.unwrap_or(default.workers),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Amount precision policy applied while parsing input
    pub fn amount_policy(&self) -> AmountPolicy {
        match self.max_scale {
            Some(scale) => AmountPolicy::with_max_scale(scale),
            None => AmountPolicy::default(),
        }
    }
}
