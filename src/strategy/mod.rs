//! Processing strategy module for operation replay
//!
//! This module defines the Strategy pattern for complete processing pipelines,
//! encompassing both CSV parsing and execution through the transfer
//! coordinator. Different implementations (single-threaded, multi-worker) can
//! be selected at runtime.

use crate::cli::StrategyType;
use crate::io::csv_format::AmountPolicy;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the operations in `input_path` and write final balances to `output`
    ///
    /// # Returns
    ///
    /// * `Ok(())` if all processing completed (individual operations may have been rejected)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error, store failure)
    ///
    /// Rejected operations are logged and do not stop processing.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` is only used by the async strategy; defaults apply when `None`.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    policy: AmountPolicy,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(policy)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, policy))
        }
    }
}
