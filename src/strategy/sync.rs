//! Synchronous processing strategy
//!
//! Single-threaded replay: operations are executed one at a time in input
//! order through a `TransferCoordinator` backed by a fresh `MemoryGateway`.
//! The coordinator's locks are still taken, but never contended.

use crate::core::TransferCoordinator;
use crate::io::csv_format::{write_balances_csv, AmountPolicy};
use crate::io::sync_reader::SyncReader;
use crate::store::MemoryGateway;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Synchronous processing strategy
///
/// ```no_run
/// use rust_accounts_engine::io::csv_format::AmountPolicy;
/// use rust_accounts_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
///
/// let strategy = SyncProcessingStrategy::new(AmountPolicy::default());
/// let mut output = std::io::stdout();
///
/// strategy.process(Path::new("operations.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncProcessingStrategy {
    policy: AmountPolicy,
}

impl SyncProcessingStrategy {
    pub fn new(policy: AmountPolicy) -> Self {
        Self { policy }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let store = Arc::new(MemoryGateway::new());
        let coordinator = TransferCoordinator::new(store.clone());

        let reader = SyncReader::new(input_path, self.policy)?;

        for result in reader {
            match result {
                Ok(operation) => {
                    if let Err(e) = coordinator.execute(operation.clone()) {
                        warn!(kind = ?e.kind(), error = %e, ?operation, "operation rejected");
                    }
                }
                Err(e) => warn!(error = %e, "CSV parsing error"),
            }
        }

        let accounts = store.accounts().map_err(|e| e.to_string())?;
        write_balances_csv(&accounts, output)?;

        Ok(())
    }
}
