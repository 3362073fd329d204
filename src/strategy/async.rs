//! Asynchronous multi-worker processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Operations are read in batches and each batch's
//! transfers run concurrently against one shared `TransferCoordinator`.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, workers)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (creates in order, transfers on the blocking pool)
//!         └── TransferCoordinator
//!             ├── LockRegistry
//!             └── MemoryGateway
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another
//! - Within a batch, creates run first in input order so ids match the sync strategy
//! - Within a batch, transfers have no ordering guarantee relative to each other;
//!   transfers sharing an account are serialised by the coordinator's locks

use crate::core::{BatchProcessor, TransferCoordinator};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{write_balances_csv, AmountPolicy};
use crate::store::MemoryGateway;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Maximum number of transfers executing at once
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            workers: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, workers: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let workers = if workers == 0 {
            warn!(workers, default = default.workers, "invalid workers, using default");
            default.workers
        } else {
            workers
        };

        Self {
            batch_size,
            workers,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    policy: AmountPolicy,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, policy: AmountPolicy) -> Self {
        Self { config, policy }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        // Blocking threads carry the transfers; cap them at the worker count
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .max_blocking_threads(self.config.workers)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let store = Arc::new(MemoryGateway::new());
            let coordinator = Arc::new(TransferCoordinator::new(store.clone()));
            let processor = BatchProcessor::new(coordinator);

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file, self.policy);

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Wait for the whole batch before reading the next one
                let results = processor.process_batch(batch).await;
                debug!(
                    executed = results.len(),
                    failed = results.iter().filter(|r| r.result.is_err()).count(),
                    "batch processed"
                );
            }

            let accounts = store.accounts().map_err(|e| e.to_string())?;
            write_balances_csv(&accounts, output)?;

            Ok(())
        })
    }
}
