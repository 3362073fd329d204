//! Concurrent batch execution for the multi-worker driver
//!
//! This module provides the `BatchProcessor` struct, which runs one batch of
//! operations through a shared `TransferCoordinator`.
//!
//! # Design
//!
//! Account creation receives ids from storage in arrival order, so a batch's
//! creates run first, sequentially, in input order. The batch's transfers are
//! then dispatched together onto tokio's blocking pool: the coordinator blocks
//! on account locks and on the gateway, so each transfer gets its own blocking
//! task. The coordinator's lock ordering keeps overlapping transfers serialised
//! and deadlock-free; disjoint ones run in parallel.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Arc<TransferCoordinator>  (shared, lock-ordered transfers)
//! ```

use std::sync::Arc;

use super::{OperationOutcome, TransferCoordinator};
use crate::types::{AccountError, AccountOperation};
use futures::future::join_all;
use tracing::{error, warn};

/// Result of executing a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was executed
    pub operation: AccountOperation,

    /// The outcome (success or error)
    pub result: Result<OperationOutcome, AccountError>,
}

/// Batch processor sharing one coordinator across blocking tasks
#[derive(Clone)]
pub struct BatchProcessor {
    coordinator: Arc<TransferCoordinator>,
}

impl BatchProcessor {
    pub fn new(coordinator: Arc<TransferCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Split a batch into creates and transfers, keeping input order in each
    pub fn partition(
        batch: Vec<AccountOperation>,
    ) -> (Vec<AccountOperation>, Vec<AccountOperation>) {
        batch.into_iter().partition(AccountOperation::is_create)
    }

    /// Execute a batch
    ///
    /// Creates run first in input order, then all transfers concurrently.
    /// Every operation is executed even if others fail; failures are logged
    /// and returned in the results. Creates come first in the result, followed
    /// by transfers in input order.
    pub async fn process_batch(&self, batch: Vec<AccountOperation>) -> Vec<ProcessingResult> {
        let (creates, transfers) = Self::partition(batch);
        let mut results = Vec::with_capacity(creates.len() + transfers.len());

        if !creates.is_empty() {
            let coordinator = Arc::clone(&self.coordinator);
            let task = tokio::task::spawn_blocking(move || {
                creates
                    .into_iter()
                    .map(|operation| execute(&coordinator, operation))
                    .collect::<Vec<_>>()
            });
            match task.await {
                Ok(created) => results.extend(created),
                Err(e) => error!(error = %e, "create task failed"),
            }
        }

        let tasks = transfers.into_iter().map(|operation| {
            let coordinator = Arc::clone(&self.coordinator);
            tokio::task::spawn_blocking(move || execute(&coordinator, operation))
        });

        for task in join_all(tasks).await {
            match task {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "transfer task failed"),
            }
        }

        results
    }
}

fn execute(coordinator: &TransferCoordinator, operation: AccountOperation) -> ProcessingResult {
    let result = coordinator.execute(operation.clone());
    if let Err(e) = &result {
        warn!(kind = ?e.kind(), error = %e, ?operation, "operation rejected");
    }
    ProcessingResult { operation, result }
}
