//! Core business logic module
//!
//! This module contains the transfer processing components:
//! - `traits` - Persistence gateway contract
//! - `lock_registry` - Per-account mutual exclusion with on-demand creation
//! - `coordinator` - Account creation, reads and lock-ordered transfers
//! - `batch_processor` - Concurrent execution of operation batches

pub mod batch_processor;
pub mod coordinator;
pub mod lock_registry;
pub mod traits;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use coordinator::{OperationOutcome, TransferCoordinator};
pub use lock_registry::{LockHandle, LockRegistry};
pub use traits::{AccountGateway, PairUpdate, TransferAudit};
