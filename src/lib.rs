//! Rust Accounts Engine Library
//! # Overview
//!
//! This library maintains account balances and performs transfers between
//! accounts under concurrent access. It guarantees that no balance ever goes
//! negative and that a transfer either updates both accounts or neither.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, TransferRequest, errors)
//! - [`core`] - Business logic components:
//!   - [`core::lock_registry`] - One mutex per account id, reclaimed when unused
//!   - [`core::coordinator`] - Lock-ordered, all-or-nothing transfers
//!   - [`core::traits`] - Persistence gateway contract
//! - [`store`] - Transactional in-process gateway implementation
//! - [`io`] - Operation file parsing and balance output
//! - [`strategy`] - Sync and multi-worker drivers replaying an operation file
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - Tracing subscriber setup
//!
//! # Deadlock avoidance
//!
//! A transfer locks `min(from, to)` first and `max(from, to)` second and
//! never holds any other lock, so concurrent transfers cannot wait on each
//! other in a cycle. Transfers on disjoint account pairs never contend.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod store;
pub mod strategy;
pub mod types;

pub use core::{AccountGateway, LockRegistry, TransferCoordinator};
pub use io::write_balances_csv;
pub use store::MemoryGateway;
pub use types::{Account, AccountError, AccountId, AccountOperation, ErrorKind, TransferRequest};
