//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: The account entity and its identifier
//! - `operation`: Transfer intents and replayable operation records
//! - `error`: Error types and their response categories

pub mod account;
pub mod error;
pub mod operation;

pub use account::{Account, AccountId};
pub use error::{AccountError, ErrorKind};
pub use operation::{AccountOperation, TransferRequest};
