//! Persistence gateway contract consumed by the coordinator
//!
//! The gateway owns durability and the authoritative balance value. Accounts
//! returned by `select` are point-in-time working copies; the coordinator
//! reconciles them with storage through the conditional updates below.

use crate::types::{Account, AccountError, AccountId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Audit entry written in the same store transaction as a transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferAudit {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    /// Who performed the transfer
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// Rows affected by a two-account transfer update
///
/// A zero on either side means that row no longer exists and the store
/// rolled the whole transaction back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairUpdate {
    pub from_rows: u64,
    pub to_rows: u64,
}

impl PairUpdate {
    pub fn is_complete(&self) -> bool {
        self.from_rows == 1 && self.to_rows == 1
    }
}

/// Trait for durable account storage
///
/// Implementations must be safe to share across threads. None of these
/// methods imply any locking at the account level; mutual exclusion is the
/// caller's concern.
pub trait AccountGateway: Send + Sync {
    /// Point-in-time read of an account
    fn select(&self, account_id: AccountId) -> Result<Option<Account>, AccountError>;

    /// Store a new account with the given opening balance and return its id
    fn insert(&self, opening_balance: Decimal) -> Result<AccountId, AccountError>;

    /// Write the account's balance if the row still exists
    ///
    /// Returns the number of rows affected (0 or 1).
    fn update(&self, account: &Account) -> Result<u64, AccountError>;

    /// Health signal for the outer health-check collaborator
    fn ping(&self) -> Result<(), AccountError>;

    /// Atomically record `audit` and write both accounts
    ///
    /// The audit entry is written first and only becomes visible together
    /// with both balance updates. If either row is missing nothing is written.
    fn apply_transfer(
        &self,
        audit: &TransferAudit,
        from: &Account,
        to: &Account,
    ) -> Result<PairUpdate, AccountError>;
}
