//! Operation types for the accounts engine
//!
//! This module defines the transient transfer intent handled by the
//! coordinator and the operation records replayed by the drivers.

use super::account::AccountId;
use rust_decimal::Decimal;

/// Transfer intent
///
/// Exists only for the duration of one coordinator call and is never
/// persisted on its own; its effect is recorded through the two account
/// rows and the audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    /// Account to debit
    pub from: AccountId,
    /// Account to credit
    pub to: AccountId,
    /// Positive amount to move
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        TransferRequest { from, to, amount }
    }

    /// The two participant ids in lock-acquisition order (lowest first)
    pub fn lock_order(&self) -> (AccountId, AccountId) {
        if self.from < self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        }
    }
}

/// Operation record read from an operation file
///
/// Amounts stay optional here; validation happens in the coordinator so that
/// a missing amount is reported the same way regardless of the input source.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountOperation {
    /// Open a new account; `None` opens it with a zero balance
    Create { opening_balance: Option<Decimal> },

    /// Move funds between two existing accounts
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Option<Decimal>,
    },
}

impl AccountOperation {
    /// Whether this operation must run in input order
    ///
    /// Creates receive their ids from storage in arrival order, so the async
    /// driver never reorders them.
    pub fn is_create(&self) -> bool {
        matches!(self, AccountOperation::Create { .. })
    }
}
