//! Error types for the accounts engine
//!
//! Every operation on accounts returns a tagged `AccountError` instead of
//! unwinding. Each variant keeps the fields a caller needs to render a precise
//! message (account id, requested delta, balance at the time of the check).
//!
//! # Error Categories
//!
//! Variants are grouped into four [`ErrorKind`]s which the outer request layer
//! maps to distinct response categories:
//!
//! - **InvalidArgument**: malformed input, rejected before any lock or storage call
//! - **NotFound**: the account does not exist or vanished before commit
//! - **LimitExceeded**: withdrawal larger than the available balance
//! - **Gateway**: unrecoverable storage failure, propagated without retry

use super::account::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for account operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccountError {
    /// Amount is negative (balances) or not positive (deltas and transfers)
    #[error("{reason}: {amount}")]
    InvalidAmount {
        /// Which rule the amount broke
        reason: String,
        /// The offending amount
        amount: Decimal,
    },

    /// Amount field is missing where one is required
    #[error("{operation} requires an amount")]
    MissingAmount {
        /// Operation that requires the amount
        operation: String,
    },

    /// Amount carries more fractional digits than the configured policy allows
    #[error("amount {amount} exceeds the maximum scale of {max_scale}")]
    ScaleExceeded {
        amount: Decimal,
        max_scale: u32,
    },

    /// Source and destination of a transfer are the same account
    #[error("fromAccountId == toAccountId: {account}")]
    SameAccount {
        account: AccountId,
    },

    /// Account does not exist
    #[error("No such account: {account}")]
    NotFound {
        account: AccountId,
    },

    /// Withdrawal larger than the balance
    ///
    /// `balance` is the balance observed at the time of the check.
    #[error("Failed to withdraw from account: {account}: delta: {delta} is greater than amount: {balance}")]
    LimitExceeded {
        account: AccountId,
        delta: Decimal,
        balance: Decimal,
    },

    /// Balance arithmetic could not be represented
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        operation: String,
        account: AccountId,
    },

    /// Exact result needs more fractional digits than `Decimal` can hold
    #[error("Precision loss in {operation} for account {account}: {balance} and {delta} have no exact result")]
    PrecisionLoss {
        operation: String,
        account: AccountId,
        balance: Decimal,
        delta: Decimal,
    },

    /// Unrecoverable persistence gateway failure
    #[error("Storage failure: {message}")]
    Storage {
        message: String,
    },
}

/// Response category of an [`AccountError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    LimitExceeded,
    Gateway,
}

impl AccountError {
    /// Classify this error into its response category
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::InvalidAmount { .. }
            | AccountError::MissingAmount { .. }
            | AccountError::ScaleExceeded { .. }
            | AccountError::SameAccount { .. }
            | AccountError::ArithmeticOverflow { .. }
            | AccountError::PrecisionLoss { .. } => ErrorKind::InvalidArgument,
            AccountError::NotFound { .. } => ErrorKind::NotFound,
            AccountError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            AccountError::Storage { .. } => ErrorKind::Gateway,
        }
    }
}

// Helper functions for creating common errors

impl AccountError {
    /// Create an InvalidAmount error for a negative balance
    pub fn negative_amount(amount: Decimal) -> Self {
        AccountError::InvalidAmount {
            reason: "amount is negative".to_string(),
            amount,
        }
    }

    /// Create an InvalidAmount error for a zero or negative delta
    pub fn non_positive_delta(amount: Decimal) -> Self {
        AccountError::InvalidAmount {
            reason: "delta is not positive".to_string(),
            amount,
        }
    }

    /// Create an InvalidAmount error for a zero or negative transfer amount
    pub fn non_positive_amount(amount: Decimal) -> Self {
        AccountError::InvalidAmount {
            reason: "amount is not positive".to_string(),
            amount,
        }
    }

    /// Create a MissingAmount error
    pub fn missing_amount(operation: &str) -> Self {
        AccountError::MissingAmount {
            operation: operation.to_string(),
        }
    }

    /// Create a ScaleExceeded error
    pub fn scale_exceeded(amount: Decimal, max_scale: u32) -> Self {
        AccountError::ScaleExceeded { amount, max_scale }
    }

    /// Create a SameAccount error
    pub fn same_account(account: AccountId) -> Self {
        AccountError::SameAccount { account }
    }

    /// Create a NotFound error
    pub fn not_found(account: AccountId) -> Self {
        AccountError::NotFound { account }
    }

    /// Create a LimitExceeded error
    pub fn limit_exceeded(account: AccountId, delta: Decimal, balance: Decimal) -> Self {
        AccountError::LimitExceeded {
            account,
            delta,
            balance,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        AccountError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a PrecisionLoss error
    pub fn precision_loss(
        operation: &str,
        account: AccountId,
        balance: Decimal,
        delta: Decimal,
    ) -> Self {
        AccountError::PrecisionLoss {
            operation: operation.to_string(),
            account,
            balance,
            delta,
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        AccountError::Storage {
            message: message.into(),
        }
    }
}
