//! Account-related types for the accounts engine
//!
//! This module defines the Account entity and its validated balance
//! arithmetic. An `Account` has no concurrency awareness of its own; callers
//! that share one across threads must serialise access externally (the
//! transfer coordinator does so through the lock registry).

use super::error::AccountError;
use rust_decimal::Decimal;

/// Account identifier
///
/// Opaque unsigned integer assigned by the persistence gateway on insert.
pub type AccountId = u64;

/// Balance-holding account
///
/// The balance is an exact decimal and is never negative at any observable
/// point. The identifier is fixed at construction and has no setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    balance: Decimal,
}

impl Account {
    /// Create an account with the given identifier and balance
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if `balance` is negative.
    pub fn new(id: AccountId, balance: Decimal) -> Result<Self, AccountError> {
        let mut account = Account {
            id,
            balance: Decimal::ZERO,
        };
        account.set_balance(balance)?;
        Ok(account)
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Replace the balance
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if `value` is negative. The balance is left
    /// untouched on error.
    pub fn set_balance(&mut self, value: Decimal) -> Result<(), AccountError> {
        if value < Decimal::ZERO {
            return Err(AccountError::negative_amount(value));
        }
        self.balance = value;
        Ok(())
    }

    /// Check whether `delta` can be withdrawn
    ///
    /// # Returns
    ///
    /// `Ok(true)` iff `delta <= balance`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if `delta` is zero or negative.
    pub fn can_withdraw(&self, delta: Decimal) -> Result<bool, AccountError> {
        check_delta(delta)?;
        Ok(delta <= self.balance)
    }

    /// Decrease the balance by `delta`
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `delta` is zero or negative
    /// - `LimitExceeded` if `delta` is greater than the balance
    /// - `PrecisionLoss` if the exact difference cannot be represented
    pub fn withdraw(&mut self, delta: Decimal) -> Result<(), AccountError> {
        if !self.can_withdraw(delta)? {
            return Err(AccountError::limit_exceeded(self.id, delta, self.balance));
        }
        // delta <= balance, so the result is non-negative
        let result = self
            .balance
            .checked_sub(delta)
            .ok_or_else(|| AccountError::arithmetic_overflow("withdraw", self.id))?;
        self.balance = self.exact("withdraw", delta, result)?;
        Ok(())
    }

    /// Increase the balance by `delta`
    ///
    /// There is no upper bound beyond what `Decimal` can represent.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `delta` is zero or negative
    /// - `ArithmeticOverflow` if the sum cannot be represented
    /// - `PrecisionLoss` if the exact sum needs more fractional digits than `Decimal` holds
    pub fn deposit(&mut self, delta: Decimal) -> Result<(), AccountError> {
        check_delta(delta)?;
        let result = self
            .balance
            .checked_add(delta)
            .ok_or_else(|| AccountError::arithmetic_overflow("deposit", self.id))?;
        self.balance = self.exact("deposit", delta, result)?;
        Ok(())
    }

    // rust_decimal rounds sums that need more than 28 fractional digits,
    // which lowers the scale below that of the operands
    fn exact(
        &self,
        operation: &str,
        delta: Decimal,
        result: Decimal,
    ) -> Result<Decimal, AccountError> {
        if result.scale() < self.balance.scale().max(delta.scale()) {
            return Err(AccountError::precision_loss(operation, self.id, self.balance, delta));
        }
        Ok(result)
    }
}

fn check_delta(delta: Decimal) -> Result<(), AccountError> {
    if delta <= Decimal::ZERO {
        return Err(AccountError::non_positive_delta(delta));
    }
    Ok(())
}
