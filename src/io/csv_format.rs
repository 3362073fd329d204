//! CSV format handling for operation records and balance output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to domain operations
//! - Balance output serialization
//!
//! Input columns are `op,account,to,amount`:
//!
//! ```text
//! op,account,to,amount
//! create,,,100.50
//! transfer,1,2,10
//! ```
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Account, AccountError, AccountId, AccountOperation};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// `account` and `to` are only meaningful for transfers; `amount` is the
/// opening balance for creates and the transferred amount for transfers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    pub op: String,
    pub account: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Option<String>,
}

/// Precision policy applied to amounts at the parse boundary
///
/// The core itself accepts any `Decimal`; a maximum scale is a validation
/// convenience of the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmountPolicy {
    /// Maximum number of fractional digits, unlimited when `None`
    pub max_scale: Option<u32>,
}

impl AmountPolicy {
    pub fn with_max_scale(max_scale: u32) -> Self {
        Self {
            max_scale: Some(max_scale),
        }
    }

    /// Check `amount` against this policy
    pub fn check(&self, amount: Decimal) -> Result<Decimal, AccountError> {
        match self.max_scale {
            Some(max_scale) if amount.normalize().scale() > max_scale => {
                Err(AccountError::scale_exceeded(amount, max_scale))
            }
            _ => Ok(amount),
        }
    }
}

/// Convert a CsvRecord to an AccountOperation
///
/// This function:
/// - Parses the operation string (case insensitive)
/// - Parses the amount string into a Decimal (if present) and applies `policy`
/// - Validates that transfers name both accounts
///
/// A transfer without an amount is passed through; the coordinator rejects it
/// with `MissingAmount`.
///
/// # Returns
///
/// Result containing either:
/// - Ok(AccountOperation) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(
    csv_record: CsvRecord,
    policy: &AmountPolicy,
) -> Result<AccountOperation, String> {
    // Parse amount if present
    let amount = match csv_record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => {
            let amount = Decimal::from_str(amount_str.trim())
                .map_err(|_| format!("Invalid amount '{}'", amount_str))?;
            Some(policy.check(amount).map_err(|e| e.to_string())?)
        }
        _ => None,
    };

    match csv_record.op.to_lowercase().as_str() {
        "create" => Ok(AccountOperation::Create {
            opening_balance: amount,
        }),
        "transfer" => match (csv_record.account, csv_record.to) {
            (Some(from), Some(to)) => Ok(AccountOperation::Transfer { from, to, amount }),
            _ => Err("transfer requires both 'account' and 'to'".to_string()),
        },
        _ => Err(format!("Invalid operation: '{}'", csv_record.op)),
    }
}

/// Write account balances to CSV format
///
/// Writes accounts with columns: account, balance. Accounts are sorted by id
/// for deterministic output and balances keep their exact decimal scale.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_balances_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(Account::id);

    for account in sorted_accounts {
        writer
            .write_record(&[account.id().to_string(), account.balance().to_string()])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
