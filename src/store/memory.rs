//! In-process transactional account store
//!
//! This module provides `MemoryGateway`, an implementation of
//! [`AccountGateway`] that keeps the account table and the audit log behind a
//! single `RwLock`. Every write method runs as one critical section, which
//! gives the same all-or-nothing visibility a database transaction would.
//!
//! It also exposes a few hooks for exercising failure paths: removing an
//! account behind the coordinator's back and taking the store offline.

use crate::core::traits::{AccountGateway, PairUpdate, TransferAudit};
use crate::types::{Account, AccountError, AccountId};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Decimal>,
    audit: Vec<TransferAudit>,
    last_id: AccountId,
}

impl Tables {
    fn update_row(&mut self, account: &Account) -> u64 {
        match self.accounts.get_mut(&account.id()) {
            Some(balance) => {
                *balance = account.balance();
                1
            }
            None => 0,
        }
    }
}

/// Transactional in-memory account store
#[derive(Debug, Default)]
pub struct MemoryGateway {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store; every call fails with `Storage` while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delete an account row, bypassing the coordinator
    ///
    /// Returns whether the row existed.
    pub fn remove(&self, account_id: AccountId) -> Result<bool, AccountError> {
        Ok(self.write()?.accounts.remove(&account_id).is_some())
    }

    /// Snapshot of all accounts ordered by id
    pub fn accounts(&self) -> Result<Vec<Account>, AccountError> {
        self.read()?
            .accounts
            .iter()
            .map(|(&id, &balance)| Account::new(id, balance))
            .collect()
    }

    /// Snapshot of the audit log in commit order
    pub fn audit_log(&self) -> Result<Vec<TransferAudit>, AccountError> {
        Ok(self.read()?.audit.clone())
    }

    fn check_online(&self) -> Result<(), AccountError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AccountError::storage("store is offline"));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, AccountError> {
        self.check_online()?;
        self.tables
            .read()
            .map_err(|_| AccountError::storage("store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AccountError> {
        self.check_online()?;
        self.tables
            .write()
            .map_err(|_| AccountError::storage("store lock poisoned"))
    }
}

impl AccountGateway for MemoryGateway {
    fn select(&self, account_id: AccountId) -> Result<Option<Account>, AccountError> {
        self.read()?
            .accounts
            .get(&account_id)
            .map(|&balance| Account::new(account_id, balance))
            .transpose()
    }

    fn insert(&self, opening_balance: Decimal) -> Result<AccountId, AccountError> {
        if opening_balance < Decimal::ZERO {
            return Err(AccountError::negative_amount(opening_balance));
        }
        let mut tables = self.write()?;
        tables.last_id += 1;
        let id = tables.last_id;
        tables.accounts.insert(id, opening_balance);
        Ok(id)
    }

    fn update(&self, account: &Account) -> Result<u64, AccountError> {
        Ok(self.write()?.update_row(account))
    }

    fn ping(&self) -> Result<(), AccountError> {
        self.read().map(|_| ())
    }

    fn apply_transfer(
        &self,
        audit: &TransferAudit,
        from: &Account,
        to: &Account,
    ) -> Result<PairUpdate, AccountError> {
        let mut tables = self.write()?;

        let rows = PairUpdate {
            from_rows: u64::from(tables.accounts.contains_key(&from.id())),
            to_rows: u64::from(tables.accounts.contains_key(&to.id())),
        };
        if !rows.is_complete() {
            // Roll back: nothing has been written yet
            return Ok(rows);
        }

        tables.audit.push(audit.clone());
        tables.update_row(from);
        tables.update_row(to);
        Ok(rows)
    }
}
