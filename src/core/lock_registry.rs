//! Per-account lock registry
//!
//! This module provides the `LockRegistry` struct, which hands out one mutual
//! exclusion handle per account id, created on demand and reclaimed once no
//! caller references it.
//!
//! # Design
//!
//! The registry keeps a `DashMap<AccountId, Weak<Mutex<()>>>`. `acquire` runs
//! under the map's entry lock for that key: it upgrades the weak pointer if a
//! live mutex exists, otherwise installs a fresh one. Two concurrent first-time
//! callers therefore always end up sharing the same mutex.
//!
//! When a `LockHandle` is dropped it removes the map entry if its own strong
//! reference is the last one, then releases that reference. The check and
//! removal happen under the same shard lock that `acquire` takes, so an entry
//! is never removed while another caller is holding (or upgrading) it. Memory is bounded
//! by the number of accounts currently in use, not by every account ever seen.

use crate::types::AccountId;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Registry of per-account mutexes
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<AccountId, Weak<Mutex<()>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Get the lock handle for `account_id`, creating it if needed
    ///
    /// Every handle returned for the same id while any of them is alive
    /// serialises on the same mutex. Acquiring the handle does not lock it;
    /// call [`LockHandle::lock`] for that.
    pub fn acquire(&self, account_id: AccountId) -> LockHandle<'_> {
        let mut entry = self.locks.entry(account_id).or_insert_with(Weak::new);

        let mutex = match entry.upgrade() {
            Some(mutex) => mutex,
            None => {
                let mutex = Arc::new(Mutex::new(()));
                *entry = Arc::downgrade(&mutex);
                mutex
            }
        };

        LockHandle {
            registry: self,
            account_id,
            mutex,
        }
    }

    /// Number of ids with a registry entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    // `held` is the caller's own reference, so a count of one means nobody else holds it
    fn reclaim(&self, account_id: AccountId, held: &Arc<Mutex<()>>) {
        self.locks.remove_if(&account_id, |_, mutex| {
            Weak::as_ptr(mutex) == Arc::as_ptr(held) && mutex.strong_count() <= 1
        });
    }
}

/// Live reference to one account's mutex
///
/// Keeps the registry entry alive until dropped.
#[derive(Debug)]
pub struct LockHandle<'a> {
    registry: &'a LockRegistry,
    account_id: AccountId,
    mutex: Arc<Mutex<()>>,
}

impl LockHandle<'_> {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Block until this account's mutex is held
    ///
    /// The guard releases the mutex when dropped. Poisoning is ignored: the
    /// mutex protects no data of its own.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles share the same underlying mutex
    pub fn same_lock(&self, other: &LockHandle<'_>) -> bool {
        Arc::ptr_eq(&self.mutex, &other.mutex)
    }
}

impl Drop for LockHandle<'_> {
    fn drop(&mut self) {
        // Checked under the shard lock, so no `acquire` can upgrade in between
        self.registry.reclaim(self.account_id, &self.mutex);
    }
}
