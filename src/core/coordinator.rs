//! Transfer coordination
//!
//! This module provides the `TransferCoordinator`, which owns the
//! lock-acquisition protocol and turns a withdrawal and a deposit into one
//! logically atomic transfer before handing it to the persistence gateway.
//!
//! # Transfer protocol
//!
//! ```text
//! validate (no side effects)
//!   └─ lock min(from, to), then lock max(from, to)
//!        ├─ select both accounts        → NotFound
//!        ├─ can_withdraw pre-check      → LimitExceeded
//!        ├─ withdraw / deposit on copies
//!        └─ gateway.apply_transfer      → NotFound if a row vanished
//!   └─ unlock in reverse order (guards dropped on every path)
//! ```
//!
//! # Concurrency
//!
//! Every transfer takes its two locks in ascending id order and never holds
//! more than those two, so no wait cycle can form. Transfers that share an
//! account are fully serialised; transfers on disjoint pairs do not contend.
//! `get` and `create` take no locks.

use crate::core::lock_registry::LockRegistry;
use crate::core::traits::{AccountGateway, TransferAudit};
use crate::types::{Account, AccountError, AccountId, AccountOperation, TransferRequest};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_ACTOR: &str = "TransferCoordinator";

/// Result of executing one [`AccountOperation`]
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Created(Account),
    Committed(TransferRequest),
}

/// Account service: create, read and transfer
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct TransferCoordinator {
    gateway: Arc<dyn AccountGateway>,
    locks: LockRegistry,
    actor: String,
}

impl TransferCoordinator {
    pub fn new(gateway: Arc<dyn AccountGateway>) -> Self {
        Self {
            gateway,
            locks: LockRegistry::new(),
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    /// Set the actor name recorded in audit entries
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn lock_registry(&self) -> &LockRegistry {
        &self.locks
    }

    /// Open a new account
    ///
    /// `None` opens the account with a zero balance.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the opening balance is negative (nothing is stored)
    /// - `Storage` if the gateway fails
    pub fn create(&self, opening_balance: Option<Decimal>) -> Result<Account, AccountError> {
        let balance = opening_balance.unwrap_or(Decimal::ZERO);
        if balance < Decimal::ZERO {
            return Err(AccountError::negative_amount(balance));
        }

        let id = self.gateway.insert(balance)?;
        info!(account = id, %balance, "account created");
        Account::new(id, balance)
    }

    /// Read an account without taking its lock
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such account exists
    /// - `Storage` if the gateway fails
    pub fn get(&self, account_id: AccountId) -> Result<Account, AccountError> {
        self.gateway
            .select(account_id)?
            .ok_or_else(|| AccountError::not_found(account_id))
    }

    /// Move `amount` from `from` to `to`
    ///
    /// Either both balances change or neither does.
    ///
    /// # Errors
    ///
    /// - `SameAccount` if `from == to` (before any lock or read)
    /// - `InvalidAmount` if `amount` is zero or negative (before any lock or read)
    /// - `NotFound` if either account is missing, or vanished before commit
    /// - `LimitExceeded` if `amount` is greater than the source balance
    /// - `Storage` if the gateway fails; not retried
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), AccountError> {
        let request = TransferRequest::new(from, to, amount);
        validate(&request)?;

        let (low, high) = request.lock_order();
        let low_handle = self.locks.acquire(low);
        let high_handle = self.locks.acquire(high);

        let _low_guard = low_handle.lock();
        let _high_guard = high_handle.lock();
        debug!(low, high, "transfer locks held");

        self.transfer_locked(&request)
        // _high_guard then _low_guard are released here, on every path
    }

    /// Health signal from the persistence gateway
    pub fn health(&self) -> Result<(), AccountError> {
        self.gateway.ping()
    }

    /// Execute one replayed operation
    ///
    /// # Errors
    ///
    /// `MissingAmount` if a transfer carries no amount, otherwise whatever
    /// [`create`](Self::create) or [`transfer`](Self::transfer) returns.
    pub fn execute(&self, operation: AccountOperation) -> Result<OperationOutcome, AccountError> {
        match operation {
            AccountOperation::Create { opening_balance } => {
                self.create(opening_balance).map(OperationOutcome::Created)
            }
            AccountOperation::Transfer { from, to, amount } => {
                let amount = amount.ok_or_else(|| AccountError::missing_amount("transfer"))?;
                self.transfer(from, to, amount)?;
                Ok(OperationOutcome::Committed(TransferRequest::new(
                    from, to, amount,
                )))
            }
        }
    }

    // Both participant locks must be held by the caller
    fn transfer_locked(&self, request: &TransferRequest) -> Result<(), AccountError> {
        let mut from_account = self.get(request.from)?;
        let mut to_account = self.get(request.to)?;

        // Skip the store transaction when it would only be rolled back
        if !from_account.can_withdraw(request.amount)? {
            return Err(AccountError::limit_exceeded(
                request.from,
                request.amount,
                from_account.balance(),
            ));
        }

        from_account.withdraw(request.amount)?;
        to_account.deposit(request.amount)?;

        let audit = TransferAudit {
            from: request.from,
            to: request.to,
            amount: request.amount,
            actor: self.actor.clone(),
            at: Utc::now(),
        };
        let rows = self
            .gateway
            .apply_transfer(&audit, &from_account, &to_account)?;

        if rows.from_rows == 0 {
            return Err(AccountError::not_found(request.from));
        }
        if rows.to_rows == 0 {
            return Err(AccountError::not_found(request.to));
        }

        info!(
            from = request.from,
            to = request.to,
            amount = %request.amount,
            "transfer committed"
        );
        Ok(())
    }
}

fn validate(request: &TransferRequest) -> Result<(), AccountError> {
    if request.from == request.to {
        return Err(AccountError::same_account(request.from));
    }
    if request.amount <= Decimal::ZERO {
        return Err(AccountError::non_positive_amount(request.amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::PairUpdate;
    use crate::store::MemoryGateway;
    use crate::types::ErrorKind;
    use rstest::rstest;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Condvar, Mutex};
    use std::thread;
    use std::time::Duration;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn setup() -> (Arc<MemoryGateway>, TransferCoordinator) {
        let store = Arc::new(MemoryGateway::new());
        let coordinator = TransferCoordinator::new(store.clone());
        (store, coordinator)
    }

    fn balance(coordinator: &TransferCoordinator, id: AccountId) -> Decimal {
        coordinator.get(id).unwrap().balance()
    }

    #[derive(Default)]
    struct Rendezvous {
        in_flight: usize,
        released: bool,
    }

    /// Gateway wrapper that counts calls and can hold transfers in the store
    /// until a given number of them are in flight at once
    struct InstrumentedGateway {
        inner: MemoryGateway,
        selects: AtomicUsize,
        rendezvous: Option<usize>,
        state: Mutex<Rendezvous>,
        arrived: Condvar,
        max_in_flight: AtomicUsize,
    }

    impl InstrumentedGateway {
        fn new(rendezvous: Option<usize>) -> Self {
            Self {
                inner: MemoryGateway::new(),
                selects: AtomicUsize::new(0),
                rendezvous,
                state: Mutex::new(Rendezvous::default()),
                arrived: Condvar::new(),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    impl AccountGateway for InstrumentedGateway {
        fn select(&self, account_id: AccountId) -> Result<Option<Account>, AccountError> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            self.inner.select(account_id)
        }

        fn insert(&self, opening_balance: Decimal) -> Result<AccountId, AccountError> {
            self.inner.insert(opening_balance)
        }

        fn update(&self, account: &Account) -> Result<u64, AccountError> {
            self.inner.update(account)
        }

        fn ping(&self) -> Result<(), AccountError> {
            self.inner.ping()
        }

        fn apply_transfer(
            &self,
            audit: &TransferAudit,
            from: &Account,
            to: &Account,
        ) -> Result<PairUpdate, AccountError> {
            if let Some(expected) = self.rendezvous {
                let mut state = self.state.lock().unwrap();
                state.in_flight += 1;
                self.max_in_flight
                    .fetch_max(state.in_flight, Ordering::SeqCst);
                if state.in_flight >= expected {
                    state.released = true;
                    self.arrived.notify_all();
                }
                // Time out when the others can never arrive (serialised callers)
                let (mut state, _) = self
                    .arrived
                    .wait_timeout_while(state, Duration::from_millis(300), |s| !s.released)
                    .unwrap();
                state.in_flight -= 1;
            }
            self.inner.apply_transfer(audit, from, to)
        }
    }

    #[test]
    fn test_create_defaults_to_zero_balance() {
        let (_, coordinator) = setup();

        let account = coordinator.create(None).unwrap();

        assert_eq!(account.id(), 1);
        assert_eq!(account.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_create_with_balance_is_readable() {
        let (_, coordinator) = setup();

        let account = coordinator.create(Some(dec("100.50"))).unwrap();

        assert_eq!(coordinator.get(account.id()).unwrap(), account);
    }

    #[test]
    fn test_create_negative_balance_inserts_nothing() {
        let (store, coordinator) = setup();

        let result = coordinator.create(Some(dec("-10")));

        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert!(store.accounts().unwrap().is_empty());
    }

    #[test]
    fn test_get_missing_account_is_not_found() {
        let (_, coordinator) = setup();
        assert_eq!(coordinator.get(999), Err(AccountError::not_found(999)));
    }

    #[test]
    fn test_transfer_moves_funds_exactly() {
        let (store, coordinator) = setup();
        let a = coordinator.create(Some(dec("100.50"))).unwrap().id();
        let b = coordinator.create(Some(dec("100000000"))).unwrap().id();

        coordinator.transfer(a, b, dec("100")).unwrap();

        assert_eq!(balance(&coordinator, a), dec("0.50"));
        assert_eq!(balance(&coordinator, b), dec("100000100"));

        let audit = store.audit_log().unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!((audit[0].from, audit[0].to), (a, b));
        assert_eq!(audit[0].amount, dec("100"));
        assert_eq!(audit[0].actor, DEFAULT_ACTOR);
    }

    #[test]
    fn test_transfer_over_balance_is_limit_exceeded() {
        let (store, coordinator) = setup();
        let a = coordinator.create(Some(dec("100.50"))).unwrap().id();
        let b = coordinator.create(Some(dec("100000000"))).unwrap().id();

        let result = coordinator.transfer(a, b, dec("200"));

        assert_eq!(
            result,
            Err(AccountError::limit_exceeded(a, dec("200"), dec("100.50")))
        );
        assert_eq!(balance(&coordinator, a), dec("100.50"));
        assert_eq!(balance(&coordinator, b), dec("100000000"));
        assert!(store.audit_log().unwrap().is_empty());
    }

    #[rstest]
    #[case::missing_destination(true)]
    #[case::missing_source(false)]
    fn test_transfer_with_unknown_account_is_not_found(#[case] existing_is_source: bool) {
        let (_, coordinator) = setup();
        let existing = coordinator.create(Some(dec("50"))).unwrap().id();

        let result = if existing_is_source {
            coordinator.transfer(existing, 999, dec("10"))
        } else {
            coordinator.transfer(999, existing, dec("10"))
        };

        assert_eq!(result, Err(AccountError::not_found(999)));
        assert_eq!(balance(&coordinator, existing), dec("50"));
    }

    #[rstest]
    #[case::same_account(5, 5, "10")]
    #[case::zero_amount(1, 2, "0")]
    #[case::negative_amount(1, 2, "-3")]
    fn test_invalid_transfer_touches_nothing(
        #[case] from: AccountId,
        #[case] to: AccountId,
        #[case] amount: &str,
    ) {
        let gateway = Arc::new(InstrumentedGateway::new(None));
        let coordinator = TransferCoordinator::new(gateway.clone());

        let result = coordinator.transfer(from, to, dec(amount));

        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(gateway.selects.load(Ordering::SeqCst), 0);
        assert!(coordinator.lock_registry().is_empty());
    }

    #[test]
    fn test_same_account_error_names_the_account() {
        let (_, coordinator) = setup();
        assert_eq!(
            coordinator.transfer(5, 5, dec("10")),
            Err(AccountError::same_account(5))
        );
    }

    #[test]
    fn test_account_vanishing_before_commit_is_not_found() {
        // Wrapper that deletes the destination between the reads and the commit
        struct VanishingGateway(MemoryGateway, AccountId);

        impl AccountGateway for VanishingGateway {
            fn select(&self, id: AccountId) -> Result<Option<Account>, AccountError> {
                self.0.select(id)
            }
            fn insert(&self, balance: Decimal) -> Result<AccountId, AccountError> {
                self.0.insert(balance)
            }
            fn update(&self, account: &Account) -> Result<u64, AccountError> {
                self.0.update(account)
            }
            fn ping(&self) -> Result<(), AccountError> {
                self.0.ping()
            }
            fn apply_transfer(
                &self,
                audit: &TransferAudit,
                from: &Account,
                to: &Account,
            ) -> Result<PairUpdate, AccountError> {
                self.0.remove(self.1)?;
                self.0.apply_transfer(audit, from, to)
            }
        }

        let gateway = Arc::new(VanishingGateway(MemoryGateway::new(), 2));
        let coordinator = TransferCoordinator::new(gateway.clone());
        let a = coordinator.create(Some(dec("10"))).unwrap().id();
        let b = coordinator.create(Some(dec("10"))).unwrap().id();
        assert_eq!(b, 2);

        let result = coordinator.transfer(a, b, dec("1"));

        assert_eq!(result, Err(AccountError::not_found(b)));
        assert_eq!(balance(&coordinator, a), dec("10"));
        assert!(gateway.0.audit_log().unwrap().is_empty());
    }

    #[test]
    fn test_gateway_failure_is_propagated_without_change() {
        let (store, coordinator) = setup();
        let a = coordinator.create(Some(dec("10"))).unwrap().id();
        let b = coordinator.create(Some(dec("10"))).unwrap().id();

        store.set_offline(true);
        let result = coordinator.transfer(a, b, dec("1"));
        store.set_offline(false);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Gateway);
        assert_eq!(balance(&coordinator, a), dec("10"));
        assert_eq!(balance(&coordinator, b), dec("10"));
        assert!(coordinator.health().is_ok());
    }

    #[test]
    fn test_locks_released_after_success_and_failure() {
        let (_, coordinator) = setup();
        let a = coordinator.create(Some(dec("10"))).unwrap().id();
        let b = coordinator.create(Some(dec("10"))).unwrap().id();

        coordinator.transfer(a, b, dec("1")).unwrap();
        assert!(coordinator.lock_registry().is_empty());

        coordinator.transfer(a, b, dec("1000")).unwrap_err();
        coordinator.transfer(a, 999, dec("1")).unwrap_err();
        assert!(coordinator.lock_registry().is_empty());

        // A failed transfer must not leave the locks held
        coordinator.transfer(b, a, dec("2")).unwrap();
        assert_eq!(balance(&coordinator, a), dec("11"));
    }

    #[test]
    fn test_execute_transfer_without_amount_is_rejected() {
        let (_, coordinator) = setup();

        let result = coordinator.execute(AccountOperation::Transfer {
            from: 1,
            to: 2,
            amount: None,
        });

        assert_eq!(result, Err(AccountError::missing_amount("transfer")));
    }

    #[test]
    fn test_execute_reports_outcomes() {
        let (_, coordinator) = setup();

        let created = coordinator
            .execute(AccountOperation::Create {
                opening_balance: Some(dec("5")),
            })
            .unwrap();
        coordinator.create(None).unwrap();
        let committed = coordinator
            .execute(AccountOperation::Transfer {
                from: 1,
                to: 2,
                amount: Some(dec("5")),
            })
            .unwrap();

        assert_eq!(
            created,
            OperationOutcome::Created(Account::new(1, dec("5")).unwrap())
        );
        assert_eq!(
            committed,
            OperationOutcome::Committed(TransferRequest::new(1, 2, dec("5")))
        );
    }

    #[test]
    fn test_custom_actor_is_audited() {
        let store = Arc::new(MemoryGateway::new());
        let coordinator = TransferCoordinator::new(store.clone()).with_actor("batch-job");
        let a = coordinator.create(Some(dec("1"))).unwrap().id();
        let b = coordinator.create(None).unwrap().id();

        coordinator.transfer(a, b, dec("1")).unwrap();

        assert_eq!(store.audit_log().unwrap()[0].actor, "batch-job");
    }

    #[test]
    fn test_transfer_that_would_round_leaves_both_accounts_unchanged() {
        let (store, coordinator) = setup();
        let tiny = Decimal::new(1, 28);
        let small = coordinator.create(Some(tiny)).unwrap().id();
        let large = coordinator.create(Some(dec("10000000000"))).unwrap().id();

        // Crediting the large account would round the unit away
        let credit = coordinator.transfer(small, large, tiny);
        // Debiting it would round back up and mint the unit
        let debit = coordinator.transfer(large, small, tiny);

        assert_eq!(credit.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(debit.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(balance(&coordinator, small), tiny);
        assert_eq!(balance(&coordinator, large), dec("10000000000"));
        assert!(store.audit_log().unwrap().is_empty());
        assert!(coordinator.lock_registry().is_empty());
    }

    // Concurrent access tests

    #[test]
    fn test_concurrent_opposite_transfers_have_no_lost_update() {
        for _ in 0..50 {
            let (_, coordinator) = setup();
            let coordinator = Arc::new(coordinator);
            let a = coordinator.create(Some(dec("100"))).unwrap().id();
            let b = coordinator.create(Some(dec("100"))).unwrap().id();

            let forward = {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || coordinator.transfer(a, b, dec("10")))
            };
            let backward = {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || coordinator.transfer(b, a, dec("5")))
            };

            forward.join().unwrap().unwrap();
            backward.join().unwrap().unwrap();

            assert_eq!(balance(&coordinator, a), dec("95"));
            assert_eq!(balance(&coordinator, b), dec("105"));
        }
    }

    #[test]
    fn test_concurrent_overlapping_transfers_complete_and_conserve() {
        let (store, coordinator) = setup();
        let coordinator = Arc::new(coordinator);
        let ids: Vec<AccountId> = (0..5)
            .map(|_| coordinator.create(Some(dec("1000"))).unwrap().id())
            .collect();
        let mut handles = vec![];

        // Every thread walks a ring of accounts in its own direction, so
        // lock requests overlap in both orders
        for t in 0..10usize {
            let coordinator = Arc::clone(&coordinator);
            let ids = ids.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200usize {
                    let from = ids[(t + i) % ids.len()];
                    let to = if t % 2 == 0 {
                        ids[(t + i + 1) % ids.len()]
                    } else {
                        ids[(t + i + ids.len() - 1) % ids.len()]
                    };
                    let amount = Decimal::new(((t + i) % 7 + 1) as i64, 1);
                    match coordinator.transfer(from, to, amount) {
                        Ok(()) | Err(AccountError::LimitExceeded { .. }) => {}
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let accounts = store.accounts().unwrap();
        let total: Decimal = accounts.iter().map(Account::balance).sum();
        assert_eq!(total, dec("5000"));
        assert!(accounts.iter().all(|a| a.balance() >= Decimal::ZERO));
        assert!(!store.audit_log().unwrap().is_empty());
        assert!(coordinator.lock_registry().is_empty());
    }

    #[test]
    fn test_concurrent_drain_never_goes_negative() {
        let (_, coordinator) = setup();
        let coordinator = Arc::new(coordinator);
        let source = coordinator.create(Some(dec("10"))).unwrap().id();
        let sinks: Vec<AccountId> = (0..4)
            .map(|_| coordinator.create(None).unwrap().id())
            .collect();
        let mut handles = vec![];

        for sink in sinks.clone() {
            let coordinator = Arc::clone(&coordinator);
            handles.push(thread::spawn(move || {
                (0..10)
                    .filter(|_| coordinator.transfer(source, sink, dec("1")).is_ok())
                    .count()
            }));
        }

        let committed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(committed, 10);
        assert_eq!(balance(&coordinator, source), Decimal::ZERO);
        let received: Decimal = sinks.iter().map(|&id| balance(&coordinator, id)).sum();
        assert_eq!(received, dec("10"));
    }

    #[test]
    fn test_disjoint_transfers_run_in_parallel() {
        let gateway = Arc::new(InstrumentedGateway::new(Some(2)));
        let coordinator = Arc::new(TransferCoordinator::new(gateway.clone()));
        for _ in 0..4 {
            coordinator.create(Some(dec("10"))).unwrap();
        }

        let pairs = [(1, 2), (3, 4)];
        let handles: Vec<_> = pairs
            .into_iter()
            .map(|(from, to)| {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || coordinator.transfer(from, to, dec("1")))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        // Both transfers were inside the store call at the same time
        assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_overlapping_transfers_are_serialised() {
        let gateway = Arc::new(InstrumentedGateway::new(Some(2)));
        let coordinator = Arc::new(TransferCoordinator::new(gateway.clone()));
        for _ in 0..3 {
            coordinator.create(Some(dec("10"))).unwrap();
        }

        let pairs = [(1, 2), (3, 2)];
        let handles: Vec<_> = pairs
            .into_iter()
            .map(|(from, to)| {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || coordinator.transfer(from, to, dec("1")))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        // Account 2 is shared, so only one transfer can be past its locks
        assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(balance(&coordinator, 2), dec("12"));
    }
}
