//! Lock-guarded operations.
//!
//! [`ScopedLocks`] runs a closure while holding a named lease and releases it
//! on every exit path. [`GuardedTransactions`] builds on it for use and
//! cancel: a failed operation leaves a FAIL record behind and surfaces as
//! [`LedgerError::TransactionFailed`].

use std::future::Future;
use std::sync::Arc;

use tally_shared::{AccountNumber, TransactionToken, types::UserId};
use tracing::{debug, error, warn};

use super::{LockLease, LockManager, LockTimeouts, account_lock_key};
use crate::ledger::{LedgerError, Transaction, TransactionService, TransactionType};

/// The account, type and amount of a guarded operation, used for the lock
/// key and for the FAIL record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedOperation {
    /// Account whose lock is taken.
    pub account_number: AccountNumber,
    /// Type recorded if the operation fails.
    pub transaction_type: TransactionType,
    /// Amount recorded if the operation fails.
    pub amount: i64,
}

/// A held lease, released explicitly or, if the holder is dropped mid-flight,
/// from a spawned task.
struct HeldLock {
    locks: Arc<dyn LockManager>,
    lease: Option<LockLease>,
}

impl HeldLock {
    fn new(locks: Arc<dyn LockManager>, lease: LockLease) -> Self {
        Self {
            locks,
            lease: Some(lease),
        }
    }

    async fn release(mut self) {
        if let Some(lease) = self.lease.take() {
            release_logged(self.locks.as_ref(), &lease).await;
        }
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        let locks = Arc::clone(&self.locks);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release_logged(locks.as_ref(), &lease).await;
                });
            }
            Err(_) => {
                warn!(key = lease.key(), "no runtime to release lock, leaving it to expire");
            }
        }
    }
}

async fn release_logged(locks: &dyn LockManager, lease: &LockLease) {
    match locks.release(lease).await {
        Ok(()) => debug!(key = lease.key(), "lock released"),
        Err(err) => error!(key = lease.key(), error = %err, "failed to release lock"),
    }
}

/// Runs operations while holding a named lease, with no FAIL bookkeeping.
#[derive(Clone)]
pub struct ScopedLocks {
    locks: Arc<dyn LockManager>,
    timeouts: LockTimeouts,
}

impl ScopedLocks {
    /// Takes leases from `locks` bounded by `timeouts`.
    #[must_use]
    pub fn new(locks: Arc<dyn LockManager>, timeouts: LockTimeouts) -> Self {
        Self { locks, timeouts }
    }

    /// Runs `op` while holding `key`.
    ///
    /// If the lease cannot be taken, `op` never runs. Errors from `op` pass
    /// through unchanged.
    ///
    /// # Errors
    ///
    /// Returns `LockUnavailable` or `LockBackend` if the lease was not
    /// granted, otherwise whatever `op` returns.
    pub async fn with_lock<T, F, Fut>(&self, key: &str, op: F) -> Result<T, LedgerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let held = self.acquire(key).await?;
        let result = op().await;
        held.release().await;
        result
    }

    async fn acquire(&self, key: &str) -> Result<HeldLock, LedgerError> {
        match self
            .locks
            .acquire(key, self.timeouts.wait, self.timeouts.lease)
            .await
        {
            Ok(lease) => {
                debug!(%key, "lock acquired");
                Ok(HeldLock::new(Arc::clone(&self.locks), lease))
            }
            Err(err) => {
                let err = LedgerError::from(err);
                warn!(%key, error = %err, "lock not acquired");
                Err(err)
            }
        }
    }
}

/// Runs use and cancel operations under the per-account lock.
#[derive(Clone)]
pub struct GuardedTransactions {
    transactions: TransactionService,
    locks: ScopedLocks,
}

impl GuardedTransactions {
    /// Wraps `transactions` with locks from `locks`.
    #[must_use]
    pub fn new(
        transactions: TransactionService,
        locks: Arc<dyn LockManager>,
        timeouts: LockTimeouts,
    ) -> Self {
        Self {
            transactions,
            locks: ScopedLocks::new(locks, timeouts),
        }
    }

    /// [`TransactionService::use_balance`] under the account lock.
    ///
    /// # Errors
    ///
    /// Returns `TransactionFailed` carrying the underlying reason.
    pub async fn use_balance(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
        amount: i64,
    ) -> Result<Transaction, LedgerError> {
        let operation = LockedOperation {
            account_number: account_number.clone(),
            transaction_type: TransactionType::Use,
            amount,
        };
        self.run(operation, || {
            self.transactions
                .use_balance(user_id, account_number, amount)
        })
        .await
    }

    /// [`TransactionService::cancel_balance`] under the account lock.
    ///
    /// # Errors
    ///
    /// Returns `TransactionFailed` carrying the underlying reason.
    pub async fn cancel_balance(
        &self,
        transaction_id: &TransactionToken,
        account_number: &AccountNumber,
        amount: i64,
    ) -> Result<Transaction, LedgerError> {
        let operation = LockedOperation {
            account_number: account_number.clone(),
            transaction_type: TransactionType::Cancel,
            amount,
        };
        self.run(operation, || {
            self.transactions
                .cancel_balance(transaction_id, account_number, amount)
        })
        .await
    }

    /// Runs `op` while holding the lock on `operation.account_number`.
    ///
    /// If the lock cannot be taken, `op` never runs and nothing is recorded.
    /// If `op` fails, a FAIL transaction is recorded for `operation` before
    /// the lock is released.
    ///
    /// # Errors
    ///
    /// Returns `TransactionFailed` carrying the lock or operation error
    /// message.
    pub async fn run<T, F, Fut>(&self, operation: LockedOperation, op: F) -> Result<T, LedgerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let key = account_lock_key(&operation.account_number);
        let held = self
            .locks
            .acquire(&key)
            .await
            .map_err(|err| LedgerError::TransactionFailed(err.to_string()))?;

        let result = match op().await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.record_failure(&operation, &err).await;
                Err(LedgerError::TransactionFailed(err.to_string()))
            }
        };

        held.release().await;
        result
    }

    async fn record_failure(&self, operation: &LockedOperation, cause: &LedgerError) {
        if let Err(err) = self
            .transactions
            .save_failed_transaction(
                &operation.account_number,
                operation.amount,
                operation.transaction_type,
            )
            .await
        {
            error!(
                account_number = %operation.account_number,
                cause = %cause,
                error = %err,
                "failed to record failed transaction"
            );
        }
    }
}
