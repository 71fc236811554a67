//! Per-account mutual exclusion.
//!
//! A [`LockManager`] grants named leases with a bounded wait and a bounded
//! lifetime. Every use, cancel or close holds the lease for its account
//! number across read, validate, mutate and persist; operations on different
//! accounts never contend. Opening an account holds the owner's user lease
//! across the capacity check and the insert.

mod guard;
mod memory;

pub use guard::{GuardedTransactions, LockedOperation, ScopedLocks};
pub use memory::InMemoryLockManager;

use std::time::Duration;

use async_trait::async_trait;
use tally_shared::{AccountNumber, LockConfig, types::UserId};
use thiserror::Error;
use uuid::Uuid;

/// Prefix of every account lock key.
pub const ACCOUNT_LOCK_PREFIX: &str = "ACLK:";

/// Returns the lock key guarding `account_number`.
#[must_use]
pub fn account_lock_key(account_number: &AccountNumber) -> String {
    format!("{ACCOUNT_LOCK_PREFIX}{account_number}")
}

/// Prefix of every user lock key.
pub const USER_LOCK_PREFIX: &str = "USLK:";

/// Returns the lock key serializing account openings for `user_id`.
#[must_use]
pub fn user_lock_key(user_id: UserId) -> String {
    format!("{USER_LOCK_PREFIX}{user_id}")
}

/// Errors raised by a lock backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The lock stayed held by someone else for the whole wait.
    #[error("Lock {key} is held by another owner")]
    Unavailable {
        /// The contended key.
        key: String,
    },

    /// The backend itself failed.
    #[error("Lock backend failure: {0}")]
    Backend(String),
}

/// Proof of ownership of a lock key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    key: String,
    token: Uuid,
}

impl LockLease {
    /// Creates a lease for `key` with a fresh owner token.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: Uuid::new_v4(),
        }
    }

    /// The locked key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The owner token; release only succeeds while it still owns the key.
    #[must_use]
    pub const fn token(&self) -> Uuid {
        self.token
    }
}

/// A lock service granting leases on named keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Waits up to `wait` for `key`, then holds it for at most `lease`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Unavailable`] if the key stayed held for the
    /// whole wait.
    async fn acquire(&self, key: &str, wait: Duration, lease: Duration)
    -> Result<LockLease, LockError>;

    /// Releases the lease. A lease that already expired, or whose key was
    /// since taken by another owner, is left alone.
    async fn release(&self, lease: &LockLease) -> Result<(), LockError>;
}

/// Wait and lease bounds applied to account and user locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTimeouts {
    /// How long to wait for a busy account.
    pub wait: Duration,
    /// How long a lease lives without release.
    pub lease: Duration,
}

impl Default for LockTimeouts {
    fn default() -> Self {
        Self::from(&LockConfig::default())
    }
}

impl From<&LockConfig> for LockTimeouts {
    fn from(config: &LockConfig) -> Self {
        Self {
            wait: config.wait_timeout(),
            lease: config.lease_timeout(),
        }
    }
}
