//! Persistence boundary of the ledger.
//!
//! Services reach users, accounts and transactions only through
//! [`LedgerStore`]. The database crate provides the production
//! implementation; [`InMemoryLedgerStore`] backs tests and single-process
//! deployments.

mod memory;

pub use memory::InMemoryLedgerStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::{
    AccountNumber, PageRequest, TransactionToken,
    types::{AccountId, UserId},
};

use crate::account::{Account, NewAccount, User};
use crate::ledger::{NewTransaction, StoreError, Transaction};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository-style access to ledger state.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Looks up a user by id.
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Looks up an account by its public number.
    async fn find_account(&self, number: &AccountNumber) -> StoreResult<Option<Account>>;

    /// Returns true if any account, open or closed, holds `number`.
    async fn account_number_exists(&self, number: &AccountNumber) -> StoreResult<bool>;

    /// Counts the user's in-use accounts.
    async fn count_accounts_in_use(&self, user_id: UserId) -> StoreResult<u64>;

    /// Lists every account the user has ever opened, oldest first.
    async fn list_accounts(&self, user_id: UserId) -> StoreResult<Vec<Account>>;

    /// Persists a new in-use account.
    ///
    /// Fails with [`StoreError::Conflict`] if the number is taken.
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account>;

    /// Marks the account unregistered at `at`.
    ///
    /// Only an in-use account with a zero balance is closed; any other
    /// state fails with [`StoreError::Stale`].
    async fn close_account(&self, id: AccountId, at: DateTime<Utc>) -> StoreResult<Account>;

    /// Appends a transaction record.
    ///
    /// A `Success` record also sets the account balance to its
    /// `balance_snapshot`; both writes commit together or not at all. A
    /// `Success` record against an unregistered account fails with
    /// [`StoreError::Stale`] and writes nothing.
    async fn record_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction>;

    /// Looks up a transaction by its public id.
    async fn find_transaction(&self, id: &TransactionToken) -> StoreResult<Option<Transaction>>;

    /// Returns the successful cancel that reverses `original`, if any.
    async fn find_cancellation(
        &self,
        original: &TransactionToken,
    ) -> StoreResult<Option<Transaction>>;

    /// Returns one page of the account's transactions, newest first, and the
    /// total count.
    async fn list_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> StoreResult<(Vec<Transaction>, u64)>;
}
