//! Account lifecycle: opening, closing and listing accounts.

use std::sync::Arc;

use chrono::Utc;
use tally_shared::{AccountNumber, types::UserId};
use tracing::{debug, info};

use super::number::AccountNumberGenerator;
use super::types::{Account, AccountSummary, NewAccount, User};
use super::validation::{validate_capacity, validate_close, validate_initial_balance};
use crate::ledger::{LedgerError, StoreError};
use crate::lock::{ScopedLocks, account_lock_key, user_lock_key};
use crate::policy::LedgerPolicy;
use crate::store::LedgerStore;

/// Opens and closes accounts on behalf of their owners.
///
/// Opening holds the owner's user lock; closing holds the same account lock
/// that use and cancel take.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    generator: Arc<dyn AccountNumberGenerator>,
    locks: ScopedLocks,
    policy: LedgerPolicy,
}

impl AccountService {
    /// Creates a new account service.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        generator: Arc<dyn AccountNumberGenerator>,
        locks: ScopedLocks,
        policy: LedgerPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            locks,
            policy,
        }
    }

    /// Opens an in-use account for `user_id` holding `initial_balance`.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, `NegativeInitialBalance`, `MaxAccountPerUser`,
    /// `AccountNumberExhausted` when no unused number turns up,
    /// `LockUnavailable` if the user lock stays busy, or a store error.
    pub async fn create_account(
        &self,
        user_id: UserId,
        initial_balance: i64,
    ) -> Result<Account, LedgerError> {
        self.locks
            .with_lock(&user_lock_key(user_id), || {
                self.open_account(user_id, initial_balance)
            })
            .await
    }

    async fn open_account(
        &self,
        user_id: UserId,
        initial_balance: i64,
    ) -> Result<Account, LedgerError> {
        let user = self.require_user(user_id).await?;
        validate_initial_balance(initial_balance)?;

        let in_use = self.store.count_accounts_in_use(user.id).await?;
        validate_capacity(in_use, self.policy.max_accounts_per_user)?;

        for attempt in 1..=self.policy.account_number_attempts {
            let candidate = self.generator.generate(user.id);
            if self.store.account_number_exists(&candidate).await? {
                debug!(attempt, account_number = %candidate, "account number taken, retrying");
                continue;
            }

            let new = NewAccount {
                user_id: user.id,
                account_number: candidate,
                balance: initial_balance,
                registered_at: Utc::now(),
            };
            match self.store.insert_account(new).await {
                Ok(account) => {
                    info!(
                        user_id = %account.user_id,
                        account_number = %account.account_number,
                        balance = account.balance,
                        "account created"
                    );
                    return Ok(account);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(attempt, %reason, "account number claimed concurrently, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LedgerError::AccountNumberExhausted {
            attempts: self.policy.account_number_attempts,
        })
    }

    /// Closes an empty account owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, `AccountNotFound`, `UserAccountMismatch`,
    /// `AccountAlreadyClosed`, `AccountHasBalance`, `LockUnavailable` if the
    /// account lock stays busy, or a store error.
    pub async fn delete_account(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
    ) -> Result<Account, LedgerError> {
        self.locks
            .with_lock(&account_lock_key(account_number), || {
                self.close_account(user_id, account_number)
            })
            .await
    }

    async fn close_account(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
    ) -> Result<Account, LedgerError> {
        let user = self.require_user(user_id).await?;
        let account = self.find_account(account_number).await?;

        validate_close(user.id, &account)?;

        let closed = match self.store.close_account(account.id, Utc::now()).await {
            Ok(closed) => closed,
            Err(StoreError::Stale(reason)) => {
                debug!(%account_number, %reason, "account changed before close");
                let current = self.find_account(account_number).await?;
                validate_close(user.id, &current)?;
                return Err(StoreError::Stale(reason).into());
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            user_id = %closed.user_id,
            account_number = %closed.account_number,
            "account unregistered"
        );
        Ok(closed)
    }

    /// Lists every account the user holds.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, or `AccountNotFound` when the user has no
    /// accounts at all.
    pub async fn find_accounts_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AccountSummary>, LedgerError> {
        let user = self.require_user(user_id).await?;
        let accounts = self.store.list_accounts(user.id).await?;
        if accounts.is_empty() {
            return Err(LedgerError::AccountNotFound(format!("user {user_id}")));
        }
        Ok(accounts.iter().map(Account::summary).collect())
    }

    /// Looks up a single account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or a store error.
    pub async fn find_account(&self, account_number: &AccountNumber) -> Result<Account, LedgerError> {
        self.store
            .find_account(account_number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_string()))
    }

    async fn require_user(&self, user_id: UserId) -> Result<User, LedgerError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))
    }
}
