//! Transaction engine: validates and applies use and cancel operations.
//!
//! Each operation resolves its inputs from the store, runs the pure checks in
//! [`super::validation`], and appends exactly one transaction record. Callers
//! must hold the account lock around `use_balance` and `cancel_balance`; see
//! [`crate::lock::GuardedTransactions`].

use std::sync::Arc;

use chrono::Utc;
use tally_shared::{AccountNumber, PageRequest, PageResponse, TransactionToken, types::UserId};
use tracing::{info, warn};

use super::error::{LedgerError, StoreError};
use super::types::{NewTransaction, Transaction, TransactionType};
use super::validation::{CancelCheck, validate_cancel, validate_use};
use crate::account::{Account, ensure_in_use};
use crate::policy::LedgerPolicy;
use crate::store::LedgerStore;

/// Applies balance-changing operations and records their outcome.
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn LedgerStore>,
    policy: LedgerPolicy,
}

impl TransactionService {
    /// Creates a new transaction service.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, policy: LedgerPolicy) -> Self {
        Self { store, policy }
    }

    /// Debits `amount` from the account on behalf of its owner.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, `AccountNotFound`, `InvalidAmount`,
    /// `UserAccountMismatch`, `AccountAlreadyClosed`, `AccountExceedBalance`,
    /// or a store error. Nothing is written on error.
    pub async fn use_balance(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
        amount: i64,
    ) -> Result<Transaction, LedgerError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))?;
        let account = self.require_account(account_number).await?;

        let new_balance = validate_use(user.id, &account, amount)?;

        self.commit(
            &account,
            NewTransaction::success(&account, TransactionType::Use, amount, new_balance, None),
        )
        .await
    }

    /// Reverses a prior successful use in full.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `AccountAlreadyClosed`,
    /// `TransactionNotFound`, `AccountTransactionMismatch`,
    /// `TransactionAlreadyCanceled`, `TransactionResultFailed`,
    /// `TooOldToCancel`, `CancelMustBeFull`, `BalanceOverflow`, or a store
    /// error. Nothing is written on error.
    pub async fn cancel_balance(
        &self,
        transaction_id: &TransactionToken,
        account_number: &AccountNumber,
        amount: i64,
    ) -> Result<Transaction, LedgerError> {
        let account = self.require_account(account_number).await?;
        ensure_in_use(&account)?;

        let original = self.find_by_transaction_id(transaction_id).await?;
        let already_canceled = self
            .store
            .find_cancellation(&original.transaction_id)
            .await?
            .is_some();

        let new_balance = validate_cancel(&CancelCheck {
            account: &account,
            original: &original,
            already_canceled,
            amount,
            window_years: self.policy.cancel_window_years,
            now: Utc::now(),
        })?;

        self.commit(
            &account,
            NewTransaction::success(
                &account,
                TransactionType::Cancel,
                amount,
                new_balance,
                Some(original.transaction_id),
            ),
        )
        .await
    }

    /// Records a failed attempt against the account, leaving its balance
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `InvalidAmount` for a non-positive amount,
    /// or a store error.
    pub async fn save_failed_transaction(
        &self,
        account_number: &AccountNumber,
        amount: i64,
        transaction_type: TransactionType,
    ) -> Result<Transaction, LedgerError> {
        let account = self.require_account(account_number).await?;
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let transaction = self
            .store
            .record_transaction(NewTransaction::failure(&account, transaction_type, amount))
            .await?;
        warn!(
            account_number = %transaction.account_number,
            transaction_id = %transaction.transaction_id,
            transaction_type = transaction.transaction_type.as_str(),
            amount = transaction.amount,
            balance_snapshot = transaction.balance_snapshot,
            "failed transaction recorded"
        );
        Ok(transaction)
    }

    /// Looks up a transaction by its public id.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` or a store error.
    pub async fn find_by_transaction_id(
        &self,
        transaction_id: &TransactionToken,
    ) -> Result<Transaction, LedgerError> {
        self.store
            .find_transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.clone()))
    }

    /// Lists the account's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or a store error.
    pub async fn list_account_transactions(
        &self,
        account_number: &AccountNumber,
        page: PageRequest,
    ) -> Result<PageResponse<Transaction>, LedgerError> {
        let account = self.require_account(account_number).await?;
        let page = page.normalized();
        let (data, total) = self.store.list_transactions(account.id, page).await?;
        Ok(PageResponse::new(data, page, total))
    }

    /// Persists a successful record. The store refuses it if the account
    /// was unregistered after it was read.
    async fn commit(
        &self,
        account: &Account,
        new: NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        match self.store.record_transaction(new).await {
            Ok(transaction) => {
                log_committed(&transaction);
                Ok(transaction)
            }
            Err(StoreError::Stale(reason)) => {
                warn!(
                    account_number = %account.account_number,
                    %reason,
                    "account closed before commit"
                );
                Err(LedgerError::AccountAlreadyClosed(account.account_number.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn require_account(&self, account_number: &AccountNumber) -> Result<Account, LedgerError> {
        self.store
            .find_account(account_number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_string()))
    }
}

fn log_committed(transaction: &Transaction) {
    info!(
        account_number = %transaction.account_number,
        transaction_id = %transaction.transaction_id,
        transaction_type = transaction.transaction_type.as_str(),
        result = transaction.result.as_str(),
        amount = transaction.amount,
        balance_snapshot = transaction.balance_snapshot,
        "transaction committed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::account::{AccountService, HashAccountNumberGenerator};
    use crate::ledger::TransactionResult;
    use crate::lock::{InMemoryLockManager, LockTimeouts, ScopedLocks};
    use crate::store::InMemoryLedgerStore;

    struct Fixture {
        store: Arc<InMemoryLedgerStore>,
        accounts: AccountService,
        transactions: TransactionService,
        user: UserId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryLedgerStore::new());
        let user = store.add_user("kim").await.id;
        let accounts = AccountService::new(
            store.clone(),
            Arc::new(HashAccountNumberGenerator),
            ScopedLocks::new(Arc::new(InMemoryLockManager::new()), LockTimeouts::default()),
            LedgerPolicy::default(),
        );
        let transactions = TransactionService::new(store.clone(), LedgerPolicy::default());
        Fixture {
            store,
            accounts,
            transactions,
            user,
        }
    }

    async fn open(fx: &Fixture, balance: i64) -> AccountNumber {
        fx.accounts
            .create_account(fx.user, balance)
            .await
            .unwrap()
            .account_number
    }

    async fn balance(fx: &Fixture, number: &AccountNumber) -> i64 {
        fx.accounts.find_account(number).await.unwrap().balance
    }

    #[tokio::test]
    async fn test_use_balance() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;

        let tx = fx.transactions.use_balance(fx.user, &number, 100).await.unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Use);
        assert_eq!(tx.result, TransactionResult::Success);
        assert_eq!(tx.amount, 100);
        assert_eq!(tx.balance_snapshot, 1900);
        assert_eq!(tx.transaction_id.as_str().len(), 32);
        assert_eq!(balance(&fx, &number).await, 1900);
    }

    #[tokio::test]
    async fn test_use_balance_exceeding_balance_changes_nothing() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;

        let err = fx
            .transactions
            .use_balance(fx.user, &number, 3000)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::AccountExceedBalance {
                amount: 3000,
                balance: 2000
            }
        );
        assert_eq!(balance(&fx, &number).await, 2000);
    }

    #[tokio::test]
    async fn test_use_balance_lookups() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;

        assert_eq!(
            fx.transactions
                .use_balance(UserId::new(99), &number, 10)
                .await,
            Err(LedgerError::UserNotFound(UserId::new(99)))
        );
        assert!(matches!(
            fx.transactions
                .use_balance(fx.user, &AccountNumber::from_u64(5), 10)
                .await,
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_use_then_cancel_then_cancel_again() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;

        let used = fx.transactions.use_balance(fx.user, &number, 100).await.unwrap();
        let canceled = fx
            .transactions
            .cancel_balance(&used.transaction_id, &number, 100)
            .await
            .unwrap();
        assert_eq!(canceled.transaction_type, TransactionType::Cancel);
        assert_eq!(canceled.balance_snapshot, 2000);
        assert_eq!(canceled.canceled_transaction_id, Some(used.transaction_id.clone()));
        assert_eq!(balance(&fx, &number).await, 2000);

        assert_eq!(
            fx.transactions
                .cancel_balance(&used.transaction_id, &number, 100)
                .await,
            Err(LedgerError::TransactionAlreadyCanceled(used.transaction_id.clone()))
        );
        assert!(matches!(
            fx.transactions
                .cancel_balance(&canceled.transaction_id, &number, 100)
                .await,
            Err(LedgerError::TransactionAlreadyCanceled(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_cancel_changes_nothing() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;
        let used = fx.transactions.use_balance(fx.user, &number, 100).await.unwrap();

        assert_eq!(
            fx.transactions
                .cancel_balance(&used.transaction_id, &number, 50)
                .await,
            Err(LedgerError::CancelMustBeFull {
                original: 100,
                requested: 50
            })
        );
        assert_eq!(balance(&fx, &number).await, 1900);
    }

    #[tokio::test]
    async fn test_cancel_on_other_account() {
        let fx = fixture().await;
        let first = open(&fx, 2000).await;
        let second = open(&fx, 2000).await;
        let used = fx.transactions.use_balance(fx.user, &first, 100).await.unwrap();

        assert!(matches!(
            fx.transactions
                .cancel_balance(&used.transaction_id, &second, 100)
                .await,
            Err(LedgerError::AccountTransactionMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_failed_transaction() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;
        let failed = fx
            .transactions
            .save_failed_transaction(&number, 100, TransactionType::Use)
            .await
            .unwrap();

        assert!(matches!(
            fx.transactions
                .cancel_balance(&failed.transaction_id, &number, 100)
                .await,
            Err(LedgerError::TransactionResultFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_old_transaction() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;
        let used = fx.transactions.use_balance(fx.user, &number, 100).await.unwrap();
        assert!(
            fx.store
                .backdate_transaction(&used.transaction_id, Utc::now() - Duration::days(400))
                .await
        );

        assert_eq!(
            fx.transactions
                .cancel_balance(&used.transaction_id, &number, 100)
                .await,
            Err(LedgerError::TooOldToCancel { years: 1 })
        );
    }

    #[tokio::test]
    async fn test_cancel_unknown_transaction() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;
        let token = TransactionToken::from_string("missing");

        assert_eq!(
            fx.transactions.cancel_balance(&token, &number, 100).await,
            Err(LedgerError::TransactionNotFound(token.clone()))
        );
        assert_eq!(
            fx.transactions.find_by_transaction_id(&token).await,
            Err(LedgerError::TransactionNotFound(token))
        );
    }

    #[tokio::test]
    async fn test_cancel_on_closed_account() {
        let fx = fixture().await;
        let number = open(&fx, 100).await;
        let used = fx.transactions.use_balance(fx.user, &number, 100).await.unwrap();
        fx.accounts.delete_account(fx.user, &number).await.unwrap();

        assert!(matches!(
            fx.transactions
                .cancel_balance(&used.transaction_id, &number, 100)
                .await,
            Err(LedgerError::AccountAlreadyClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_save_failed_transaction() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;

        let failed = fx
            .transactions
            .save_failed_transaction(&number, 3000, TransactionType::Use)
            .await
            .unwrap();
        assert_eq!(failed.result, TransactionResult::Fail);
        assert_eq!(failed.balance_snapshot, 2000);
        assert_eq!(balance(&fx, &number).await, 2000);

        assert_eq!(
            fx.transactions
                .save_failed_transaction(&number, 0, TransactionType::Cancel)
                .await,
            Err(LedgerError::InvalidAmount(0))
        );
        assert!(matches!(
            fx.transactions
                .save_failed_transaction(&AccountNumber::from_u64(3), 10, TransactionType::Use)
                .await,
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_account_transactions() {
        let fx = fixture().await;
        let number = open(&fx, 2000).await;
        for amount in [10, 20, 30] {
            fx.transactions
                .use_balance(fx.user, &number, amount)
                .await
                .unwrap();
        }

        let page = fx
            .transactions
            .list_account_transactions(&number, PageRequest { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.total_pages, 2);
        let amounts: Vec<i64> = page.data.iter().map(|tx| tx.amount).collect();
        assert_eq!(amounts, vec![30, 20]);
    }
}
