//! In-memory [`LedgerStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::{
    AccountNumber, PageRequest, TransactionToken,
    types::{AccountId, TransactionRecordId, UserId},
};
use tokio::sync::Mutex;

use super::{LedgerStore, StoreResult};
use crate::account::{Account, AccountStatus, NewAccount, User};
use crate::ledger::{NewTransaction, StoreError, Transaction, TransactionResult, TransactionType};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    next_user_id: i64,
}

/// Ledger state held in process memory.
///
/// A single mutex covers all tables, so every method is one atomic unit of
/// work.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<State>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and returns it with its assigned id.
    pub async fn add_user(&self, name: impl Into<String>) -> User {
        let mut state = self.state.lock().await;
        state.next_user_id += 1;
        let user = User {
            id: UserId::new(state.next_user_id),
            name: name.into(),
        };
        state.users.insert(user.id, user.clone());
        user
    }

    /// Rewrites the creation time of a stored transaction.
    ///
    /// Test support for ageing records past the cancellation window.
    pub async fn backdate_transaction(&self, id: &TransactionToken, at: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().await;
        match state
            .transactions
            .iter_mut()
            .find(|tx| &tx.transaction_id == id)
        {
            Some(tx) => {
                tx.transacted_at = at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_account(&self, number: &AccountNumber) -> StoreResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .iter()
            .find(|a| &a.account_number == number)
            .cloned())
    }

    async fn account_number_exists(&self, number: &AccountNumber) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.accounts.iter().any(|a| &a.account_number == number))
    }

    async fn count_accounts_in_use(&self, user_id: UserId) -> StoreResult<u64> {
        let state = self.state.lock().await;
        let count = state
            .accounts
            .iter()
            .filter(|a| a.is_owned_by(user_id) && a.is_in_use())
            .count();
        Ok(count as u64)
    }

    async fn list_accounts(&self, user_id: UserId) -> StoreResult<Vec<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .iter()
            .filter(|a| a.is_owned_by(user_id))
            .cloned()
            .collect())
    }

    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&account.user_id) {
            return Err(StoreError::Missing(format!("user {}", account.user_id)));
        }
        if state
            .accounts
            .iter()
            .any(|a| a.account_number == account.account_number)
        {
            return Err(StoreError::Conflict(format!(
                "account number {}",
                account.account_number
            )));
        }

        let account = Account {
            id: AccountId::new(state.accounts.len() as i64 + 1),
            user_id: account.user_id,
            account_number: account.account_number,
            status: AccountStatus::InUse,
            balance: account.balance,
            registered_at: account.registered_at,
            unregistered_at: None,
        };
        state.accounts.push(account.clone());
        Ok(account)
    }

    async fn close_account(&self, id: AccountId, at: DateTime<Utc>) -> StoreResult<Account> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::Missing(format!("account {id}")))?;
        if !account.is_in_use() || account.balance != 0 {
            return Err(StoreError::Stale(format!(
                "account {id} is not an empty in-use account"
            )));
        }
        account.status = AccountStatus::Unregistered;
        account.unregistered_at = Some(at);
        Ok(account.clone())
    }

    async fn record_transaction(&self, new: NewTransaction) -> StoreResult<Transaction> {
        let mut state = self.state.lock().await;
        if state
            .transactions
            .iter()
            .any(|tx| tx.transaction_id == new.transaction_id)
        {
            return Err(StoreError::Conflict(format!(
                "transaction id {}",
                new.transaction_id
            )));
        }

        let next_id = state.transactions.len() as i64 + 1;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.id == new.account_id)
            .ok_or_else(|| StoreError::Missing(format!("account {}", new.account_id)))?;
        if new.result == TransactionResult::Success {
            if !account.is_in_use() {
                return Err(StoreError::Stale(format!("account {} is unregistered", account.id)));
            }
            account.balance = new.balance_snapshot;
        }

        let transaction = Transaction {
            id: TransactionRecordId::new(next_id),
            transaction_id: new.transaction_id,
            account_id: account.id,
            account_number: account.account_number.clone(),
            transaction_type: new.transaction_type,
            result: new.result,
            amount: new.amount,
            balance_snapshot: new.balance_snapshot,
            canceled_transaction_id: new.canceled_transaction_id,
            transacted_at: new.transacted_at,
        };
        state.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn find_transaction(&self, id: &TransactionToken) -> StoreResult<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .find(|tx| &tx.transaction_id == id)
            .cloned())
    }

    async fn find_cancellation(
        &self,
        original: &TransactionToken,
    ) -> StoreResult<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .find(|tx| {
                tx.transaction_type == TransactionType::Cancel
                    && tx.is_success()
                    && tx.canceled_transaction_id.as_ref() == Some(original)
            })
            .cloned())
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> StoreResult<(Vec<Transaction>, u64)> {
        let state = self.state.lock().await;
        let all: Vec<&Transaction> = state
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.account_id == account_id)
            .collect();
        let total = all.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let data = all
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((data, total))
    }
}
