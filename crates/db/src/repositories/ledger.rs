//! `SeaORM`-backed [`LedgerStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tally_core::account::{Account, AccountStatus, NewAccount, User};
use tally_core::ledger::{
    NewTransaction, StoreError, Transaction, TransactionResult, TransactionType,
};
use tally_core::store::{LedgerStore, StoreResult};
use tally_shared::{
    AccountNumber, PageRequest, TransactionToken,
    types::{AccountId, TransactionRecordId, UserId},
};

use crate::entities::{accounts, sea_orm_active_enums as db_enums, transactions, users};

/// Classifies a database error for the core.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => StoreError::Conflict(message),
        Some(SqlErr::ForeignKeyConstraintViolation(message)) => StoreError::Missing(message),
        _ => StoreError::Database(err.to_string()),
    }
}

impl From<AccountStatus> for db_enums::AccountStatus {
    fn from(status: AccountStatus) -> Self {
        match status {
            AccountStatus::InUse => Self::InUse,
            AccountStatus::Unregistered => Self::Unregistered,
        }
    }
}

impl From<db_enums::AccountStatus> for AccountStatus {
    fn from(status: db_enums::AccountStatus) -> Self {
        match status {
            db_enums::AccountStatus::InUse => Self::InUse,
            db_enums::AccountStatus::Unregistered => Self::Unregistered,
        }
    }
}

impl From<TransactionType> for db_enums::TransactionType {
    fn from(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Use => Self::Use,
            TransactionType::Cancel => Self::Cancel,
        }
    }
}

impl From<db_enums::TransactionType> for TransactionType {
    fn from(kind: db_enums::TransactionType) -> Self {
        match kind {
            db_enums::TransactionType::Use => Self::Use,
            db_enums::TransactionType::Cancel => Self::Cancel,
        }
    }
}

impl From<TransactionResult> for db_enums::TransactionResult {
    fn from(result: TransactionResult) -> Self {
        match result {
            TransactionResult::Success => Self::Success,
            TransactionResult::Fail => Self::Fail,
        }
    }
}

impl From<db_enums::TransactionResult> for TransactionResult {
    fn from(result: db_enums::TransactionResult) -> Self {
        match result {
            db_enums::TransactionResult::Success => Self::Success,
            db_enums::TransactionResult::Fail => Self::Fail,
        }
    }
}

fn parse_account_number(raw: String) -> StoreResult<AccountNumber> {
    AccountNumber::parse(raw.clone())
        .map_err(|err| StoreError::Database(format!("stored account number {raw:?}: {err}")))
}

fn to_account(model: accounts::Model) -> StoreResult<Account> {
    Ok(Account {
        id: AccountId::new(model.id),
        user_id: UserId::new(model.user_id),
        account_number: parse_account_number(model.account_number)?,
        status: model.status.into(),
        balance: model.balance,
        registered_at: model.registered_at,
        unregistered_at: model.unregistered_at,
    })
}

fn to_transaction(model: transactions::Model, account_number: AccountNumber) -> Transaction {
    Transaction {
        id: TransactionRecordId::new(model.id),
        transaction_id: TransactionToken::from_string(model.transaction_id),
        account_id: AccountId::new(model.account_id),
        account_number,
        transaction_type: model.transaction_type.into(),
        result: model.result.into(),
        amount: model.amount,
        balance_snapshot: model.balance_snapshot,
        canceled_transaction_id: model
            .canceled_transaction_id
            .map(TransactionToken::from_string),
        transacted_at: model.transacted_at,
    }
}

fn with_account(
    found: Option<(transactions::Model, Option<accounts::Model>)>,
) -> StoreResult<Option<Transaction>> {
    let Some((model, account)) = found else {
        return Ok(None);
    };
    let account = account.ok_or_else(|| {
        StoreError::Missing(format!("account {} of transaction {}", model.account_id, model.id))
    })?;
    let number = parse_account_number(account.account_number)?;
    Ok(Some(to_transaction(model, number)))
}

/// Ledger store over a `SeaORM` connection.
#[derive(Debug, Clone)]
pub struct SeaLedgerStore {
    db: DatabaseConnection,
}

impl SeaLedgerStore {
    /// Creates a new ledger store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_account_by_id<C: ConnectionTrait>(
        conn: &C,
        id: AccountId,
    ) -> StoreResult<accounts::Model> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(conn)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::Missing(format!("account {id}")))
    }
}

#[async_trait]
impl LedgerStore for SeaLedgerStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let user = users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(user.map(|u| User {
            id: UserId::new(u.id),
            name: u.name,
        }))
    }

    async fn find_account(&self, number: &AccountNumber) -> StoreResult<Option<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::AccountNumber.eq(number.as_str()))
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map(to_account)
            .transpose()
    }

    async fn account_number_exists(&self, number: &AccountNumber) -> StoreResult<bool> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::AccountNumber.eq(number.as_str()))
            .count(&self.db)
            .await
            .map_err(store_error)?;
        Ok(count > 0)
    }

    async fn count_accounts_in_use(&self, user_id: UserId) -> StoreResult<u64> {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.into_inner()))
            .filter(accounts::Column::Status.eq(db_enums::AccountStatus::InUse))
            .count(&self.db)
            .await
            .map_err(store_error)
    }

    async fn list_accounts(&self, user_id: UserId) -> StoreResult<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.into_inner()))
            .order_by_asc(accounts::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(to_account)
            .collect()
    }

    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        let model = accounts::ActiveModel {
            user_id: Set(account.user_id.into_inner()),
            account_number: Set(account.account_number.as_str().to_string()),
            status: Set(db_enums::AccountStatus::InUse),
            balance: Set(account.balance),
            registered_at: Set(account.registered_at),
            unregistered_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(store_error)?;
        to_account(model)
    }

    async fn close_account(&self, id: AccountId, at: DateTime<Utc>) -> StoreResult<Account> {
        let txn = self.db.begin().await.map_err(store_error)?;

        let closed = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Status,
                Expr::value(db_enums::AccountStatus::Unregistered),
            )
            .col_expr(accounts::Column::UnregisteredAt, Expr::value(at))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .filter(accounts::Column::Status.eq(db_enums::AccountStatus::InUse))
            .filter(accounts::Column::Balance.eq(0))
            .exec(&txn)
            .await
            .map_err(store_error)?;

        let model = Self::find_account_by_id(&txn, id).await?;
        if closed.rows_affected == 0 {
            return Err(StoreError::Stale(format!(
                "account {id} is not an empty in-use account"
            )));
        }
        txn.commit().await.map_err(store_error)?;

        to_account(model)
    }

    async fn record_transaction(&self, new: NewTransaction) -> StoreResult<Transaction> {
        let txn = self.db.begin().await.map_err(store_error)?;

        let account = Self::find_account_by_id(&txn, new.account_id).await?;

        let model = transactions::ActiveModel {
            transaction_id: Set(new.transaction_id.as_str().to_string()),
            account_id: Set(account.id),
            transaction_type: Set(new.transaction_type.into()),
            result: Set(new.result.into()),
            amount: Set(new.amount),
            balance_snapshot: Set(new.balance_snapshot),
            canceled_transaction_id: Set(new
                .canceled_transaction_id
                .as_ref()
                .map(|token| token.as_str().to_string())),
            transacted_at: Set(new.transacted_at),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(store_error)?;

        if new.result == TransactionResult::Success {
            let updated = accounts::Entity::update_many()
                .col_expr(accounts::Column::Balance, Expr::value(new.balance_snapshot))
                .filter(accounts::Column::Id.eq(account.id))
                .filter(accounts::Column::Status.eq(db_enums::AccountStatus::InUse))
                .exec(&txn)
                .await
                .map_err(store_error)?;
            if updated.rows_affected == 0 {
                return Err(StoreError::Stale(format!("account {} is unregistered", account.id)));
            }
        }

        txn.commit().await.map_err(store_error)?;

        let number = parse_account_number(account.account_number)?;
        Ok(to_transaction(model, number))
    }

    async fn find_transaction(&self, id: &TransactionToken) -> StoreResult<Option<Transaction>> {
        let found = transactions::Entity::find()
            .filter(transactions::Column::TransactionId.eq(id.as_str()))
            .find_also_related(accounts::Entity)
            .one(&self.db)
            .await
            .map_err(store_error)?;
        with_account(found)
    }

    async fn find_cancellation(
        &self,
        original: &TransactionToken,
    ) -> StoreResult<Option<Transaction>> {
        let found = transactions::Entity::find()
            .filter(transactions::Column::CanceledTransactionId.eq(original.as_str()))
            .filter(transactions::Column::TransactionType.eq(db_enums::TransactionType::Cancel))
            .filter(transactions::Column::Result.eq(db_enums::TransactionResult::Success))
            .find_also_related(accounts::Entity)
            .one(&self.db)
            .await
            .map_err(store_error)?;
        with_account(found)
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> StoreResult<(Vec<Transaction>, u64)> {
        let account = Self::find_account_by_id(&self.db, account_id).await?;
        let number = parse_account_number(account.account_number)?;

        let query = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account.id));
        let total = query.clone().count(&self.db).await.map_err(store_error)?;
        let models = query
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(store_error)?;

        let data = models
            .into_iter()
            .map(|model| to_transaction(model, number.clone()))
            .collect();
        Ok((data, total))
    }
}
