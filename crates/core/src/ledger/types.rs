//! Ledger domain types for balance-changing transactions.
//!
//! Every use or cancel attempt produces exactly one [`Transaction`] record,
//! successful or not. Records are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::{
    AccountNumber, TransactionToken,
    types::{AccountId, TransactionRecordId},
};

use crate::account::Account;

/// Transaction type: a debit or the reversal of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Debit from the account balance.
    Use,
    /// Credit reversing an earlier `Use`.
    Cancel,
}

impl TransactionType {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Use => "USE",
            Self::Cancel => "CANCEL",
        }
    }
}

/// Outcome of a transaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionResult {
    /// The balance changed.
    Success,
    /// The attempt was rejected; the balance did not change.
    Fail,
}

impl TransactionResult {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
        }
    }
}

/// A persisted ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Surrogate ID.
    pub id: TransactionRecordId,
    /// Public transaction ID.
    pub transaction_id: TransactionToken,
    /// Account the transaction was applied to.
    pub account_id: AccountId,
    /// Public number of that account.
    pub account_number: AccountNumber,
    /// Use or cancel.
    pub transaction_type: TransactionType,
    /// Success or fail.
    pub result: TransactionResult,
    /// Amount in minor units.
    pub amount: i64,
    /// Account balance right after this record was produced.
    pub balance_snapshot: i64,
    /// For a successful cancel, the transaction it reverses.
    pub canceled_transaction_id: Option<TransactionToken>,
    /// Creation time.
    pub transacted_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns true if the record changed the account balance.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == TransactionResult::Success
    }
}

/// Input for appending a transaction record.
///
/// For `Success` records the store also writes `balance_snapshot` into the
/// account balance, in the same unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Public transaction ID.
    pub transaction_id: TransactionToken,
    /// Target account.
    pub account_id: AccountId,
    /// Use or cancel.
    pub transaction_type: TransactionType,
    /// Success or fail.
    pub result: TransactionResult,
    /// Amount in minor units.
    pub amount: i64,
    /// Balance after the attempt.
    pub balance_snapshot: i64,
    /// Reversed transaction, for cancels.
    pub canceled_transaction_id: Option<TransactionToken>,
    /// Creation time.
    pub transacted_at: DateTime<Utc>,
}

impl NewTransaction {
    /// A successful transaction leaving the account at `new_balance`.
    #[must_use]
    pub fn success(
        account: &Account,
        transaction_type: TransactionType,
        amount: i64,
        new_balance: i64,
        canceled_transaction_id: Option<TransactionToken>,
    ) -> Self {
        Self {
            transaction_id: TransactionToken::generate(),
            account_id: account.id,
            transaction_type,
            result: TransactionResult::Success,
            amount,
            balance_snapshot: new_balance,
            canceled_transaction_id,
            transacted_at: Utc::now(),
        }
    }

    /// A failed attempt; the snapshot is the unchanged balance.
    #[must_use]
    pub fn failure(account: &Account, transaction_type: TransactionType, amount: i64) -> Self {
        Self {
            transaction_id: TransactionToken::generate(),
            account_id: account.id,
            transaction_type,
            result: TransactionResult::Fail,
            amount,
            balance_snapshot: account.balance,
            canceled_transaction_id: None,
            transacted_at: Utc::now(),
        }
    }
}
