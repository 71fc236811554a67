//! Account domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::{
    AccountNumber,
    types::{AccountId, UserId},
};

/// An account owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
}

/// Account lifecycle status.
///
/// An account only ever moves from `InUse` to `Unregistered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Open and accepting transactions.
    InUse,
    /// Closed; kept for audit.
    Unregistered,
}

impl AccountStatus {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InUse => "IN_USE",
            Self::Unregistered => "UNREGISTERED",
        }
    }
}

/// A user-owned account holding a non-negative balance in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Surrogate ID.
    pub id: AccountId,
    /// Owning user.
    pub user_id: UserId,
    /// Public account number.
    pub account_number: AccountNumber,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Current balance.
    pub balance: i64,
    /// When the account was opened.
    pub registered_at: DateTime<Utc>,
    /// When the account was closed.
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Returns true if the account accepts transactions.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.status == AccountStatus::InUse
    }

    /// Returns true if `user_id` owns this account.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Returns the public summary of this account.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            account_number: self.account_number.clone(),
            balance: self.balance,
        }
    }
}

/// Input for persisting a freshly opened account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Owning user.
    pub user_id: UserId,
    /// Account number, already checked for collisions.
    pub account_number: AccountNumber,
    /// Opening balance.
    pub balance: i64,
    /// Opening time.
    pub registered_at: DateTime<Utc>,
}

/// Account number and balance, as listed for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Public account number.
    pub account_number: AccountNumber,
    /// Current balance.
    pub balance: i64,
}
