//! Ledger error types.
//!
//! This module defines every error an account or transaction operation can
//! raise: lookups that find nothing, policy and business-rule violations,
//! temporal checks on cancellation, and infrastructure failures from the
//! store or the account lock.

use tally_shared::{AccountNumber, TransactionToken, types::UserId};
use thiserror::Error;

use crate::lock::LockError;

/// Errors raised by the persistence layer behind [`crate::store::LedgerStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing database failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflicting record: {0}")]
    Conflict(String),

    /// A record the write depends on does not exist.
    #[error("Missing record: {0}")]
    Missing(String),

    /// A conditional write matched no row because the record changed since
    /// it was read.
    #[error("Stale record: {0}")]
    Stale(String),
}

/// Broad grouping of ledger errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A user, account or transaction does not exist.
    NotFound,
    /// Ownership, account count or account state forbids the operation.
    Policy,
    /// The amount is not acceptable against the balance or original.
    Business,
    /// The target transaction's history forbids cancellation.
    Temporal,
    /// The store or the lock backend failed.
    Infrastructure,
    /// A lock-guarded operation failed for any reason.
    Composite,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Not Found ==========
    /// No user with this id.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// No matching account.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// No transaction with this id.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionToken),

    // ========== Policy ==========
    /// The user already holds the maximum number of in-use accounts.
    #[error("User already holds the maximum of {max} accounts")]
    MaxAccountPerUser {
        /// Configured maximum.
        max: u64,
    },

    /// The account cannot be closed while it holds money.
    #[error("Account still holds a balance of {balance}")]
    AccountHasBalance {
        /// Remaining balance.
        balance: i64,
    },

    /// The account is already unregistered.
    #[error("Account {0} is already unregistered")]
    AccountAlreadyClosed(AccountNumber),

    /// The requesting user does not own the account.
    #[error("User {user_id} does not own account {account_number}")]
    UserAccountMismatch {
        /// The requesting user.
        user_id: UserId,
        /// The account that was targeted.
        account_number: AccountNumber,
    },

    /// The transaction belongs to a different account.
    #[error("Transaction {0} does not belong to this account")]
    AccountTransactionMismatch(TransactionToken),

    // ========== Business Rules ==========
    /// The amount is larger than the balance.
    #[error("Amount {amount} exceeds the balance {balance}")]
    AccountExceedBalance {
        /// Requested amount.
        amount: i64,
        /// Current balance.
        balance: i64,
    },

    /// Partial cancellation was requested.
    #[error("Cancel amount {requested} must equal the transaction amount {original}")]
    CancelMustBeFull {
        /// Amount of the original transaction.
        original: i64,
        /// Amount the caller asked to cancel.
        requested: i64,
    },

    /// The amount is zero or negative.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),

    /// The initial balance is negative.
    #[error("Initial balance cannot be negative, got {0}")]
    NegativeInitialBalance(i64),

    /// Crediting would overflow the balance.
    #[error("Balance overflow")]
    BalanceOverflow,

    // ========== Temporal ==========
    /// The transaction is outside the cancellation window.
    #[error("Transactions older than {years} year(s) cannot be canceled")]
    TooOldToCancel {
        /// Window length in years.
        years: u32,
    },

    /// The transaction is itself a cancellation or has already been canceled.
    #[error("Transaction {0} is already canceled")]
    TransactionAlreadyCanceled(TransactionToken),

    /// The transaction failed and moved no money.
    #[error("Transaction {0} failed and cannot be canceled")]
    TransactionResultFailed(TransactionToken),

    // ========== Infrastructure ==========
    /// Another operation holds the account lock.
    #[error("Account is in use by another transaction: {0}")]
    LockUnavailable(String),

    /// The lock backend failed.
    #[error("Lock backend error: {0}")]
    LockBackend(String),

    /// No unused account number was found.
    #[error("Could not generate an unused account number after {attempts} attempts")]
    AccountNumberExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    // ========== Composite ==========
    /// A lock-guarded operation failed; carries the underlying reason.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

impl From<LockError> for LedgerError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Unavailable { key } => Self::LockUnavailable(key),
            LockError::Backend(message) => Self::LockBackend(message),
        }
    }
}

impl LedgerError {
    /// Returns the broad category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UserNotFound(_) | Self::AccountNotFound(_) | Self::TransactionNotFound(_) => {
                ErrorCategory::NotFound
            }
            Self::MaxAccountPerUser { .. }
            | Self::AccountHasBalance { .. }
            | Self::AccountAlreadyClosed(_)
            | Self::UserAccountMismatch { .. }
            | Self::AccountTransactionMismatch(_) => ErrorCategory::Policy,
            Self::AccountExceedBalance { .. }
            | Self::CancelMustBeFull { .. }
            | Self::InvalidAmount(_)
            | Self::NegativeInitialBalance(_)
            | Self::BalanceOverflow => ErrorCategory::Business,
            Self::TooOldToCancel { .. }
            | Self::TransactionAlreadyCanceled(_)
            | Self::TransactionResultFailed(_) => ErrorCategory::Temporal,
            Self::LockUnavailable(_)
            | Self::LockBackend(_)
            | Self::AccountNumberExhausted { .. }
            | Self::Store(_) => ErrorCategory::Infrastructure,
            Self::TransactionFailed(_) => ErrorCategory::Composite,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::MaxAccountPerUser { .. } => "MAX_ACCOUNT_PER_USER",
            Self::AccountHasBalance { .. } => "ACCOUNT_HAS_BALANCE",
            Self::AccountAlreadyClosed(_) => "ACCOUNT_ALREADY_CLOSED",
            Self::UserAccountMismatch { .. } => "USER_ACCOUNT_MISMATCH",
            Self::AccountTransactionMismatch(_) => "ACCOUNT_TRANSACTION_MISMATCH",
            Self::AccountExceedBalance { .. } => "ACCOUNT_EXCEED_BALANCE",
            Self::CancelMustBeFull { .. } => "CANCEL_MUST_BE_FULL",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::NegativeInitialBalance(_) => "NEGATIVE_INITIAL_BALANCE",
            Self::BalanceOverflow => "BALANCE_OVERFLOW",
            Self::TooOldToCancel { .. } => "TOO_OLD_TO_CANCEL",
            Self::TransactionAlreadyCanceled(_) => "TRANSACTION_ALREADY_CANCELED",
            Self::TransactionResultFailed(_) => "TRANSACTION_RESULT_FAILED",
            Self::LockUnavailable(_) => "LOCK_UNAVAILABLE",
            Self::LockBackend(_) => "LOCK_BACKEND_ERROR",
            Self::AccountNumberExhausted { .. } => "ACCOUNT_NUMBER_EXHAUSTED",
            Self::Store(_) => "DATABASE_ERROR",
            Self::TransactionFailed(_) => "TRANSACTION_FAILED",
        }
    }

    /// Returns the request field clients should attach the reason to.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "userId",
            Self::AccountExceedBalance { .. }
            | Self::CancelMustBeFull { .. }
            | Self::InvalidAmount(_)
            | Self::NegativeInitialBalance(_)
            | Self::BalanceOverflow => "amount",
            Self::TransactionNotFound(_)
            | Self::AccountTransactionMismatch(_)
            | Self::TooOldToCancel { .. }
            | Self::TransactionAlreadyCanceled(_)
            | Self::TransactionResultFailed(_)
            | Self::LockUnavailable(_)
            | Self::TransactionFailed(_) => "transaction",
            Self::AccountNotFound(_)
            | Self::MaxAccountPerUser { .. }
            | Self::AccountHasBalance { .. }
            | Self::AccountAlreadyClosed(_)
            | Self::UserAccountMismatch { .. } => "account",
            Self::LockBackend(_) | Self::AccountNumberExhausted { .. } | Self::Store(_) => {
                "internal"
            }
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::NotFound => 404,
            ErrorCategory::Policy
            | ErrorCategory::Business
            | ErrorCategory::Temporal
            | ErrorCategory::Composite => 400,
            ErrorCategory::Infrastructure => match self {
                Self::LockUnavailable(_) => 409,
                _ => 500,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> AccountNumber {
        AccountNumber::parse("1000000001").unwrap()
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::UserNotFound(UserId::new(1)).error_code(),
            "USER_NOT_FOUND"
        );
        assert_eq!(
            LedgerError::MaxAccountPerUser { max: 10 }.error_code(),
            "MAX_ACCOUNT_PER_USER"
        );
        assert_eq!(
            LedgerError::CancelMustBeFull {
                original: 100,
                requested: 50
            }
            .error_code(),
            "CANCEL_MUST_BE_FULL"
        );
        assert_eq!(
            LedgerError::TransactionFailed("x".into()).error_code(),
            "TRANSACTION_FAILED"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            LedgerError::AccountNotFound("x".into()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            LedgerError::AccountAlreadyClosed(number()).category(),
            ErrorCategory::Policy
        );
        assert_eq!(
            LedgerError::AccountExceedBalance {
                amount: 2,
                balance: 1
            }
            .category(),
            ErrorCategory::Business
        );
        assert_eq!(
            LedgerError::TooOldToCancel { years: 1 }.category(),
            ErrorCategory::Temporal
        );
        assert_eq!(
            LedgerError::LockUnavailable("ACLK:1".into()).category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            LedgerError::TransactionFailed("x".into()).category(),
            ErrorCategory::Composite
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            LedgerError::TransactionNotFound(TransactionToken::from_string("t")).http_status_code(),
            404
        );
        assert_eq!(LedgerError::AccountHasBalance { balance: 1 }.http_status_code(), 400);
        assert_eq!(LedgerError::TransactionFailed("x".into()).http_status_code(), 400);
        assert_eq!(LedgerError::LockUnavailable("k".into()).http_status_code(), 409);
        assert_eq!(
            LedgerError::Store(StoreError::Database("down".into())).http_status_code(),
            500
        );
    }

    #[test]
    fn test_fields() {
        assert_eq!(LedgerError::UserNotFound(UserId::new(1)).field(), "userId");
        assert_eq!(LedgerError::AccountHasBalance { balance: 5 }.field(), "account");
        assert_eq!(LedgerError::InvalidAmount(0).field(), "amount");
        assert_eq!(LedgerError::TransactionFailed("x".into()).field(), "transaction");
    }

    #[test]
    fn test_lock_error_conversion() {
        let err: LedgerError = LockError::Unavailable {
            key: "ACLK:1000000001".into(),
        }
        .into();
        assert_eq!(err, LedgerError::LockUnavailable("ACLK:1000000001".into()));

        let err: LedgerError = LockError::Backend("timeout".into()).into();
        assert_eq!(err.error_code(), "LOCK_BACKEND_ERROR");
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::AccountExceedBalance {
            amount: 3000,
            balance: 2000,
        };
        assert_eq!(err.to_string(), "Amount 3000 exceeds the balance 2000");

        let err = LedgerError::TransactionFailed(err.to_string());
        assert_eq!(
            err.to_string(),
            "Transaction failed: Amount 3000 exceeds the balance 2000"
        );

        let err = LedgerError::Store(StoreError::Database("closed".into()));
        assert_eq!(err.to_string(), "Database error: closed");
    }
}
