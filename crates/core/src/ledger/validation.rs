//! Business rule validation for use and cancel operations.
//!
//! These checks are pure: callers resolve the account and transactions from
//! the store and pass them in, so the rules can be exercised without I/O.

use chrono::{DateTime, Months, Utc};
use tally_shared::types::UserId;

use super::error::LedgerError;
use super::types::{Transaction, TransactionType};
use crate::account::{Account, ensure_in_use};

/// Validates a debit of `amount` from `account` requested by `user_id`.
///
/// Returns the balance after the debit.
///
/// # Errors
///
/// Returns the first violated rule, checked in this order: non-positive
/// amount, ownership, account status, sufficient balance.
pub fn validate_use(user_id: UserId, account: &Account, amount: i64) -> Result<i64, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }

    if !account.is_owned_by(user_id) {
        return Err(LedgerError::UserAccountMismatch {
            user_id,
            account_number: account.account_number.clone(),
        });
    }

    ensure_in_use(account)?;

    if amount > account.balance {
        return Err(LedgerError::AccountExceedBalance {
            amount,
            balance: account.balance,
        });
    }

    Ok(account.balance - amount)
}

/// Everything a cancellation is checked against.
#[derive(Debug, Clone, Copy)]
pub struct CancelCheck<'a> {
    /// Account the credit goes to.
    pub account: &'a Account,
    /// Transaction being reversed.
    pub original: &'a Transaction,
    /// Whether a successful cancel of `original` already exists.
    pub already_canceled: bool,
    /// Amount the caller asked to cancel.
    pub amount: i64,
    /// Cancellation window in years.
    pub window_years: u32,
    /// Evaluation time.
    pub now: DateTime<Utc>,
}

/// Validates the reversal of `check.original`.
///
/// The account must already be known to be in use. Returns the balance after
/// the credit.
///
/// # Errors
///
/// Returns the first violated rule, checked in this order: account match,
/// prior cancellation, failed original, cancellation window, full amount,
/// balance overflow.
pub fn validate_cancel(check: &CancelCheck<'_>) -> Result<i64, LedgerError> {
    let CancelCheck {
        account,
        original,
        already_canceled,
        amount,
        window_years,
        now,
    } = *check;

    if original.account_id != account.id {
        return Err(LedgerError::AccountTransactionMismatch(
            original.transaction_id.clone(),
        ));
    }

    if original.transaction_type == TransactionType::Cancel || already_canceled {
        return Err(LedgerError::TransactionAlreadyCanceled(
            original.transaction_id.clone(),
        ));
    }

    if !original.is_success() {
        return Err(LedgerError::TransactionResultFailed(
            original.transaction_id.clone(),
        ));
    }

    if !is_within_cancel_window(original.transacted_at, window_years, now) {
        return Err(LedgerError::TooOldToCancel {
            years: window_years,
        });
    }

    if amount != original.amount {
        return Err(LedgerError::CancelMustBeFull {
            original: original.amount,
            requested: amount,
        });
    }

    account
        .balance
        .checked_add(amount)
        .ok_or(LedgerError::BalanceOverflow)
}

/// Returns true while `transacted_at` plus `years` has not passed `now`.
///
/// A bound beyond the representable calendar never expires.
#[must_use]
pub fn is_within_cancel_window(
    transacted_at: DateTime<Utc>,
    years: u32,
    now: DateTime<Utc>,
) -> bool {
    transacted_at
        .checked_add_months(Months::new(years.saturating_mul(12)))
        .is_none_or(|deadline| now <= deadline)
}
