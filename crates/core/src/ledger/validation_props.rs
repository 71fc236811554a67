//! Property-based tests for use and cancel validation.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use tally_shared::{
    AccountNumber, TransactionToken,
    types::{AccountId, TransactionRecordId, UserId},
};

use super::error::LedgerError;
use super::types::{Transaction, TransactionResult, TransactionType};
use super::validation::{CancelCheck, is_within_cancel_window, validate_cancel, validate_use};
use crate::account::{Account, AccountStatus};

fn account(balance: i64) -> Account {
    Account {
        id: AccountId::new(1),
        user_id: UserId::new(1),
        account_number: AccountNumber::parse("0000000001").unwrap(),
        status: AccountStatus::InUse,
        balance,
        registered_at: Utc::now(),
        unregistered_at: None,
    }
}

fn used(amount: i64) -> Transaction {
    Transaction {
        id: TransactionRecordId::new(1),
        transaction_id: TransactionToken::generate(),
        account_id: AccountId::new(1),
        account_number: AccountNumber::parse("0000000001").unwrap(),
        transaction_type: TransactionType::Use,
        result: TransactionResult::Success,
        amount,
        balance_snapshot: 0,
        canceled_transaction_id: None,
        transacted_at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A debit within the balance leaves exactly `balance - amount`.
    #[test]
    fn prop_use_within_balance_debits(
        balance in 1i64..1_000_000_000_000,
        fraction in 1u32..=100,
    ) {
        let amount = (balance * i64::from(fraction) / 100).max(1);
        let after = validate_use(UserId::new(1), &account(balance), amount);
        prop_assert_eq!(after, Ok(balance - amount));
    }

    /// A debit above the balance is always rejected.
    #[test]
    fn prop_use_over_balance_rejected(
        balance in 0i64..1_000_000_000,
        excess in 1i64..1_000_000,
    ) {
        let amount = balance + excess;
        let result = validate_use(UserId::new(1), &account(balance), amount);
        prop_assert_eq!(
            result,
            Err(LedgerError::AccountExceedBalance { amount, balance })
        );
    }

    /// Any amount other than the original's is a partial cancel.
    #[test]
    fn prop_partial_cancel_rejected(
        original in 1i64..1_000_000_000,
        requested in 1i64..1_000_000_000,
    ) {
        prop_assume!(original != requested);
        let acct = account(0);
        let tx = used(original);
        let check = CancelCheck {
            account: &acct,
            original: &tx,
            already_canceled: false,
            amount: requested,
            window_years: 1,
            now: Utc::now(),
        };
        prop_assert_eq!(
            validate_cancel(&check),
            Err(LedgerError::CancelMustBeFull { original, requested })
        );
    }

    /// Use followed by full cancel restores the starting balance.
    #[test]
    fn prop_use_then_cancel_restores_balance(
        balance in 1i64..1_000_000_000_000,
        amount in 1i64..1_000_000_000,
    ) {
        prop_assume!(amount <= balance);
        let mut acct = account(balance);
        acct.balance = validate_use(UserId::new(1), &acct, amount).unwrap();
        let tx = used(amount);
        let check = CancelCheck {
            account: &acct,
            original: &tx,
            already_canceled: false,
            amount,
            window_years: 1,
            now: Utc::now(),
        };
        prop_assert_eq!(validate_cancel(&check), Ok(balance));
    }

    /// Transactions younger than the window are cancellable, older ones are not.
    #[test]
    fn prop_cancel_window(years in 1u32..10, days in 0i64..5000) {
        let now = Utc::now();
        let at = now - Duration::days(days);
        let within = is_within_cancel_window(at, years, now);
        // 365 days per year undercounts, 366 overcounts
        if days <= i64::from(years) * 365 {
            prop_assert!(within);
        }
        if days > i64::from(years) * 366 {
            prop_assert!(!within);
        }
    }
}
