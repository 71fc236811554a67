//! Account lifecycle rules.

use tally_shared::types::UserId;

use super::types::Account;
use crate::ledger::LedgerError;

/// Ensures a user holding `in_use` open accounts may open another.
///
/// # Errors
///
/// Returns `MaxAccountPerUser` once `in_use` reaches `max`.
pub fn validate_capacity(in_use: u64, max: u64) -> Result<(), LedgerError> {
    if in_use >= max {
        return Err(LedgerError::MaxAccountPerUser { max });
    }
    Ok(())
}

/// Ensures an opening balance is not negative.
///
/// # Errors
///
/// Returns `NegativeInitialBalance` for values below zero.
pub fn validate_initial_balance(balance: i64) -> Result<(), LedgerError> {
    if balance < 0 {
        return Err(LedgerError::NegativeInitialBalance(balance));
    }
    Ok(())
}

/// Ensures the account still accepts transactions.
///
/// # Errors
///
/// Returns `AccountAlreadyClosed` for an unregistered account.
pub fn ensure_in_use(account: &Account) -> Result<(), LedgerError> {
    if !account.is_in_use() {
        return Err(LedgerError::AccountAlreadyClosed(
            account.account_number.clone(),
        ));
    }
    Ok(())
}

/// Ensures `user_id` may close `account`.
///
/// # Errors
///
/// Returns the first violated rule, checked in this order: ownership,
/// account status, zero balance.
pub fn validate_close(user_id: UserId, account: &Account) -> Result<(), LedgerError> {
    if !account.is_owned_by(user_id) {
        return Err(LedgerError::UserAccountMismatch {
            user_id,
            account_number: account.account_number.clone(),
        });
    }

    ensure_in_use(account)?;

    if account.balance > 0 {
        return Err(LedgerError::AccountHasBalance {
            balance: account.balance,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use tally_shared::{AccountNumber, types::AccountId};

    use crate::account::AccountStatus;

    fn account(balance: i64, status: AccountStatus) -> Account {
        Account {
            id: AccountId::new(1),
            user_id: UserId::new(1),
            account_number: AccountNumber::parse("1234567890").unwrap(),
            status,
            balance,
            registered_at: Utc::now(),
            unregistered_at: None,
        }
    }

    #[rstest]
    #[case(0, 10, true)]
    #[case(9, 10, true)]
    #[case(10, 10, false)]
    #[case(0, 0, false)]
    fn test_capacity(#[case] in_use: u64, #[case] max: u64, #[case] allowed: bool) {
        assert_eq!(validate_capacity(in_use, max).is_ok(), allowed);
    }

    #[test]
    fn test_initial_balance() {
        assert!(validate_initial_balance(0).is_ok());
        assert_eq!(
            validate_initial_balance(-1),
            Err(LedgerError::NegativeInitialBalance(-1))
        );
    }

    #[test]
    fn test_close_empty_account() {
        assert!(validate_close(UserId::new(1), &account(0, AccountStatus::InUse)).is_ok());
    }

    #[test]
    fn test_close_rejects_other_owner() {
        assert!(matches!(
            validate_close(UserId::new(2), &account(0, AccountStatus::InUse)),
            Err(LedgerError::UserAccountMismatch { .. })
        ));
    }

    #[test]
    fn test_close_rejects_closed_account() {
        assert!(matches!(
            validate_close(UserId::new(1), &account(0, AccountStatus::Unregistered)),
            Err(LedgerError::AccountAlreadyClosed(_))
        ));
    }

    #[test]
    fn test_close_rejects_remaining_balance() {
        assert_eq!(
            validate_close(UserId::new(1), &account(1000, AccountStatus::InUse)),
            Err(LedgerError::AccountHasBalance { balance: 1000 })
        );
    }
}
