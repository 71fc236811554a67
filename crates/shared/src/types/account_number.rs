//! Externally visible account numbers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of digits in every account number.
pub const ACCOUNT_NUMBER_LEN: usize = 10;

/// 10^`ACCOUNT_NUMBER_LEN`.
pub const ACCOUNT_NUMBER_MODULUS: u64 = 10_000_000_000;

/// Reasons a string is not a valid account number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountNumberError {
    /// Wrong length.
    #[error("Account number must be exactly {ACCOUNT_NUMBER_LEN} digits, got {0}")]
    InvalidLength(usize),

    /// Contains something other than ASCII digits.
    #[error("Account number must contain only digits")]
    NonDigit,
}

/// A fixed-length numeric account number, e.g. `"0123456789"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Parses and validates an account number.
    ///
    /// # Errors
    ///
    /// Returns an error unless `value` is exactly ten ASCII digits.
    pub fn parse(value: impl Into<String>) -> Result<Self, AccountNumberError> {
        let value = value.into();
        if value.len() != ACCOUNT_NUMBER_LEN {
            return Err(AccountNumberError::InvalidLength(value.len()));
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccountNumberError::NonDigit);
        }
        Ok(Self(value))
    }

    /// Builds an account number from the low ten decimal digits of `value`,
    /// zero-padded.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(format!("{:010}", value % ACCOUNT_NUMBER_MODULUS))
    }

    /// Returns the digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = AccountNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

impl std::str::FromStr for AccountNumber {
    type Err = AccountNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
