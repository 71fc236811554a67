//! Externally visible transaction identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The public `transactionId` of a ledger transaction.
///
/// Freshly generated tokens are random v4 UUIDs rendered as 32 lowercase hex
/// characters. Tokens received from callers are kept verbatim for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionToken(String);

impl TransactionToken {
    /// Generates a new random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wraps a token received from a caller or read from storage.
    #[must_use]
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<TransactionToken> for String {
    fn from(value: TransactionToken) -> Self {
        value.0
    }
}

impl std::fmt::Display for TransactionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
