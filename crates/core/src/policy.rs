//! Ledger policy limits.

use tally_shared::LedgerConfig;

/// Limits enforced by the account and transaction services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Maximum number of in-use accounts per user.
    pub max_accounts_per_user: u64,
    /// Years after which a transaction can no longer be canceled.
    pub cancel_window_years: u32,
    /// Account number generation attempts before giving up.
    pub account_number_attempts: u32,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for LedgerPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            max_accounts_per_user: config.max_accounts_per_user,
            cancel_window_years: config.cancel_window_years,
            account_number_attempts: config.account_number_attempts.max(1),
        }
    }
}
