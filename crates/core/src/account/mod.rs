//! Account ownership and lifecycle.
//!
//! Accounts are opened with a generated number, hold a non-negative balance
//! that only the transaction engine changes, and are closed (never deleted)
//! once empty.

pub mod number;
pub mod service;
pub mod types;
pub mod validation;

pub use number::{AccountNumberGenerator, HashAccountNumberGenerator};
pub use service::AccountService;
pub use types::{Account, AccountStatus, AccountSummary, NewAccount, User};
pub use validation::{ensure_in_use, validate_capacity, validate_close, validate_initial_balance};
