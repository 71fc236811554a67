//! Balance-changing transactions.
//!
//! This module implements the transaction engine:
//! - Transaction records (use and cancel, success and fail)
//! - Business rule validation for debits and reversals
//! - The transaction service applying and recording operations
//! - Error types shared by every ledger operation

pub mod error;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use error::{ErrorCategory, LedgerError, StoreError};
pub use service::TransactionService;
pub use types::{NewTransaction, Transaction, TransactionResult, TransactionType};
pub use validation::{CancelCheck, is_within_cancel_window, validate_cancel, validate_use};
