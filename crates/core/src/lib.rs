//! Core ledger logic for Tally.
//!
//! This crate contains the account and transaction rules with ZERO web or
//! database dependencies. Persistence and locking reach it only through the
//! [`store::LedgerStore`] and [`lock::LockManager`] traits.
//!
//! # Modules
//!
//! - `account` - Account lifecycle and account number generation
//! - `ledger` - Use and cancel transactions, validation and errors
//! - `lock` - Per-account locks and the lock-guarded wrapper
//! - `store` - Persistence boundary and the in-memory store
//! - `policy` - Configurable ledger limits

pub mod account;
pub mod ledger;
pub mod lock;
pub mod policy;
pub mod store;

pub use policy::LedgerPolicy;
