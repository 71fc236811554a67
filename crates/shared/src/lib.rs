//! Shared types and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Typed numeric IDs for type-safe entity references
//! - Account numbers and transaction tokens
//! - Pagination types for list endpoints
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, LedgerConfig, LockBackend, LockConfig};
pub use types::{AccountNumber, PageRequest, PageResponse, TransactionToken};
