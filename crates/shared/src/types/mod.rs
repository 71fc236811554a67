//! Common types used across the application.

pub mod account_number;
pub mod id;
pub mod pagination;
pub mod token;

pub use account_number::{ACCOUNT_NUMBER_LEN, ACCOUNT_NUMBER_MODULUS, AccountNumber, AccountNumberError};
pub use id::*;
pub use pagination::{PageMeta, PageRequest, PageResponse};
pub use token::TransactionToken;
