//! Entity re-exports.

pub use super::account_locks::Entity as AccountLocks;
pub use super::accounts::Entity as Accounts;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
