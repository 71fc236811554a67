//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod ledger;
pub mod lock;
pub mod user;

pub use ledger::SeaLedgerStore;
pub use lock::DatabaseLockManager;
pub use user::UserRepository;
