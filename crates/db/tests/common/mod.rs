//! Shared setup for database integration tests.

#![allow(dead_code)]

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tally_db::migration::{Migrator, MigratorTrait};
use tally_db::UserRepository;
use tally_shared::types::UserId;

/// Opens a fresh in-memory SQLite database with all migrations applied.
///
/// The pool is pinned to one connection; every connection to `:memory:`
/// would otherwise see its own empty database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open SQLite database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Inserts a user and returns its id.
pub async fn create_user(db: &DatabaseConnection, name: &str) -> UserId {
    let user = UserRepository::new(db.clone())
        .create(name)
        .await
        .expect("Failed to create user");
    UserId::new(user.id)
}
