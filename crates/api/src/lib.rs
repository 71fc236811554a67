//! HTTP API layer with Axum routes and request validation.
//!
//! This crate provides:
//! - REST API routes for accounts and transactions
//! - Request extractors that validate fields before the core sees them
//! - Mapping of ledger errors to structured responses

pub mod error;
pub mod extractors;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tally_core::LedgerPolicy;
use tally_core::account::{AccountService, HashAccountNumberGenerator};
use tally_core::ledger::TransactionService;
use tally_core::lock::{GuardedTransactions, LockManager, LockTimeouts, ScopedLocks};
use tally_core::store::LedgerStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account lifecycle operations, under the user or account lock.
    pub accounts: AccountService,
    /// Unguarded transaction queries.
    pub transactions: TransactionService,
    /// Use and cancel under the per-account lock.
    pub guarded: Arc<GuardedTransactions>,
}

impl AppState {
    /// Builds the services over `store`, locking accounts and users through
    /// `locks`.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        locks: Arc<dyn LockManager>,
        policy: LedgerPolicy,
        timeouts: LockTimeouts,
    ) -> Self {
        let accounts = AccountService::new(
            Arc::clone(&store),
            Arc::new(HashAccountNumberGenerator),
            ScopedLocks::new(Arc::clone(&locks), timeouts),
            policy,
        );
        let transactions = TransactionService::new(store, policy);
        let guarded = GuardedTransactions::new(transactions.clone(), locks, timeouts);
        Self {
            accounts,
            transactions,
            guarded: Arc::new(guarded),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
