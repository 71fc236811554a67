//! Distributed account locks stored as lease rows.
//!
//! Every service instance sharing the database shares these locks. A key is
//! claimed with a single upsert that only overwrites an expired row, so two
//! owners can never both see their claim succeed while a lease is live.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tally_core::lock::{LockError, LockLease, LockManager};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::entities::account_locks;

/// [`LockManager`] backed by the `account_locks` table.
#[derive(Debug, Clone)]
pub struct DatabaseLockManager {
    db: DatabaseConnection,
    retry_interval: Duration,
}

impl DatabaseLockManager {
    /// Creates a lock manager polling every `retry_interval` while waiting.
    #[must_use]
    pub fn new(db: DatabaseConnection, retry_interval: Duration) -> Self {
        Self {
            db,
            retry_interval: retry_interval.max(Duration::from_millis(1)),
        }
    }

    /// Inserts the lease row, or takes over an expired one.
    ///
    /// Returns true if `lease` now owns the key.
    async fn try_claim(&self, lease: &LockLease, ttl: Duration) -> Result<bool, LockError> {
        let now_ms = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let row = account_locks::ActiveModel {
            lock_key: Set(lease.key().to_string()),
            owner_token: Set(lease.token().to_string()),
            expires_at_ms: Set(now_ms.saturating_add(ttl_ms)),
        };
        let on_conflict = OnConflict::column(account_locks::Column::LockKey)
            .update_columns([
                account_locks::Column::OwnerToken,
                account_locks::Column::ExpiresAtMs,
            ])
            .action_and_where(
                Expr::col((account_locks::Entity, account_locks::Column::ExpiresAtMs)).lt(now_ms),
            )
            .to_owned();

        let claimed = account_locks::Entity::insert(row)
            .on_conflict(on_conflict)
            .exec_without_returning(&self.db)
            .await
            .map_err(|err| LockError::Backend(err.to_string()))?;
        Ok(claimed == 1)
    }
}

#[async_trait]
impl LockManager for DatabaseLockManager {
    async fn acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<LockLease, LockError> {
        let granted = LockLease::new(key);
        let deadline = Instant::now().checked_add(wait);

        loop {
            if self.try_claim(&granted, lease).await? {
                debug!(key, "lock acquired");
                return Ok(granted);
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if deadline <= now => {
                    debug!(key, "lock wait timed out");
                    return Err(LockError::Unavailable {
                        key: key.to_string(),
                    });
                }
                Some(deadline) => self.retry_interval.min(deadline - now),
                None => self.retry_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }

    async fn release(&self, lease: &LockLease) -> Result<(), LockError> {
        let deleted = account_locks::Entity::delete_many()
            .filter(account_locks::Column::LockKey.eq(lease.key()))
            .filter(account_locks::Column::OwnerToken.eq(lease.token().to_string()))
            .exec(&self.db)
            .await
            .map_err(|err| LockError::Backend(err.to_string()))?;

        if deleted.rows_affected == 0 {
            warn!(key = lease.key(), "lock lease expired before release");
        } else {
            debug!(key = lease.key(), "lock released");
        }
        Ok(())
    }
}
