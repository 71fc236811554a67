//! Process-local [`LockManager`].

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::{LockError, LockLease, LockManager};

/// Upper bound on how long a waiter sleeps between attempts; covers leases
/// that expire without a release notification.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy)]
struct Held {
    token: Uuid,
    /// `None` when the lease outlives the clock's range.
    expires_at: Option<Instant>,
}

impl Held {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Locks held in process memory; only serializes callers inside this
/// process.
#[derive(Debug, Default)]
pub struct InMemoryLockManager {
    locks: DashMap<String, Held>,
    released: Notify,
}

impl InMemoryLockManager {
    /// Creates a lock manager with no keys held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn try_claim(&self, key: &str, lease: Duration, now: Instant) -> Option<LockLease> {
        let granted = LockLease::new(key);
        let held = Held {
            token: granted.token(),
            expires_at: now.checked_add(lease),
        };
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut entry) if entry.get().is_expired(now) => {
                entry.insert(held);
                Some(granted)
            }
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(held);
                Some(granted)
            }
        }
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<LockLease, LockError> {
        let deadline = Instant::now().checked_add(wait);

        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let now = Instant::now();
            if let Some(granted) = self.try_claim(key, lease, now) {
                debug!(key, "lock acquired");
                return Ok(granted);
            }

            let next_poll = now + POLL_INTERVAL;
            let wake_at = match deadline {
                Some(deadline) if deadline <= now => {
                    return Err(LockError::Unavailable {
                        key: key.to_string(),
                    });
                }
                Some(deadline) => deadline.min(next_poll),
                None => next_poll,
            };

            tokio::select! {
                () = &mut released => {}
                () = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn release(&self, lease: &LockLease) -> Result<(), LockError> {
        let removed = self
            .locks
            .remove_if(lease.key(), |_, held| held.token == lease.token())
            .is_some();
        if removed {
            debug!(key = lease.key(), "lock released");
            self.released.notify_waiters();
        } else {
            debug!(key = lease.key(), "lock already expired or taken over");
        }
        Ok(())
    }
}
