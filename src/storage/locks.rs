use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::AccountId;

/// Exclusive per-account locks shared by every unit running on one store.
///
/// SQLite only offers a database-wide write lock, so account-level
/// serialization lives here: a unit holds the locks of the accounts it
/// touches for its whole lifetime, and units on disjoint accounts never
/// wait on each other.
#[derive(Debug, Clone, Default)]
pub struct RowLocks {
    rows: Arc<DashMap<AccountId, Arc<Mutex<()>>>>,
}

/// Locks held by one unit. Dropping it releases them.
#[derive(Debug)]
pub struct RowGuard {
    ids: Vec<AccountId>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl RowGuard {
    /// Locked account ids, ascending.
    pub fn ids(&self) -> &[AccountId] {
        &self.ids
    }
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the locks of `ids`, always lowest id first so two units
    /// locking the same pair can't deadlock.
    pub async fn lock(&self, ids: &[AccountId]) -> RowGuard {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in &ids {
            // Clone the handle out so no map shard stays borrowed across the await.
            let row = self.rows.entry(*id).or_default().value().clone();
            guards.push(row.lock_owned().await);
            debug!(account_id = *id, "Row lock taken");
        }

        RowGuard {
            ids,
            _guards: guards,
        }
    }

    /// True if some unit currently holds the lock of `id`.
    pub fn is_locked(&self, id: AccountId) -> bool {
        self.rows
            .get(&id)
            .map(|row| row.value().try_lock().is_err())
            .unwrap_or(false)
    }
}
