//! Per-fingerprint single-flight locks
//!
//! Two tiers: a short-lived table mutex guards lookup and creation of the
//! per-fingerprint locks, and each fingerprint gets its own async mutex held
//! for the whole produce-or-fetch sequence. Tasks that wait on a fingerprint
//! must re-check the cache once they get the lock, since the previous holder
//! has most likely produced the artifact already.

use crate::job::Fingerprint;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Table of per-fingerprint locks
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<Fingerprint, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<Fingerprint, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for exclusive hold of `fingerprint`.
    ///
    /// The hold is released when the returned guard is dropped. Waiters are
    /// served in arrival order.
    pub async fn acquire(&self, fingerprint: Fingerprint) -> FlightGuard {
        let lock = {
            let mut table = self.table();
            Arc::clone(table.entry(fingerprint).or_default())
        };

        let guard = lock.lock_owned().await;
        FlightGuard {
            fingerprint,
            _guard: guard,
        }
    }

    /// Drop locks that no task holds or waits on, returning how many were
    /// removed.
    ///
    /// Handles to a lock are only created under the table mutex, so a strong
    /// count of one means nothing outside the table can reach it and a later
    /// `acquire` simply creates a fresh one.
    pub fn reap_idle(&self) -> usize {
        let mut table = self.table();
        let before = table.len();
        table.retain(|_, lock| Arc::strong_count(lock) > 1);
        let reaped = before - table.len();
        if reaped > 0 {
            debug!("Reaped {} idle fingerprint locks", reaped);
        }
        reaped
    }

    /// Number of fingerprints with a lock entry
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one fingerprint
#[must_use = "the fingerprint is released when the guard is dropped"]
pub struct FlightGuard {
    fingerprint: Fingerprint,
    _guard: OwnedMutexGuard<()>,
}

impl FlightGuard {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}
