//! Per-manual advisory locks for indexing.
//!
//! [`ManualLocks::acquire`] returns a guard holding an async mutex keyed by
//! `manual_id`. A second indexing pass for the same manual waits until the
//! first guard drops; passes for different manuals do not contend. Entries
//! are removed from the map once no holder or waiter remains.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

type LockMap = Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>;

#[derive(Default, Clone)]
pub struct ManualLocks {
    inner: Arc<LockMap>,
}

/// Held for the duration of one indexing pass.
pub struct ManualLockGuard {
    manual_id: i64,
    locks: Arc<LockMap>,
    _guard: OwnedMutexGuard<()>,
}

impl ManualLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, manual_id: i64) -> ManualLockGuard {
        let mutex = {
            let mut map = self.inner.lock().unwrap();
            map.entry(manual_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let guard = mutex.lock_owned().await;
        ManualLockGuard {
            manual_id,
            locks: self.inner.clone(),
            _guard: guard,
        }
    }

    /// Returns whether a pass for `manual_id` currently holds the lock.
    pub fn is_locked(&self, manual_id: i64) -> bool {
        let map = self.inner.lock().unwrap();
        map.get(&manual_id)
            .map(|m| m.try_lock().is_err())
            .unwrap_or(false)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

impl Drop for ManualLockGuard {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap();
        // Map entry + this guard's handle: nobody else is waiting.
        let idle = map
            .get(&self.manual_id)
            .map(|m| Arc::strong_count(m) <= 2)
            .unwrap_or(false);
        if idle {
            map.remove(&self.manual_id);
        }
    }
}
