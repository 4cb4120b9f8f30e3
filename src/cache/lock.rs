//! Cache locks that keep serving after a panicking writer.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recovered<G>(poisoned: PoisonError<G>, owner: &'static str, op: &'static str) -> G {
    warn!(
        target: "wger::cache",
        owner,
        op,
        "cache lock was poisoned; continuing with possibly stale state"
    );
    poisoned.into_inner()
}

pub(crate) trait RwLockExt<T> {
    fn read_recovered(&self, owner: &'static str, op: &'static str) -> RwLockReadGuard<'_, T>;
    fn write_recovered(&self, owner: &'static str, op: &'static str) -> RwLockWriteGuard<'_, T>;
}

impl<T> RwLockExt<T> for RwLock<T> {
    fn read_recovered(&self, owner: &'static str, op: &'static str) -> RwLockReadGuard<'_, T> {
        self.read()
            .unwrap_or_else(|poisoned| recovered(poisoned, owner, op))
    }

    fn write_recovered(&self, owner: &'static str, op: &'static str) -> RwLockWriteGuard<'_, T> {
        self.write()
            .unwrap_or_else(|poisoned| recovered(poisoned, owner, op))
    }
}

pub(crate) trait MutexExt<T> {
    fn lock_recovered(&self, owner: &'static str, op: &'static str) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    fn lock_recovered(&self, owner: &'static str, op: &'static str) -> MutexGuard<'_, T> {
        self.lock()
            .unwrap_or_else(|poisoned| recovered(poisoned, owner, op))
    }
}
