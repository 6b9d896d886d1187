//! Poison-tolerant lock acquisition for state shared with sync callers.

use std::sync::{LockResult, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(result: LockResult<G>, owner: &'static str, lock_kind: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            owner,
            lock_kind,
            result = "poisoned_recovered",
            "Recovered from poisoned lock; state may reflect a panicked writer"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn read<'a, T>(lock: &'a RwLock<T>, owner: &'static str) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), owner, "rwlock.read")
}

pub(crate) fn write<'a, T>(lock: &'a RwLock<T>, owner: &'static str) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), owner, "rwlock.write")
}

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, owner: &'static str) -> MutexGuard<'a, T> {
    recover(mutex.lock(), owner, "mutex.lock")
}
