//! Store locks that survive a panic in another holder.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), store, op, "read")
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), store, op, "write")
}

fn recover<G>(
    result: LockResult<G>,
    store: &'static str,
    op: &'static str,
    mode: &'static str,
) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "mdtoggle::lock",
            store,
            op,
            mode,
            "store lock was poisoned; continuing with possibly stale state"
        );
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn poisoned_locks_are_recovered() {
        let lock = Arc::new(RwLock::new(1));
        let poisoner = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = poisoner.write().expect("first lock");
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        *rw_write(&lock, "test", "write") += 1;
        assert_eq!(*rw_read(&lock, "test", "read"), 2);
    }
}
