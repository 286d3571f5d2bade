//! Per-agreement operation guards
//!
//! Every operation on an agreement holds that agreement's guard from its
//! first read to its last write, including the external transfer of a pull
//! and any rollback after it. Another thread touching the same agreement
//! waits until the operation has settled or been undone, so it never sees a
//! reservation that may still disappear.
//!
//! The guards are reentrant. A transfer hook that calls back into the token
//! on the same thread passes straight through and sees the spend its caller
//! already committed.

use std::collections::HashMap;
use std::sync::Arc;

use openibank_types::AgreementKey;
use parking_lot::{Mutex, ReentrantMutex};

/// Lock handle for one agreement
pub type AgreementLock = Arc<ReentrantMutex<()>>;

/// Registry of one reentrant lock per agreement key
#[derive(Debug, Default)]
pub struct AgreementGuards {
    locks: Mutex<HashMap<AgreementKey, AgreementLock>>,
}

impl AgreementGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `key`, created on first use.
    ///
    /// The registry lock is released before this returns; callers hold only
    /// the agreement lock while they work.
    pub fn lock_for(&self, key: &AgreementKey) -> AgreementLock {
        self.locks.lock().entry(*key).or_default().clone()
    }

    /// Agreements that have ever been guarded
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openibank_types::Address;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn key(expiry: u64) -> AgreementKey {
        AgreementKey::new(Address::repeat_byte(1), Address::repeat_byte(2), 60, expiry)
    }

    #[test]
    fn test_same_key_shares_one_lock() {
        let guards = AgreementGuards::new();
        let a = guards.lock_for(&key(0));
        let b = guards.lock_for(&key(0));
        let other = guards.lock_for(&key(5));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(guards.len(), 2);
    }

    #[test]
    fn test_reentrant_on_same_thread() {
        let guards = AgreementGuards::new();
        let lock = guards.lock_for(&key(0));
        let _outer = lock.lock();
        let again = guards.lock_for(&key(0));
        let _inner = again.lock();
    }

    #[test]
    fn test_other_thread_waits() {
        let guards = Arc::new(AgreementGuards::new());
        let lock = guards.lock_for(&key(0));
        let held = lock.lock();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let guards = guards.clone();
            thread::spawn(move || {
                let lock = guards.lock_for(&key(0));
                let _g = lock.lock();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(held);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
    }
}
