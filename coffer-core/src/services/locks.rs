//! Account lock service - per-account mutation rights
//!
//! Every balance mutation must hold the exclusive right for the account it
//! touches before reading the balance it will conditionally replace. Rights
//! are plain async mutexes keyed by account id; waiting for one parks the
//! task, it never blocks a thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Exclusive mutation right for a single account, released on drop
pub struct AccountGuard {
    _permit: OwnedMutexGuard<()>,
}

/// Mutation rights for two accounts
///
/// Fields drop in declaration order, so the right acquired second is
/// released first (reverse acquisition order).
pub struct PairGuard {
    _second: AccountGuard,
    _first: AccountGuard,
}

/// Table of per-account mutation rights
///
/// One entry per account id ever mutated; entries live for the process
/// lifetime. The table itself is the only piece of shared mutable state in
/// the service layer.
#[derive(Default)]
pub struct AccountLocks {
    table: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().expect("lock table poisoned");
        Arc::clone(table.entry(id).or_default())
    }

    /// Acquire the exclusive mutation right for one account
    ///
    /// Waits until the right is free. Holders must not perform unbounded
    /// blocking work before dropping the guard.
    pub async fn acquire(&self, id: Uuid) -> AccountGuard {
        AccountGuard {
            _permit: self.entry(id).lock_owned().await,
        }
    }

    /// Acquire the rights for both accounts of a transfer
    ///
    /// Rights are always taken in ascending id order regardless of transfer
    /// direction. Every multi-account operation must go through here; the
    /// uniform ordering is the sole deadlock-avoidance mechanism.
    pub async fn acquire_pair(&self, a: Uuid, b: Uuid) -> PairGuard {
        debug_assert_ne!(a, b, "pair lock on a single account");
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.acquire(first).await;
        let second = self.acquire(second).await;
        PairGuard {
            _second: second,
            _first: first,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_account_is_exclusive() {
        let locks = Arc::new(AccountLocks::new());
        let id = Uuid::new_v4();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_flight = Arc::clone(&in_flight);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
                assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_accounts_do_not_contend() {
        let locks = AccountLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _guard_a = locks.acquire(a).await;
        // Must not deadlock while a's right is held
        let _guard_b = locks.acquire(b).await;
    }

    #[tokio::test]
    async fn test_opposite_direction_pairs_do_not_deadlock() {
        let locks = Arc::new(AccountLocks::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut handles = Vec::new();
        for i in 0..50 {
            let locks = Arc::clone(&locks);
            // Alternate acquisition direction to provoke the classic deadlock
            let (x, y) = if i % 2 == 0 { (a, b) } else { (b, a) };
            handles.push(tokio::spawn(async move {
                let _guards = locks.acquire_pair(x, y).await;
                tokio::time::sleep(Duration::from_micros(100)).await;
            }));
        }
        tokio::time::timeout(Duration::from_secs(5), async {
            for handle in handles {
                handle.await.unwrap();
            }
        })
        .await
        .expect("pair locking deadlocked");
    }
}
