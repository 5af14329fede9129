//! Per-identity async locks.
//!
//! Two batches running in the same process may both carry a certificate for
//! the same `(CURP, ECM)` key. Holding the key's lock for the whole of a
//! winner's matching and persistence serializes them, so the second one sees
//! the first one's certificate and replaces it instead of inserting a twin.

use conocer_core::models::IdentityKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct IdentityKeyLocks {
    inner: Arc<Mutex<HashMap<IdentityKey, Weak<AsyncMutex<()>>>>>,
}

impl IdentityKeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock of `key`. Released when the guard drops.
    pub async fn lock(&self, key: &IdentityKey) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // Entries whose guards are all gone
            map.retain(|_, weak| weak.strong_count() > 0);
            match map.get(key).and_then(Weak::upgrade) {
                Some(mutex) => mutex,
                None => {
                    let mutex = Arc::new(AsyncMutex::new(()));
                    map.insert(key.clone(), Arc::downgrade(&mutex));
                    mutex
                }
            }
        };
        mutex.lock_owned().await
    }

    /// Keys currently locked or awaited.
    pub fn active_keys(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn key(curp: &str) -> IdentityKey {
        IdentityKey::new(curp, "ECM0217")
    }

    #[tokio::test]
    async fn test_same_key_waits() {
        let locks = IdentityKeyLocks::new();
        let guard = locks.lock(&key("GOMC850101HDFRRR09")).await;

        let second = timeout(Duration::from_millis(50), locks.lock(&key("gomc850101hdfrrr09"))).await;
        assert!(second.is_err(), "same key must block while held");

        drop(guard);
        let third = timeout(Duration::from_millis(500), locks.lock(&key("GOMC850101HDFRRR09"))).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = IdentityKeyLocks::new();
        let _a = locks.lock(&key("GOMC850101HDFRRR09")).await;
        let b = timeout(Duration::from_millis(500), locks.lock(&key("LOHG900215MDFPRD05"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.active_keys(), 2);
    }

    #[tokio::test]
    async fn test_released_keys_are_forgotten() {
        let locks = IdentityKeyLocks::new();
        drop(locks.lock(&key("GOMC850101HDFRRR09")).await);
        assert_eq!(locks.active_keys(), 0);
    }
}
