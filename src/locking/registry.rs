use crate::time::{system_time, SharedTimeProvider};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifier of a lockable resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum LockKey {
    /// Scheduler job, keyed by its unique name
    Job(String),
    /// Tenant-scoped resource, keyed by a stable 64-bit hash
    Resource(i64),
}

impl LockKey {
    pub fn job(name: impl Into<String>) -> Self {
        Self::Job(name.into())
    }

    /// Numeric key for a tenant-owned resource.
    ///
    /// FNV-1a over `tenant_id:resource_id`; stable across processes and
    /// releases so the same value can be used as a database advisory key.
    pub fn resource(tenant_id: &str, resource_id: &str) -> Self {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut hash = OFFSET_BASIS;
        for byte in tenant_id
            .bytes()
            .chain(std::iter::once(b':'))
            .chain(resource_id.bytes())
        {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
        Self::Resource(hash as i64)
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job(name) => write!(f, "job:{name}"),
            Self::Resource(key) => write!(f, "resource:{key}"),
        }
    }
}

/// The key is held by another owner; skip this cycle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Lock busy: {key}")]
pub struct LockBusy {
    pub key: LockKey,
}

#[derive(Debug, Clone)]
struct LockEntry {
    token_id: u64,
    acquired_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    held: DashMap<LockKey, LockEntry>,
    next_token: AtomicU64,
}

/// Shared registry of held locks. Cloning yields another handle to the same map.
#[derive(Debug, Clone)]
pub struct LockRegistry {
    inner: Arc<RegistryInner>,
    time: SharedTimeProvider,
}

/// Exclusive ownership of a key; released on drop
#[derive(Debug)]
pub struct LockToken {
    key: LockKey,
    token_id: u64,
    registry: Arc<RegistryInner>,
}

/// Read-only view of a held lock for admin dashboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub key: LockKey,
    pub acquired_at: DateTime<Utc>,
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::with_time(system_time())
    }
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry stamping acquisitions with `time`
    pub fn with_time(time: SharedTimeProvider) -> Self {
        Self {
            inner: Arc::new(RegistryInner::default()),
            time,
        }
    }

    /// Try to take exclusive ownership of `key` without waiting
    pub fn try_acquire(&self, key: LockKey) -> Result<LockToken, LockBusy> {
        match self.inner.held.entry(key.clone()) {
            Entry::Occupied(_) => {
                debug!(key = %key, "Lock busy");
                Err(LockBusy { key })
            }
            Entry::Vacant(slot) => {
                let token_id = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
                slot.insert(LockEntry {
                    token_id,
                    acquired_at: self.time.utc_now(),
                });
                debug!(key = %key, token_id, "Lock acquired");
                Ok(LockToken {
                    key,
                    token_id,
                    registry: Arc::clone(&self.inner),
                })
            }
        }
    }

    /// Release a token explicitly; equivalent to dropping it
    pub fn release(&self, token: LockToken) {
        drop(token);
    }

    /// Unconditionally free `key`, whoever holds it.
    ///
    /// Returns whether a holder was removed. Freeing an unheld key is a no-op.
    pub fn force_release(&self, key: &LockKey) -> bool {
        let removed = self.inner.held.remove(key).is_some();
        if removed {
            warn!(key = %key, "Lock force-released");
        }
        removed
    }

    pub fn is_held(&self, key: &LockKey) -> bool {
        self.inner.held.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.held.is_empty()
    }

    pub fn snapshot(&self) -> Vec<LockSnapshot> {
        self.inner
            .held
            .iter()
            .map(|entry| LockSnapshot {
                key: entry.key().clone(),
                acquired_at: entry.value().acquired_at,
            })
            .collect()
    }
}

impl LockToken {
    pub fn key(&self) -> &LockKey {
        &self.key
    }
}

impl Drop for LockToken {
    fn drop(&mut self) {
        // Only remove the entry this token created; a force-release followed by
        // a new acquisition must not be undone by the stale token.
        let token_id = self.token_id;
        if self
            .registry
            .held
            .remove_if(&self.key, |_, entry| entry.token_id == token_id)
            .is_some()
        {
            debug!(key = %self.key, token_id, "Lock released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{ManualTimeProvider, TimeProvider};

    #[test]
    fn test_second_acquire_is_busy() {
        let registry = LockRegistry::new();
        let token = registry.try_acquire(LockKey::job("sla_sweep")).unwrap();

        let busy = registry.try_acquire(LockKey::job("sla_sweep")).unwrap_err();
        assert_eq!(busy.key, LockKey::job("sla_sweep"));
        assert_eq!(registry.len(), 1);

        registry.release(token);
        assert!(registry.is_empty());
        assert!(registry.try_acquire(LockKey::job("sla_sweep")).is_ok());
    }

    #[test]
    fn test_distinct_keys_do_not_contend() {
        let registry = LockRegistry::new();
        let _a = registry.try_acquire(LockKey::job("a")).unwrap();
        let _b = registry.try_acquire(LockKey::job("b")).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_drop_releases() {
        let registry = LockRegistry::new();
        {
            let _token = registry.try_acquire(LockKey::job("x")).unwrap();
            assert!(registry.is_held(&LockKey::job("x")));
        }
        assert!(!registry.is_held(&LockKey::job("x")));
    }

    #[test]
    fn test_force_release_of_unheld_key_is_noop() {
        let registry = LockRegistry::new();
        assert!(!registry.force_release(&LockKey::Resource(42)));
    }

    #[test]
    fn test_stale_token_does_not_release_new_holder() {
        let registry = LockRegistry::new();
        let key = LockKey::resource("tenant-1", "job-9");

        let stale = registry.try_acquire(key.clone()).unwrap();
        assert!(registry.force_release(&key));

        let fresh = registry.try_acquire(key.clone()).unwrap();
        drop(stale);

        assert!(registry.is_held(&key));
        drop(fresh);
        assert!(!registry.is_held(&key));
    }

    #[test]
    fn test_snapshot_uses_injected_clock() {
        let clock = ManualTimeProvider::starting_now();
        let registry = LockRegistry::with_time(Arc::new(clock.clone()));
        clock.advance(chrono::Duration::hours(3));

        let _token = registry.try_acquire(LockKey::job("sla_sweep")).unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].acquired_at, clock.utc_now());
    }

    #[test]
    fn test_resource_key_is_stable_and_scoped() {
        let a = LockKey::resource("tenant-1", "item-1");
        let b = LockKey::resource("tenant-1", "item-1");
        let c = LockKey::resource("tenant-2", "item-1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_concurrent_acquire_has_single_winner() {
        let registry = LockRegistry::new();
        let winners: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = registry.clone();
                    scope.spawn(move || registry.try_acquire(LockKey::job("contended")).ok())
                })
                .collect();
            let tokens: Vec<_> = handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .collect();
            tokens.len()
        });
        assert_eq!(winners, 1);
    }
}
