use super::{KvStore, ReadPreference};
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Clone)]
struct StoreEntry {
    value: String,
    expiry: Instant,
}

/// Counters for every call that reached the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCallStats {
    pub reads: usize,
    pub writes: usize,
    pub deletes: usize,
}

impl StoreCallStats {
    pub fn total(&self) -> usize {
        self.reads + self.writes + self.deletes
    }
}

/// In-process store with per-key expiry.
///
/// Entries are partitioned by instance name; the read preference is accepted
/// and ignored since there is no replica. Failure switches let callers
/// exercise the error paths of anything built on top.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<DashMap<(String, String), StoreEntry>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreCallStats {
        StoreCallStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
        }
    }

    /// Current value, ignoring expired entries. Not counted as a read.
    pub fn peek(&self, instance: &str, key: &str) -> Option<String> {
        let entry = self.entries.get(&(instance.to_string(), key.to_string()))?;
        if entry.expiry > Instant::now() {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Remaining lifetime of a live entry.
    pub fn ttl(&self, instance: &str, key: &str) -> Option<Duration> {
        let entry = self.entries.get(&(instance.to_string(), key.to_string()))?;
        entry.expiry.checked_duration_since(Instant::now())
    }

    /// Expire `key` immediately, as if its TTL had elapsed.
    pub fn expire_now(&self, instance: &str, key: &str) -> bool {
        match self.entries.get_mut(&(instance.to_string(), key.to_string())) {
            Some(mut entry) => {
                entry.expiry = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Write a raw value without going through the counters.
    pub fn insert(&self, instance: &str, key: &str, value: &str, ttl: Duration) {
        self.entries.insert(
            (instance.to_string(), key.to_string()),
            StoreEntry {
                value: value.to_string(),
                expiry: Instant::now() + ttl,
            },
        );
    }

    /// Make every subsequent read fail.
    pub fn set_read_failure(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with an error.
    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write return `false` without storing anything.
    pub fn set_write_rejection(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expiry > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn multi_get(
        &self,
        instance: &str,
        _preference: ReadPreference,
        keys: &[String],
    ) -> Result<Vec<Option<String>>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store reads disabled"));
        }

        Ok(keys.iter().map(|key| self.peek(instance, key)).collect())
    }

    async fn set_with_expiry(
        &self,
        instance: &str,
        key: &str,
        ttl_seconds: u64,
        value: &str,
    ) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store writes disabled"));
        }
        if self.reject_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }

        self.insert(instance, key, value, Duration::from_secs(ttl_seconds));
        debug!(instance = %instance, key = %key, ttl = ttl_seconds, "memory key set");
        Ok(true)
    }

    async fn multi_delete(&self, instance: &str, keys: &[String]) -> Result<bool, StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store writes disabled"));
        }

        let mut removed = 0;
        for key in keys {
            if self
                .entries
                .remove(&(instance.to_string(), key.clone()))
                .is_some()
            {
                removed += 1;
            }
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_multi_get_is_position_aligned() {
        let store = MemoryKvStore::new();
        store
            .set_with_expiry("default", "b", 60, "beta")
            .await
            .unwrap();

        let values = store
            .multi_get("default", ReadPreference::Replica, &keys(&["a", "b", "c"]))
            .await
            .unwrap();
        assert_eq!(values, vec![None, Some("beta".to_string()), None]);
    }

    #[tokio::test]
    async fn test_instances_are_isolated() {
        let store = MemoryKvStore::new();
        store.set_with_expiry("ns", "k", 60, "v").await.unwrap();

        assert_eq!(store.peek("ns", "k").as_deref(), Some("v"));
        assert_eq!(store.peek("default", "k"), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        let store = MemoryKvStore::new();
        store.set_with_expiry("default", "k", 60, "v").await.unwrap();
        assert!(store.ttl("default", "k").is_some());

        assert!(store.expire_now("default", "k"));
        assert_eq!(store.peek("default", "k"), None);
        assert_eq!(store.cleanup_expired(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_call_counters_and_failures() {
        let store = MemoryKvStore::new();
        store.set_read_failure(true);
        assert!(store
            .multi_get("default", ReadPreference::Primary, &keys(&["a"]))
            .await
            .is_err());

        store.set_write_rejection(true);
        assert!(!store.set_with_expiry("default", "a", 60, "v").await.unwrap());
        assert_eq!(store.peek("default", "a"), None);

        store.set_write_rejection(false);
        assert!(store.set_with_expiry("default", "a", 60, "v").await.unwrap());
        assert!(store.multi_delete("default", &keys(&["a", "zz"])).await.unwrap());
        assert!(!store.multi_delete("default", &keys(&["a"])).await.unwrap());

        assert_eq!(
            store.stats(),
            StoreCallStats {
                reads: 1,
                writes: 2,
                deletes: 2,
            }
        );
    }
}
