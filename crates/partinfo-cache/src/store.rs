//! Key-value stores with per-entry TTL.
//!
//! A store only promises single-key atomicity: concurrent writers to the same
//! key race, and the last write wins.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Backing store for cached responses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a live value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process store. Expired entries read as misses and are evicted lazily.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, live or expired.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every expired entry.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryCacheStore::new();
        store
            .set_with_ttl("k", "v".to_string(), Duration::from_secs(60))
            .await
            .expect("set");

        assert_eq!(store.get("k").await.expect("get"), Some("v".to_string()));
        assert_eq!(store.get("missing").await.expect("get"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryCacheStore::new();
        store
            .set_with_ttl("k", "v".to_string(), Duration::from_secs(10))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("k").await.expect("get").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.expect("get").is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_refreshes_ttl() {
        let store = MemoryCacheStore::new();
        store
            .set_with_ttl("k", "old".to_string(), Duration::from_secs(10))
            .await
            .expect("set");
        tokio::time::advance(Duration::from_secs(8)).await;
        store
            .set_with_ttl("k", "new".to_string(), Duration::from_secs(10))
            .await
            .expect("set");
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(store.get("k").await.expect("get"), Some("new".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryCacheStore::new();
        store
            .set_with_ttl("short", "a".to_string(), Duration::from_secs(1))
            .await
            .expect("set");
        store
            .set_with_ttl("long", "b".to_string(), Duration::from_secs(100))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }
}
