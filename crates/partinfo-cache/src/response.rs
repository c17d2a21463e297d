//! Typed, namespaced access to a [`CacheStore`].
//!
//! Values are stored as JSON. Callers that must never fail on a cache problem
//! use [`ResponseCache::get`] and [`ResponseCache::put`], which log and treat
//! errors as misses.

use crate::error::Result;
use crate::store::{CacheStore, MemoryCacheStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// JSON cache over a shared store, with a key prefix.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    prefix: String,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Cache backed by a fresh [`MemoryCacheStore`].
    #[must_use]
    pub fn in_memory(prefix: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), prefix)
    }

    /// A view over the same store with `namespace` appended to the prefix.
    #[must_use]
    pub fn namespaced(&self, namespace: &str) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: format!("{}{namespace}:", self.prefix),
        }
    }

    /// Key prefix for this view.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Read and decode a value.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(&self.full_key(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and write a value.
    pub async fn try_put<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set_with_ttl(&self.full_key(key), raw, ttl).await
    }

    /// Read a value; any failure is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(Some(value)) => {
                debug!(prefix = %self.prefix, key, "Cache hit");
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(prefix = %self.prefix, key, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Write a value; failures are logged and dropped.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = self.try_put(key, value, ttl).await {
            warn!(prefix = %self.prefix, key, error = %e, "Cache write failed");
        }
    }

    /// Raw stored JSON, without decoding.
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.store.get(&self.full_key(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partinfo_core::{Mpn, Offer, Part, QueryResponse, ResultKind, Sku, Spec};

    fn sample_part() -> Part {
        let mut part = Part::new(Mpn::new("Yageo", "RC0805FR-0710KL"), ResultKind::Match)
            .with_description("RES SMD 10K OHM 1% 1/8W 0805")
            .with_offer(
                Offer::new(Sku::new("Digikey", "311-10.0KCRCT-ND"))
                    .with_price("USD", 1, 0.5)
                    .with_price("USD", 10, 0.125)
                    .with_stock(1_204_000),
            );
        part.set_specs(vec![Spec::new("resistance", "Resistance", "10 kΩ")]);
        part
    }

    #[tokio::test]
    async fn test_round_trip_is_lossless() {
        let cache = ResponseCache::in_memory("partinfo:");
        let response = QueryResponse::Match(Some(sample_part()));

        cache
            .try_put("abc", &response, Duration::from_secs(60))
            .await
            .expect("put");
        let restored: QueryResponse = cache.try_get("abc").await.expect("get").expect("hit");
        assert_eq!(restored, response);

        let raw = cache.get_raw("abc").await.expect("raw").expect("hit");
        assert_eq!(raw, serde_json::to_string(&restored).expect("encode"));
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let cache = ResponseCache::in_memory("partinfo:");
        let octopart = cache.namespaced("octopart");
        let lcsc = cache.namespaced("lcsc");
        assert_eq!(octopart.prefix(), "partinfo:octopart:");

        octopart.put("k", &1_u32, Duration::from_secs(60)).await;
        lcsc.put("k", &2_u32, Duration::from_secs(60)).await;

        assert_eq!(octopart.get::<u32>("k").await, Some(1));
        assert_eq!(lcsc.get::<u32>("k").await, Some(2));
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn test_undecodable_value_reads_as_miss() {
        let cache = ResponseCache::in_memory("p:");
        cache.put("k", "not a number", Duration::from_secs(60)).await;

        assert!(cache.try_get::<u32>("k").await.is_err());
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_expire_after_ttl() {
        let cache = ResponseCache::in_memory("p:");
        cache.put("k", &sample_part(), Duration::from_secs(30)).await;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get::<Part>("k").await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get::<Part>("k").await.is_none());
    }
}
