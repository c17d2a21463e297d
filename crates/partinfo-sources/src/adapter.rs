//! Cached, rate-limited, infallible access to one [`PartDataSource`].

use crate::error::{Result, SourceError};
use crate::filter::build_filters;
use crate::rate_limit::{RateLimit, RateLimiter};
use crate::source::{PartDataSource, SearchRequest, SourceCapabilities};
use partinfo_cache::ResponseCache;
use partinfo_core::{normalize_identity, ComponentAttributes, Mpn, Part, Sku, SourceConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache-then-limiter-then-call discipline shared by source and enricher
/// adapters.
#[derive(Debug)]
pub(crate) struct CallGate {
    provider: String,
    limiter: RateLimiter,
    cache: ResponseCache,
    ttl: Duration,
}

impl CallGate {
    pub(crate) fn new(provider: &str, limit: RateLimit, cache: &ResponseCache, ttl: Duration) -> Self {
        Self {
            provider: provider.to_string(),
            limiter: RateLimiter::new(limit),
            cache: cache.namespaced(provider),
            ttl,
        }
    }

    /// Serve `key` from the cache, or make the call under a permit and cache
    /// the answer. Failed calls are handed to `recover`; whatever it returns is
    /// cached too.
    pub(crate) async fn call<T, F, Fut>(
        &self,
        key: &str,
        call: F,
        recover: impl FnOnce(SourceError) -> Option<T>,
    ) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.cache.get::<T>(key).await {
            return Some(hit);
        }

        let outcome = self.limiter.run(call()).await.and_then(|result| result);
        let value = match outcome {
            Ok(value) => value,
            Err(e) => recover(e)?,
        };
        self.cache.put(key, &value, self.ttl).await;
        Some(value)
    }

    pub(crate) fn provider(&self) -> &str {
        &self.provider
    }
}

/// One data source behind a cache and a rate limiter.
///
/// Every operation is infallible: provider errors are logged and read as "no
/// data", and are not cached.
pub struct SourceAdapter {
    source: Arc<dyn PartDataSource>,
    capabilities: SourceCapabilities,
    gate: CallGate,
}

impl std::fmt::Debug for SourceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceAdapter")
            .field("source", &self.gate.provider())
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl SourceAdapter {
    /// Wrap a source with an explicit quota and TTL.
    #[must_use]
    pub fn new(
        source: Arc<dyn PartDataSource>,
        limit: RateLimit,
        cache: &ResponseCache,
        ttl: Duration,
    ) -> Self {
        let capabilities = source.capabilities();
        let gate = CallGate::new(source.source_id(), limit, cache, ttl);
        Self {
            source,
            capabilities,
            gate,
        }
    }

    /// Wrap a source using its configured quota and TTL.
    #[must_use]
    pub fn from_config(
        source: Arc<dyn PartDataSource>,
        config: &SourceConfig,
        cache: &ResponseCache,
    ) -> Self {
        Self::new(source, RateLimit::from_config(config), cache, config.cache_ttl())
    }

    /// Source identifier.
    #[must_use]
    pub fn source_id(&self) -> &str {
        self.gate.provider()
    }

    /// Source capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &SourceCapabilities {
        &self.capabilities
    }

    /// Search by term and optional parsed attributes.
    ///
    /// With filters the search runs a ladder, stopping at the first non-empty
    /// answer: filters and term, then filters alone, then the bare term.
    pub async fn search(&self, term: &str, attributes: Option<&ComponentAttributes>) -> Vec<Part> {
        let term = term.trim();
        let filters = match attributes {
            Some(attributes) if self.capabilities.supports_attribute_filters => {
                build_filters(attributes)
            }
            _ => Vec::new(),
        };

        if filters.is_empty() {
            if term.is_empty() {
                return Vec::new();
            }
            return self.run_search(SearchRequest::new(term)).await;
        }

        let parts = self
            .run_search(SearchRequest::new(term).with_filters(filters.clone()))
            .await;
        if !parts.is_empty() || term.is_empty() {
            return parts;
        }

        debug!(source = self.source_id(), term, "Filtered search empty, retrying without term");
        let parts = self
            .run_search(SearchRequest::new("").with_filters(filters))
            .await;
        if !parts.is_empty() {
            return parts;
        }

        debug!(source = self.source_id(), term, "Filter-only search empty, retrying unfiltered");
        self.run_search(SearchRequest::new(term)).await
    }

    async fn run_search(&self, request: SearchRequest) -> Vec<Part> {
        let key = format!("search:{}", request.cache_key());
        self.gate
            .call(&key, || self.source.search(&request), |e| self.absorb(&e, "search"))
            .await
            .unwrap_or_default()
    }

    /// Exact lookup by manufacturer part number.
    pub async fn match_by_mpn(&self, mpn: &Mpn) -> Option<Part> {
        let (manufacturer, part) = mpn.normalized_key();
        let key = format!("mpn:{manufacturer}/{part}");
        self.gate
            .call(&key, || self.source.match_mpn(mpn), |e| self.absorb(&e, "match_mpn"))
            .await
            .flatten()
    }

    /// Exact lookup by vendor listing. Vendors the source cannot look up are
    /// answered with `None` without a call.
    pub async fn match_by_sku(&self, sku: &Sku) -> Option<Part> {
        if !self.capabilities.accepts_sku_vendor(&sku.vendor) {
            return None;
        }
        let key = format!(
            "sku:{}/{}",
            normalize_identity(&sku.vendor),
            sku.part.to_lowercase()
        );
        self.gate
            .call(&key, || self.source.match_sku(sku), |e| self.absorb(&e, "match_sku"))
            .await
            .flatten()
    }

    fn absorb<T>(&self, error: &SourceError, operation: &str) -> Option<T> {
        match error {
            SourceError::Discontinued { .. } => {
                debug!(source = self.source_id(), operation, error = %error, "Source reports discontinued");
            }
            _ => {
                warn!(source = self.source_id(), operation, error = %error, "Source call failed");
            }
        }
        None
    }
}
