//! Retailer-direct offer enrichment.

use crate::adapter::CallGate;
use crate::error::{Result, SourceError};
use crate::rate_limit::RateLimit;
use async_trait::async_trait;
use partinfo_cache::ResponseCache;
use partinfo_core::{Offer, Sku, SourceConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retailer-reported details to overlay on an offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferPatch {
    /// Country the stock ships from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_location: Option<String>,
    /// Discontinuation marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_longer_stocked: Option<bool>,
}

impl OfferPatch {
    /// Patch marking a listing as discontinued.
    #[must_use]
    pub fn discontinued() -> Self {
        Self {
            stock_location: None,
            no_longer_stocked: Some(true),
        }
    }

    /// Patch setting the stock location.
    #[must_use]
    pub fn located(location: impl Into<String>) -> Self {
        Self {
            stock_location: Some(location.into()),
            no_longer_stocked: None,
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stock_location.is_none() && self.no_longer_stocked.is_none()
    }

    /// Overlay the patch; absent fields leave the offer untouched.
    pub fn apply_to(&self, offer: &mut Offer) {
        if let Some(location) = &self.stock_location {
            offer.stock_location = Some(location.clone());
        }
        if let Some(flag) = self.no_longer_stocked {
            offer.no_longer_stocked = Some(flag);
        }
    }
}

/// A retailer API that can add detail to that retailer's offers.
#[async_trait]
pub trait OfferEnricher: Send + Sync {
    /// Look up one listing.
    ///
    /// # Errors
    /// Returns [`SourceError::Discontinued`] when the retailer reports the
    /// listing as discontinued, or any transport or decoding error.
    async fn enrich(&self, sku: &Sku) -> Result<OfferPatch>;

    /// Vendors this enricher serves.
    fn vendors(&self) -> Vec<String>;

    /// Unique identifier, also used as the cache namespace.
    fn enricher_id(&self) -> &str;
}

/// An [`OfferEnricher`] behind a cache and a rate limiter.
pub struct EnricherAdapter {
    enricher: Arc<dyn OfferEnricher>,
    vendors: Vec<String>,
    gate: CallGate,
}

impl std::fmt::Debug for EnricherAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnricherAdapter")
            .field("enricher", &self.gate.provider())
            .field("vendors", &self.vendors)
            .finish_non_exhaustive()
    }
}

impl EnricherAdapter {
    /// Wrap an enricher with an explicit quota and TTL.
    #[must_use]
    pub fn new(
        enricher: Arc<dyn OfferEnricher>,
        limit: RateLimit,
        cache: &ResponseCache,
        ttl: Duration,
    ) -> Self {
        let vendors = enricher.vendors();
        let gate = CallGate::new(enricher.enricher_id(), limit, cache, ttl);
        Self {
            enricher,
            vendors,
            gate,
        }
    }

    /// Wrap an enricher using its configured quota and TTL.
    #[must_use]
    pub fn from_config(
        enricher: Arc<dyn OfferEnricher>,
        config: &SourceConfig,
        cache: &ResponseCache,
    ) -> Self {
        Self::new(enricher, RateLimit::from_config(config), cache, config.cache_ttl())
    }

    /// Whether this adapter handles offers from `vendor`.
    #[must_use]
    pub fn serves(&self, vendor: &str) -> bool {
        self.vendors.iter().any(|v| v == vendor)
    }

    /// Patch for a listing, or `None` when the lookup failed.
    pub async fn patch_for(&self, sku: &Sku) -> Option<OfferPatch> {
        let key = format!("{}/{}", sku.vendor, sku.part);
        self.gate
            .call(
                &key,
                || self.enricher.enrich(sku),
                |e| match e {
                    SourceError::Discontinued { .. } => {
                        debug!(enricher = self.gate.provider(), %sku, "Listing discontinued");
                        Some(OfferPatch::discontinued())
                    }
                    e => {
                        warn!(enricher = self.gate.provider(), %sku, error = %e, "Enrichment failed");
                        None
                    }
                },
            )
            .await
    }

    /// Enrich an offer in place. Offers from other vendors, and failed
    /// lookups, leave it unchanged.
    pub async fn enrich_offer(&self, offer: &mut Offer) {
        if !self.serves(&offer.sku.vendor) {
            return;
        }
        if let Some(patch) = self.patch_for(&offer.sku).await {
            patch.apply_to(offer);
        }
    }
}
