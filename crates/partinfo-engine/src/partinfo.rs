//! The query front end.
//!
//! [`PartInfo`] turns the three inbound calls (`part`, `match_parts`,
//! `search`) into [`Query`] values and awaits them through the coalescer.
//! [`PartInfoBuilder`] wires sources, enrichers, caches, and the scheduler
//! together.

use crate::aggregator::Aggregator;
use crate::coalescer::{Coalescer, CoalescerHandle};
use crate::common_parts::CommonParts;
use crate::error::{EngineError, Result};
use crate::shaper::ResultShaper;
use futures::future::join_all;
use partinfo_cache::{CacheStore, MemoryCacheStore, ResponseCache};
use partinfo_core::{
    AppConfig, AttributeParser, Mpn, NoAttributeParser, Part, Query, QueryResponse, QueryTarget,
    RequestedFields, Sku, SourceConfig,
};
use partinfo_sources::{
    EnricherAdapter, Element14Enricher, LcscSource, OctopartSource, OfferEnricher, PartDataSource,
    SourceAdapter, SourceRole,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Builder for [`PartInfo`].
pub struct PartInfoBuilder {
    config: AppConfig,
    store: Option<Arc<dyn CacheStore>>,
    primary: Option<(Arc<dyn PartDataSource>, SourceConfig)>,
    secondaries: Vec<(Arc<dyn PartDataSource>, SourceConfig)>,
    enrichers: Vec<(Arc<dyn OfferEnricher>, SourceConfig)>,
    parser: Arc<dyn AttributeParser>,
    common_parts: Option<CommonParts>,
}

impl std::fmt::Debug for PartInfoBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartInfoBuilder")
            .field("primary", &self.primary.as_ref().map(|(s, _)| s.source_id()))
            .field(
                "secondaries",
                &self
                    .secondaries
                    .iter()
                    .map(|(s, _)| s.source_id())
                    .collect::<Vec<_>>(),
            )
            .field(
                "enrichers",
                &self
                    .enrichers
                    .iter()
                    .map(|(e, _)| e.enricher_id())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl PartInfoBuilder {
    /// Start from a configuration with no sources.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: None,
            primary: None,
            secondaries: Vec::new(),
            enrichers: Vec::new(),
            parser: Arc::new(NoAttributeParser),
            common_parts: None,
        }
    }

    /// Add a data source. Its declared role decides whether it becomes the
    /// primary or a secondary; a later primary replaces an earlier one.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn PartDataSource>, config: SourceConfig) -> Self {
        match source.capabilities().role {
            SourceRole::Primary => {
                if let Some((previous, _)) = &self.primary {
                    warn!(
                        replaced = previous.source_id(),
                        by = source.source_id(),
                        "Replacing primary source"
                    );
                }
                self.primary = Some((source, config));
            }
            SourceRole::Secondary => self.secondaries.push((source, config)),
        }
        self
    }

    /// Add a retailer enricher.
    #[must_use]
    pub fn with_enricher(mut self, enricher: Arc<dyn OfferEnricher>, config: SourceConfig) -> Self {
        self.enrichers.push((enricher, config));
        self
    }

    /// Set the attribute parser used on term queries.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn AttributeParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Use a shared cache store instead of a private in-memory one.
    #[must_use]
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a specific common-parts catalog instead of the embedded one.
    #[must_use]
    pub fn with_common_parts(mut self, common_parts: CommonParts) -> Self {
        self.common_parts = Some(common_parts);
        self
    }

    /// Validate the configuration and start the scheduler.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<PartInfo> {
        self.config.validate()?;

        let common_parts = match self.common_parts {
            Some(common_parts) => common_parts,
            None => CommonParts::embedded()?,
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCacheStore::new()) as Arc<dyn CacheStore>);
        let cache = ResponseCache::new(store, self.config.cache.key_prefix.clone());
        let source_cache = cache.namespaced("source");

        let mut aggregator = Aggregator::new()
            .with_common_parts(common_parts)
            .with_parser(self.parser);
        if let Some((source, config)) = self.primary {
            aggregator =
                aggregator.with_primary(SourceAdapter::from_config(source, &config, &source_cache));
        }
        for (source, config) in self.secondaries {
            aggregator = aggregator
                .with_secondary(SourceAdapter::from_config(source, &config, &source_cache));
        }
        for (enricher, config) in self.enrichers {
            aggregator = aggregator
                .with_enricher(EnricherAdapter::from_config(enricher, &config, &source_cache));
        }

        if !aggregator.has_primary() {
            warn!("No primary source configured, results come from secondaries only");
        }
        info!(?aggregator, "Starting part lookup engine");

        let handle = Coalescer::spawn(
            Arc::new(aggregator),
            cache.namespaced("merged"),
            self.config.cache.merged_ttl(),
            ResultShaper::from_config(&self.config.retailers),
            self.config.coalescer.clone(),
        );

        Ok(PartInfo { handle })
    }
}

/// Entry point for part lookups.
#[derive(Debug, Clone)]
pub struct PartInfo {
    handle: CoalescerHandle,
}

impl PartInfo {
    /// Builder starting from `config`.
    #[must_use]
    pub fn builder(config: AppConfig) -> PartInfoBuilder {
        PartInfoBuilder::new(config)
    }

    /// Engine with the providers enabled in `config`.
    ///
    /// Providers that need an API key are skipped with a warning when none is
    /// set. Must be called from within a Tokio runtime.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut builder = PartInfoBuilder::new(config.clone());

        if config.octopart.enabled && config.octopart.api_key.is_some() {
            let source = OctopartSource::new(&config.octopart)?;
            builder = builder.with_source(Arc::new(source), config.octopart.clone());
        } else if config.octopart.enabled {
            warn!("Octopart enabled but no API key set, skipping");
        }

        if config.lcsc.enabled {
            let source = LcscSource::new(&config.lcsc)?;
            builder = builder.with_source(Arc::new(source), config.lcsc.clone());
        }

        if config.element14.enabled && config.element14.api_key.is_some() {
            let enricher = Element14Enricher::new(&config.element14)?;
            builder = builder.with_enricher(Arc::new(enricher), config.element14.clone());
        } else if config.element14.enabled {
            warn!("element14 enabled but no API key set, skipping");
        }

        builder.build()
    }

    /// Handle for submitting raw queries.
    #[must_use]
    pub fn handle(&self) -> &CoalescerHandle {
        &self.handle
    }

    /// Submit a prepared query.
    pub async fn submit(&self, query: Query) -> Result<QueryResponse> {
        self.handle.submit(query).await
    }

    /// Look up one part by Mpn or Sku. The Mpn wins when both are given.
    ///
    /// # Errors
    /// Returns [`partinfo_core::PartinfoError::MissingIdentity`] (wrapped)
    /// when neither is given.
    pub async fn part(
        &self,
        mpn: Option<Mpn>,
        sku: Option<Sku>,
        fields: RequestedFields,
    ) -> Result<Option<Part>> {
        let target = QueryTarget::from_identity(mpn, sku)?;
        let response = self.submit(Query::new(target).with_fields(fields)).await?;
        Ok(match response {
            QueryResponse::Match(part) => part,
            QueryResponse::Search(parts) => parts.into_iter().next(),
        })
    }

    /// Look up several parts at once. Answers come back in input order.
    ///
    /// # Errors
    /// Fails if any entry has neither an Mpn nor a Sku.
    pub async fn match_parts(
        &self,
        identities: Vec<(Option<Mpn>, Option<Sku>)>,
        fields: RequestedFields,
    ) -> Result<Vec<Option<Part>>> {
        let targets = identities
            .into_iter()
            .map(|(mpn, sku)| QueryTarget::from_identity(mpn, sku))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        join_all(targets.into_iter().map(|target| {
            let fields = fields.clone();
            async move {
                let response = self.submit(Query::new(target).with_fields(fields)).await?;
                Ok::<_, EngineError>(response.parts().first().cloned())
            }
        }))
        .await
        .into_iter()
        .collect()
    }

    /// Free-text search. Blank terms return no parts without a lookup.
    pub async fn search(&self, term: &str, fields: RequestedFields) -> Result<Vec<Part>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let response = self.submit(Query::term(term).with_fields(fields)).await?;
        Ok(match response {
            QueryResponse::Search(parts) => parts,
            QueryResponse::Match(part) => part.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partinfo_core::PartinfoError;

    #[tokio::test]
    async fn test_part_requires_identity() {
        let engine = PartInfo::builder(AppConfig::default())
            .build()
            .expect("engine");

        let err = engine
            .part(None, None, RequestedFields::default())
            .await
            .expect_err("missing identity");
        assert!(matches!(
            err,
            EngineError::Core(PartinfoError::MissingIdentity)
        ));
    }

    #[tokio::test]
    async fn test_blank_search_is_empty() {
        let engine = PartInfo::builder(AppConfig::default())
            .build()
            .expect("engine");
        let parts = engine
            .search("   ", RequestedFields::default())
            .await
            .expect("search");
        assert!(parts.is_empty());
    }

    #[tokio::test]
    async fn test_from_config_skips_keyless_providers() {
        let mut config = AppConfig::default();
        config.lcsc.enabled = false;
        let engine = PartInfo::from_config(&config).expect("engine");

        let part = engine
            .part(
                Some(Mpn::new("Texas Instruments", "NE555P")),
                None,
                RequestedFields::default(),
            )
            .await
            .expect("lookup");
        assert!(part.is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.coalescer.max_batch_size = 0;
        let err = PartInfoBuilder::new(config).build().expect_err("invalid");
        assert!(matches!(err, EngineError::Config(_)));
    }
}
