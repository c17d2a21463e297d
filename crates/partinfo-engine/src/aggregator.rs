//! Per-batch aggregation across sources.
//!
//! For every query in a batch the aggregator fans out to all sources at once,
//! reconciles their answers, looks secondary-only hits up again in the primary
//! source, applies retailer enrichment, and validates the result.

use crate::common_parts::CommonParts;
use crate::merge::{apply_secondary, fold_duplicates, reconcile};
use async_trait::async_trait;
use futures::future::join_all;
use partinfo_core::{
    AttributeParser, NoAttributeParser, Part, Query, QueryResponse, QueryTarget, ResultKind, Sku,
};
use partinfo_sources::{EnricherAdapter, SourceAdapter};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Resolves a batch of queries to responses, one per query, in query order.
#[async_trait]
pub trait BatchDispatcher: Send + Sync {
    /// Resolve a batch.
    async fn dispatch(&self, queries: Vec<Query>) -> Vec<QueryResponse>;
}

/// The merge engine.
pub struct Aggregator {
    primary: Option<SourceAdapter>,
    secondaries: Vec<SourceAdapter>,
    enrichers: Vec<EnricherAdapter>,
    common_parts: CommonParts,
    parser: Arc<dyn AttributeParser>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("primary", &self.primary)
            .field("secondaries", &self.secondaries)
            .field("enrichers", &self.enrichers)
            .finish_non_exhaustive()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    /// Aggregator with no sources and an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            primary: None,
            secondaries: Vec::new(),
            enrichers: Vec::new(),
            common_parts: CommonParts::default(),
            parser: Arc::new(NoAttributeParser),
        }
    }

    /// Set the primary source.
    #[must_use]
    pub fn with_primary(mut self, adapter: SourceAdapter) -> Self {
        self.primary = Some(adapter);
        self
    }

    /// Add a secondary source. Secondaries are reconciled in the order added.
    #[must_use]
    pub fn with_secondary(mut self, adapter: SourceAdapter) -> Self {
        self.secondaries.push(adapter);
        self
    }

    /// Add a retailer enricher.
    #[must_use]
    pub fn with_enricher(mut self, adapter: EnricherAdapter) -> Self {
        self.enrichers.push(adapter);
        self
    }

    /// Set the common-parts catalog.
    #[must_use]
    pub fn with_common_parts(mut self, common_parts: CommonParts) -> Self {
        self.common_parts = common_parts;
        self
    }

    /// Set the attribute parser used on term queries.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn AttributeParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Whether a primary source is configured.
    #[must_use]
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Resolve one query.
    pub async fn resolve(&self, mut query: Query) -> QueryResponse {
        self.common_parts.annotate(&mut query, self.parser.as_ref());

        let (primary, secondaries) = futures::join!(
            self.fetch_primary(&query),
            join_all(
                self.secondaries
                    .iter()
                    .map(|adapter| fetch(adapter, &query))
            )
        );

        let reconciled = reconcile(primary, secondaries);
        let mut parts = reconciled.merged;

        let wants_backfill = match query.target {
            QueryTarget::Term(_) => true,
            QueryTarget::Mpn(_) | QueryTarget::Sku(_) => parts.is_empty(),
        };
        if wants_backfill && !reconciled.secondary_only.is_empty() {
            let enriched = self
                .enrich_secondary_only(reconciled.secondary_only, query.kind())
                .await;
            parts.extend(enriched);
        }

        self.enrich_offers(&mut parts).await;
        finish(&query, parts)
    }

    /// Primary answer for a query, expanding catalog shortcuts.
    async fn fetch_primary(&self, query: &Query) -> Vec<Part> {
        let Some(primary) = &self.primary else {
            return Vec::new();
        };

        if !query.shortcut_matches.is_empty() {
            let hits: Vec<Part> = join_all(
                query
                    .shortcut_matches
                    .iter()
                    .map(|mpn| primary.match_by_mpn(mpn)),
            )
            .await
            .into_iter()
            .flatten()
            .map(|mut part| {
                part.result_kind = ResultKind::Match;
                part
            })
            .collect();

            if !hits.is_empty() {
                return hits;
            }
            debug!(query = %query.target, "No shortcut matched, falling back to search");
        }

        fetch(primary, query).await
    }

    /// Look secondary-only parts up in the primary source and reconcile any
    /// hits. Misses are kept as they are.
    async fn enrich_secondary_only(&self, parts: Vec<Part>, kind: ResultKind) -> Vec<Part> {
        let lookups = parts.into_iter().map(|secondary| async move {
            let hit = match &self.primary {
                Some(primary) => primary.match_by_mpn(&secondary.mpn).await,
                None => None,
            };
            let mut part = match hit {
                Some(mut base) => {
                    apply_secondary(&mut base, &secondary);
                    base
                }
                None => secondary,
            };
            part.result_kind = kind;
            part
        });
        join_all(lookups).await
    }

    /// Apply retailer enrichment to every offer with a matching enricher.
    async fn enrich_offers(&self, parts: &mut [Part]) {
        if self.enrichers.is_empty() {
            return;
        }
        let offers = parts.iter_mut().flat_map(|part| part.offers.iter_mut());
        join_all(offers.filter_map(|offer| {
            self.enrichers
                .iter()
                .find(|enricher| enricher.serves(&offer.sku.vendor))
                .map(|enricher| enricher.enrich_offer(offer))
        }))
        .await;
    }
}

#[async_trait]
impl BatchDispatcher for Aggregator {
    async fn dispatch(&self, queries: Vec<Query>) -> Vec<QueryResponse> {
        let started = Instant::now();
        let count = queries.len();
        let responses = join_all(queries.into_iter().map(|query| self.resolve(query))).await;
        info!(
            queries = count,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Batch resolved"
        );
        responses
    }
}

/// One adapter's answer for a query.
async fn fetch(adapter: &SourceAdapter, query: &Query) -> Vec<Part> {
    match &query.target {
        QueryTarget::Mpn(mpn) => adapter.match_by_mpn(mpn).await.into_iter().collect(),
        QueryTarget::Sku(sku) => adapter.match_by_sku(sku).await.into_iter().collect(),
        QueryTarget::Term(term) => adapter.search(term, query.attributes.as_ref()).await,
    }
}

/// Validate and package the merged parts for a query.
fn finish(query: &Query, parts: Vec<Part>) -> QueryResponse {
    match &query.target {
        QueryTarget::Term(_) => QueryResponse::Search(
            fold_duplicates(parts)
                .into_iter()
                .filter(|part| !part.mpn.part.trim().is_empty())
                .collect(),
        ),
        QueryTarget::Mpn(_) => QueryResponse::Match(parts.into_iter().next().map(as_match)),
        QueryTarget::Sku(sku) => {
            let sku = Sku::new(sku.vendor.clone(), sku.part.clone());
            let part = parts.into_iter().next().filter(|part| {
                let listed = part.offer_for(&sku).is_some();
                if !listed {
                    debug!(%sku, mpn = %part.mpn, "Discarding Sku match without that Sku");
                }
                listed
            });
            QueryResponse::Match(part.map(as_match))
        }
    }
}

fn as_match(mut part: Part) -> Part {
    part.result_kind = ResultKind::Match;
    part
}
