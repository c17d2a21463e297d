//! The provider trait and its request and capability types.

use crate::error::Result;
use crate::filter::AttributeFilter;
use async_trait::async_trait;
use partinfo_core::{Mpn, Part, Sku};
use serde::{Deserialize, Serialize};

/// A part data provider.
///
/// Implementations only translate requests into provider calls and decode the
/// answers. Caching, rate limiting, and error absorption live in
/// [`SourceAdapter`](crate::SourceAdapter).
#[async_trait]
pub trait PartDataSource: Send + Sync {
    /// Free-text and/or attribute-filtered search.
    ///
    /// # Errors
    /// Returns error on transport failure or an undecodable answer.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Part>>;

    /// Exact lookup by manufacturer part number.
    async fn match_mpn(&self, mpn: &Mpn) -> Result<Option<Part>>;

    /// Exact lookup by vendor listing.
    async fn match_sku(&self, sku: &Sku) -> Result<Option<Part>>;

    /// What this provider can do.
    fn capabilities(&self) -> SourceCapabilities;

    /// Unique identifier, also used as the cache namespace.
    fn source_id(&self) -> &str;
}

/// Position of a source in the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    /// The aggregator whose records are the merge base
    Primary,
    /// A source whose offers override the primary's
    Secondary,
}

/// Capabilities of a part data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCapabilities {
    /// Merge role
    pub role: SourceRole,

    /// Whether searches accept structured attribute filters
    pub supports_attribute_filters: bool,

    /// Vendors whose Skus this source can look up; `None` means any
    pub sku_vendors: Option<Vec<String>>,
}

impl SourceCapabilities {
    /// Whether a Sku lookup for `vendor` is worth a call.
    #[must_use]
    pub fn accepts_sku_vendor(&self, vendor: &str) -> bool {
        self.sku_vendors
            .as_ref()
            .map_or(true, |vendors| vendors.iter().any(|v| v == vendor))
    }
}

/// A search as sent to a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text term; may be empty when filters carry the search
    pub term: String,

    /// Attribute filters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<AttributeFilter>,
}

impl SearchRequest {
    /// Plain term search.
    #[must_use]
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            filters: Vec::new(),
        }
    }

    /// Add attribute filters.
    #[must_use]
    pub fn with_filters(mut self, filters: Vec<AttributeFilter>) -> Self {
        self.filters = filters;
        self
    }

    /// Whether the request would search for nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.term.trim().is_empty() && self.filters.is_empty()
    }

    /// Stable cache key: the lower-cased, whitespace-collapsed term plus the
    /// filter set.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let term = self
            .term
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let filters = self
            .filters
            .iter()
            .map(AttributeFilter::cache_key)
            .collect::<Vec<_>>()
            .join("&");
        format!("{term}|{filters}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterField;

    #[test]
    fn test_sku_vendor_gate() {
        let any = SourceCapabilities {
            role: SourceRole::Primary,
            supports_attribute_filters: true,
            sku_vendors: None,
        };
        assert!(any.accepts_sku_vendor("Mouser"));

        let lcsc_only = SourceCapabilities {
            role: SourceRole::Secondary,
            supports_attribute_filters: false,
            sku_vendors: Some(vec!["LCSC".to_string()]),
        };
        assert!(lcsc_only.accepts_sku_vendor("LCSC"));
        assert!(!lcsc_only.accepts_sku_vendor("Farnell"));
    }

    #[test]
    fn test_cache_key_normalizes_term() {
        let a = SearchRequest::new("  SPI   Flash SOIC ");
        let b = SearchRequest::new("spi flash soic");
        assert_eq!(a.cache_key(), b.cache_key());

        let filtered = SearchRequest::new("spi flash soic").with_filters(vec![
            AttributeFilter::new(FilterField::CasePackage, vec!["SOIC".to_string()]),
        ]);
        assert_ne!(a.cache_key(), filtered.cache_key());
    }

    #[test]
    fn test_empty_request() {
        assert!(SearchRequest::new("   ").is_empty());
        assert!(!SearchRequest::new("").with_filters(vec![AttributeFilter::new(
            FilterField::CasePackage,
            vec!["0805".to_string()]
        )])
        .is_empty());
    }
}
