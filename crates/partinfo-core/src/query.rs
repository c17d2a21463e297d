//! Queries, requested-field projections, fingerprints, and responses.

use crate::attributes::ComponentAttributes;
use crate::error::{PartinfoError, Result};
use crate::types::{Mpn, Part, ResultKind, Sku};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// What a query asks about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTarget {
    /// Exact lookup by manufacturer part number
    Mpn(Mpn),
    /// Exact lookup by vendor listing
    Sku(Sku),
    /// Free-text search
    Term(String),
}

impl QueryTarget {
    /// Build a target from an optional Mpn and Sku; the Mpn wins when both are set.
    ///
    /// # Errors
    /// Returns [`PartinfoError::MissingIdentity`] when neither is present.
    pub fn from_identity(mpn: Option<Mpn>, sku: Option<Sku>) -> Result<Self> {
        match (mpn, sku) {
            (Some(mpn), _) => Ok(Self::Mpn(mpn)),
            (None, Some(sku)) => Ok(Self::Sku(Sku::new(sku.vendor, sku.part))),
            (None, None) => Err(PartinfoError::MissingIdentity),
        }
    }

    /// Provenance tag for results of this target.
    #[must_use]
    pub fn result_kind(&self) -> ResultKind {
        match self {
            Self::Term(_) => ResultKind::Search,
            Self::Mpn(_) | Self::Sku(_) => ResultKind::Match,
        }
    }
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mpn(mpn) => write!(f, "mpn {mpn}"),
            Self::Sku(sku) => write!(f, "sku {sku}"),
            Self::Term(term) => write!(f, "term {term:?}"),
        }
    }
}

/// The parts of a response the caller cares about.
///
/// Sets are ordered and de-duplicated so that argument order and repeated
/// values never change a fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestedFields {
    /// Retailer allow-list for offers; `None` means the default set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retailers: Option<BTreeSet<String>>,
    /// Currencies to keep in price tables; `None` keeps all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currencies: Option<BTreeSet<String>>,
}

impl RequestedFields {
    /// Restrict offers to the given retailers.
    #[must_use]
    pub fn from_retailers<I, S>(retailers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            retailers: Some(retailers.into_iter().map(Into::into).collect()),
            currencies: None,
        }
    }

    /// Restrict price tables to the given currencies.
    #[must_use]
    pub fn with_currencies<I, S>(mut self, currencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.currencies = Some(currencies.into_iter().map(Into::into).collect());
        self
    }
}

/// Order-independent hash of a query's identity and projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    target: &'a QueryTarget,
    fields: &'a RequestedFields,
}

/// A caller's question, as it travels through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Correlation id assigned by the query front
    pub id: u64,
    /// What is being asked
    pub target: QueryTarget,
    /// Response projection
    pub fields: RequestedFields,
    /// When the query was submitted
    pub submitted_at: DateTime<Utc>,
    /// Attributes parsed from a search term
    pub attributes: Option<ComponentAttributes>,
    /// Exact part numbers a common-parts lookup resolved the term to
    pub shortcut_matches: Vec<Mpn>,
}

impl Query {
    /// Create a query for a target with the default projection.
    #[must_use]
    pub fn new(target: QueryTarget) -> Self {
        Self {
            id: 0,
            target,
            fields: RequestedFields::default(),
            submitted_at: Utc::now(),
            attributes: None,
            shortcut_matches: Vec::new(),
        }
    }

    /// Exact lookup by Mpn.
    #[must_use]
    pub fn mpn(mpn: Mpn) -> Self {
        Self::new(QueryTarget::Mpn(mpn))
    }

    /// Exact lookup by Sku.
    #[must_use]
    pub fn sku(sku: Sku) -> Self {
        Self::new(QueryTarget::Sku(sku))
    }

    /// Free-text search.
    #[must_use]
    pub fn term(term: impl Into<String>) -> Self {
        Self::new(QueryTarget::Term(term.into()))
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// Set the response projection.
    #[must_use]
    pub fn with_fields(mut self, fields: RequestedFields) -> Self {
        self.fields = fields;
        self
    }

    /// Provenance tag for this query's results.
    #[must_use]
    pub fn kind(&self) -> ResultKind {
        self.target.result_kind()
    }

    /// Search term, for term queries.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        match &self.target {
            QueryTarget::Term(term) => Some(term),
            _ => None,
        }
    }

    /// Cache and coalescing key.
    ///
    /// Covers the target and the projection only; id, timestamp, and
    /// annotations never contribute.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let input = FingerprintInput {
            target: &self.target,
            fields: &self.fields,
        };
        // Serializing plain strings and ordered sets cannot fail.
        let canonical = serde_json::to_vec(&input).unwrap_or_default();
        Fingerprint(hex::encode(Sha256::digest(&canonical)))
    }
}

/// Result set for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResponse {
    /// Ordered hits for a term query
    Search(Vec<Part>),
    /// At most one part for an Mpn or Sku query
    Match(Option<Part>),
}

impl QueryResponse {
    /// The empty response of the right shape for a target.
    #[must_use]
    pub fn empty_for(target: &QueryTarget) -> Self {
        match target {
            QueryTarget::Term(_) => Self::Search(Vec::new()),
            QueryTarget::Mpn(_) | QueryTarget::Sku(_) => Self::Match(None),
        }
    }

    /// All parts in the response.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        match self {
            Self::Search(parts) => parts,
            Self::Match(part) => part.as_slice(),
        }
    }

    /// Mutable access to all parts in the response.
    pub fn parts_mut(&mut self) -> &mut [Part] {
        match self {
            Self::Search(parts) => parts,
            Self::Match(part) => part.as_mut_slice(),
        }
    }

    /// Whether the response holds no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts().is_empty()
    }
}
