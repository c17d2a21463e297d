//! Partinfo Core - Foundation crate for the partinfo aggregation engine.
//!
//! This crate provides the part data model, query fingerprints, error
//! handling, and configuration management that all other partinfo crates
//! depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Part data model (`Mpn`, `Sku`, `Offer`, `Part`, `Spec`)
//! - [`query`] - Queries, requested fields, fingerprints, and responses
//! - [`attributes`] - Structured component attributes and the parser boundary
//! - [`retailers`] - Known retailers and their display names
//!
//! # Example
//!
//! ```rust
//! use partinfo_core::{Mpn, Query, RequestedFields};
//!
//! let a = Query::mpn(Mpn::new("Texas Instruments", "NE555P"))
//!     .with_fields(RequestedFields::from_retailers(["Mouser", "Digikey"]));
//! let b = Query::mpn(Mpn::new("Texas Instruments", "NE555P"))
//!     .with_fields(RequestedFields::from_retailers(["Digikey", "Mouser"]));
//!
//! assert_eq!(a.fingerprint(), b.fingerprint());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod attributes;
pub mod config;
pub mod error;
pub mod query;
pub mod retailers;
pub mod types;

// Re-export commonly used types
pub use attributes::{AttributeParser, ComponentAttributes, ComponentType, NoAttributeParser};
pub use config::{AppConfig, CacheConfig, CoalescerConfig, RetailerConfig, SourceConfig};
pub use error::{ConfigError, ConfigResult, PartinfoError, Result};
pub use query::{Fingerprint, Query, QueryResponse, QueryTarget, RequestedFields};
pub use types::{
    normalize_identity, sort_specs, Image, Mpn, Offer, Part, PriceBreak, PriceTable, ResultKind,
    Sku, Spec,
};
