//! Partinfo Sources - part data providers behind caches and rate limiters.
//!
//! Each provider implements [`PartDataSource`] (or [`OfferEnricher`] for
//! retailer-direct offer details) and only knows how to call its API and decode
//! the answer. [`SourceAdapter`] and [`EnricherAdapter`] add the shared
//! discipline: cache lookup, FIFO rate limiting, and turning provider errors
//! into empty results.
//!
//! # Example
//!
//! ```rust
//! use partinfo_sources::{tolerances_within, RateLimit};
//! use std::time::Duration;
//!
//! // A 1% request accepts any tighter catalog tolerance.
//! let accepted = tolerances_within(1.0);
//! assert!(accepted.contains(&"±0.1%".to_string()));
//! assert!(!accepted.contains(&"±2%".to_string()));
//!
//! let limit = RateLimit { max_calls: 3, window: Duration::from_secs(1), max_in_flight: 3 };
//! assert_eq!(limit.max_calls, 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
pub mod enricher;
pub mod error;
pub mod filter;
pub mod providers;
pub mod rate_limit;
pub mod source;

// Re-export commonly used types
pub use adapter::SourceAdapter;
pub use enricher::{EnricherAdapter, OfferEnricher, OfferPatch};
pub use error::{Result, SourceError};
pub use filter::{build_filters, ratings_at_least, tolerances_within, AttributeFilter, FilterField};
pub use providers::{Element14Enricher, LcscSource, OctopartSource};
pub use rate_limit::{RateLimit, RateLimitPermit, RateLimiter};
pub use source::{PartDataSource, SearchRequest, SourceCapabilities, SourceRole};
