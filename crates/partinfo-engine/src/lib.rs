//! Partinfo Engine - Request coalescing and cross-source aggregation.
//!
//! Queries submitted through [`PartInfo`] are batched by the [`coalescer`],
//! answered from the merged-result cache when possible, and otherwise resolved
//! by the [`aggregator`], which fans out to every configured source, merges
//! their records, and enriches retailer offers.
//!
//! # Example
//!
//! ```rust,no_run
//! use partinfo_core::{AppConfig, Mpn, RequestedFields};
//! use partinfo_engine::PartInfo;
//!
//! # async fn example() -> partinfo_engine::Result<()> {
//! let config = AppConfig::load_with_env()?;
//! let engine = PartInfo::from_config(&config)?;
//!
//! let part = engine
//!     .part(
//!         Some(Mpn::new("Texas Instruments", "NE555P")),
//!         None,
//!         RequestedFields::from_retailers(["Digikey"]),
//!     )
//!     .await?;
//! println!("{part:?}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregator;
pub mod coalescer;
pub mod common_parts;
pub mod error;
pub mod merge;
pub mod partinfo;
pub mod shaper;

// Re-export commonly used types
pub use aggregator::{Aggregator, BatchDispatcher};
pub use coalescer::{Coalescer, CoalescerHandle};
pub use common_parts::{CatalogEntry, CommonParts};
pub use error::{EngineError, Result};
pub use merge::{apply_secondary, fold_duplicates, reconcile, Reconciled};
pub use partinfo::{PartInfo, PartInfoBuilder};
pub use shaper::ResultShaper;
