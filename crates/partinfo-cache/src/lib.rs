//! Partinfo Cache - TTL-bounded storage for source and merged responses.
//!
//! [`CacheStore`] is the storage boundary; [`MemoryCacheStore`] is the
//! in-process implementation. [`ResponseCache`] layers JSON encoding and key
//! namespacing on top so each data source and the merged results keep
//! separate key spaces in one store.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod response;
pub mod store;

pub use error::{CacheError, Result};
pub use response::ResponseCache;
pub use store::{CacheStore, MemoryCacheStore};
