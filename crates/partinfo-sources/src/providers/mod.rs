//! Part data provider implementations.

pub mod common;
pub mod element14;
pub mod lcsc;
pub mod octopart;

pub use element14::Element14Enricher;
pub use lcsc::LcscSource;
pub use octopart::OctopartSource;
