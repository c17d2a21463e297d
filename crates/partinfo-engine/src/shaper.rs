//! Per-caller projection of merged results.

use partinfo_core::{Part, QueryResponse, RequestedFields, RetailerConfig};
use std::collections::BTreeSet;

/// Applies a caller's retailer and currency filters to a merged response.
///
/// Shaping runs on each caller's copy after caching, so one cached record
/// serves every projection.
#[derive(Debug, Clone)]
pub struct ResultShaper {
    default_retailers: BTreeSet<String>,
}

impl ResultShaper {
    /// Shaper with an explicit default allow-list.
    #[must_use]
    pub fn new(default_retailers: BTreeSet<String>) -> Self {
        Self { default_retailers }
    }

    /// Shaper using the configured default allow-list.
    #[must_use]
    pub fn from_config(config: &RetailerConfig) -> Self {
        Self::new(config.default.iter().cloned().collect())
    }

    /// Filter every part in the response.
    #[must_use]
    pub fn shape(&self, mut response: QueryResponse, fields: &RequestedFields) -> QueryResponse {
        let retailers = fields.retailers.as_ref().unwrap_or(&self.default_retailers);
        for part in response.parts_mut() {
            shape_part(part, retailers, fields.currencies.as_ref());
        }
        response
    }
}

fn shape_part(part: &mut Part, retailers: &BTreeSet<String>, currencies: Option<&BTreeSet<String>>) {
    part.offers.retain(|offer| retailers.contains(&offer.sku.vendor));
    if let Some(currencies) = currencies {
        for offer in &mut part.offers {
            offer.prices.retain(|currency, _| currencies.contains(currency));
        }
    }
}
