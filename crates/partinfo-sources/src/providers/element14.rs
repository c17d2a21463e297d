//! element14 product API, enriching Farnell and Newark offers.

use super::common::{build_http_client, read_json, require_api_key};
use crate::enricher::{OfferEnricher, OfferPatch};
use crate::error::{Result, SourceError};
use async_trait::async_trait;
use partinfo_core::{Sku, SourceConfig};
use reqwest::Client;
use serde::Deserialize;

const PROVIDER: &str = "element14";

/// National class code for products stocked outside the store's country.
const STOCKED_ABROAD: &str = "F";

const DISCONTINUED_STATUSES: &[&str] = &["NO_LONGER_STOCKED", "NO_LONGER_MANUFACTURED"];

/// One element14 storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Store {
    /// Store id sent to the API
    pub site: &'static str,
    /// Country the store ships from by default
    pub location: &'static str,
    /// Country of the extended range
    pub extended_location: &'static str,
}

/// Storefront for a vendor id.
#[must_use]
pub fn store_for(vendor: &str) -> Option<Store> {
    match vendor {
        "Newark" => Some(Store {
            site: "www.newark.com",
            location: "US",
            extended_location: "UK",
        }),
        "Farnell" => Some(Store {
            site: "uk.farnell.com",
            location: "UK",
            extended_location: "US",
        }),
        _ => None,
    }
}

/// element14 catalog client.
pub struct Element14Enricher {
    client: Client,
    api_key: String,
    base_url: String,
}

impl Element14Enricher {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns error if no API key is configured or the HTTP client cannot be
    /// created.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            api_key: require_api_key(PROVIDER, config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl OfferEnricher for Element14Enricher {
    async fn enrich(&self, sku: &Sku) -> Result<OfferPatch> {
        let store = store_for(&sku.vendor).ok_or_else(|| SourceError::Unsupported {
            provider: PROVIDER.to_string(),
            message: format!("vendor {}", sku.vendor),
        })?;

        let term = format!("id:{}", sku.part);
        let response = self
            .client
            .get(format!("{}/products", self.base_url))
            .query(&[
                ("callInfo.responseDataFormat", "json"),
                ("term", term.as_str()),
                ("storeInfo.id", store.site),
                ("callInfo.apiKey", self.api_key.as_str()),
                ("resultsSettings.responseGroup", "inventory"),
            ])
            .send()
            .await?;

        let body: Element14Response = read_json(PROVIDER, response).await?;
        decode_patch(store, sku, &body)
    }

    fn vendors(&self) -> Vec<String> {
        vec!["Farnell".to_string(), "Newark".to_string()]
    }

    fn enricher_id(&self) -> &str {
        PROVIDER
    }
}

fn decode_patch(store: Store, sku: &Sku, body: &Element14Response) -> Result<OfferPatch> {
    let products = body
        .premier_farnell_part_number_return
        .as_ref()
        .map(|r| r.products.as_slice())
        .unwrap_or_default();

    if products.iter().any(|p| {
        p.product_status
            .as_deref()
            .is_some_and(|status| DISCONTINUED_STATUSES.contains(&status))
    }) {
        return Err(SourceError::Discontinued {
            provider: PROVIDER.to_string(),
            sku: sku.to_string(),
        });
    }

    if products.is_empty() {
        return Ok(OfferPatch::default());
    }

    let stocked_abroad = products
        .iter()
        .all(|p| p.national_class_code.as_deref() == Some(STOCKED_ABROAD));
    let location = if stocked_abroad {
        store.extended_location
    } else {
        store.location
    };
    Ok(OfferPatch::located(location))
}

// element14 API types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Element14Response {
    premier_farnell_part_number_return: Option<PartNumberReturn>,
}

#[derive(Debug, Deserialize)]
struct PartNumberReturn {
    #[serde(default)]
    products: Vec<Element14Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Element14Product {
    national_class_code: Option<String>,
    product_status: Option<String>,
}
