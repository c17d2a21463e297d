//! Octopart aggregator (v3 JSON API), the primary source.

use super::common::{build_http_client, known_count, number_or_string, read_json, require_api_key};
use crate::error::{Result, SourceError};
use crate::filter::AttributeFilter;
use crate::source::{PartDataSource, SearchRequest, SourceCapabilities, SourceRole};
use async_trait::async_trait;
use partinfo_core::retailers::{seller_for_vendor, vendor_for_seller, RETAILER_NAMES};
use partinfo_core::{Image, Mpn, Offer, Part, ResultKind, Sku, SourceConfig, Spec};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const PROVIDER: &str = "octopart";
const SEARCH_LIMIT: usize = 20;
const INCLUDES: &[&str] = &["specs", "short_description", "imagesets", "datasheets"];

/// Octopart part-match and part-search client.
pub struct OctopartSource {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OctopartSource {
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

    fn common_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = INCLUDES
            .iter()
            .map(|include| ("include[]".to_string(), (*include).to_string()))
            .collect();
        params.push(("apikey".to_string(), self.api_key.clone()));
        params
    }

    async fn run_match(&self, query: MatchQuery) -> Result<Option<OctopartItem>> {
        let queries = serde_json::to_string(&[&query])
            .map_err(|e| SourceError::Internal(format!("failed to encode match query: {e}")))?;
        let mut params = self.common_params();
        params.push(("queries".to_string(), queries));

        let response = self
            .client
            .get(format!("{}/parts/match", self.base_url))
            .query(&params)
            .header("Accept", "application/json")
            .send()
            .await?;

        let body: MatchResponse = read_json(PROVIDER, response).await?;
        Ok(body
            .results
            .into_iter()
            .flat_map(|result| result.items)
            .next())
    }
}

#[async_trait]
impl PartDataSource for OctopartSource {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Part>> {
        let mut params = self.common_params();
        params.push(("q".to_string(), request.term.clone()));
        params.push(("limit".to_string(), SEARCH_LIMIT.to_string()));
        params.extend(filter_params(&request.filters));

        let response = self
            .client
            .get(format!("{}/parts/search", self.base_url))
            .query(&params)
            .header("Accept", "application/json")
            .send()
            .await?;

        let body: SearchResponse = read_json(PROVIDER, response).await?;
        debug!(term = %request.term, hits = body.results.len(), "Octopart search");
        Ok(body
            .results
            .into_iter()
            .map(|hit| to_part(hit.item, None, ResultKind::Search))
            .collect())
    }

    async fn match_mpn(&self, mpn: &Mpn) -> Result<Option<Part>> {
        let query = MatchQuery {
            mpn: Some(mpn.part.clone()),
            brand: Some(brand_param(&mpn.manufacturer)),
            ..MatchQuery::single()
        };
        Ok(self
            .run_match(query)
            .await?
            .map(|item| to_part(item, Some(mpn), ResultKind::Match)))
    }

    async fn match_sku(&self, sku: &Sku) -> Result<Option<Part>> {
        let Some(seller) = seller_for_vendor(&sku.vendor) else {
            return Ok(None);
        };
        let query = MatchQuery {
            sku: Some(sku.part.clone()),
            seller: Some(seller.to_string()),
            ..MatchQuery::single()
        };
        Ok(self
            .run_match(query)
            .await?
            .map(|item| to_part(item, None, ResultKind::Match)))
    }

    fn capabilities(&self) -> SourceCapabilities {
        let mut vendors: Vec<String> = RETAILER_NAMES
            .iter()
            .map(|(_, vendor)| (*vendor).to_string())
            .collect();
        vendors.dedup();
        SourceCapabilities {
            role: SourceRole::Primary,
            supports_attribute_filters: true,
            sku_vendors: Some(vendors),
        }
    }

    fn source_id(&self) -> &str {
        PROVIDER
    }
}

/// Octopart mis-handles `" / "` in brand names.
fn brand_param(manufacturer: &str) -> String {
    manufacturer.replace(" / ", " ")
}

fn filter_params(filters: &[AttributeFilter]) -> Vec<(String, String)> {
    filters
        .iter()
        .flat_map(|filter| {
            let name = format!("filter[fields][specs.{}.value][]", filter.field.key());
            filter
                .values
                .iter()
                .map(move |value| (name.clone(), value.clone()))
        })
        .collect()
}

/// Decode an Octopart item into a part. A query Mpn overrides the item's.
fn to_part(item: OctopartItem, query_mpn: Option<&Mpn>, kind: ResultKind) -> Part {
    let mpn = query_mpn.cloned().unwrap_or_else(|| {
        Mpn::new(
            item.brand.map(|b| b.name).unwrap_or_default(),
            item.mpn.unwrap_or_default(),
        )
    });

    let mut part = Part::new(mpn, kind);
    part.description = item.short_description.filter(|d| !d.is_empty());
    part.image = item.imagesets.into_iter().find_map(|set| {
        let url = set.medium_image?.url?;
        Some(Image {
            url,
            credit_string: set.credit_string,
            credit_url: set.credit_url,
        })
    });
    part.datasheet_url = item
        .datasheets
        .into_iter()
        .find_map(|d| d.url.filter(|url| !url.is_empty()));
    part.set_specs(
        item.specs
            .into_iter()
            .map(|(key, spec)| {
                let name = spec.metadata.and_then(|m| m.name).unwrap_or_else(|| key.clone());
                Spec::new(key, name, spec.display_value.unwrap_or_default())
            })
            .collect(),
    );

    for offer in item.offers {
        if let Some(offer) = to_offer(offer) {
            part.upsert_offer(offer);
        }
    }
    part
}

fn to_offer(raw: OctopartOffer) -> Option<Offer> {
    let vendor = vendor_for_seller(&raw.seller.name)?;
    let mut offer = Offer::new(Sku::new(vendor, raw.sku.unwrap_or_default()));
    for (currency, breaks) in raw.prices {
        for PriceBreakRaw(quantity, price) in breaks {
            if let Some(price) = price {
                offer = offer.with_price(currency.clone(), quantity, price);
            }
        }
    }
    offer.in_stock_quantity = known_count(raw.in_stock_quantity);
    offer.moq = known_count(raw.moq);
    offer.product_url = raw.product_url;
    Some(offer)
}

// Octopart API types

#[derive(Debug, Default, Serialize)]
struct MatchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    mpn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seller: Option<String>,
    limit: u32,
    reference: String,
}

impl MatchQuery {
    /// One best item, correlated by a fixed reference.
    fn single() -> Self {
        Self {
            limit: 1,
            reference: "0".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct MatchResponse {
    #[serde(default)]
    results: Vec<MatchResult>,
}

#[derive(Debug, Deserialize)]
struct MatchResult {
    #[serde(default)]
    items: Vec<OctopartItem>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    item: OctopartItem,
}

#[derive(Debug, Deserialize)]
struct OctopartItem {
    mpn: Option<String>,
    brand: Option<OctopartBrand>,
    short_description: Option<String>,
    #[serde(default)]
    specs: BTreeMap<String, OctopartSpec>,
    #[serde(default)]
    imagesets: Vec<OctopartImageSet>,
    #[serde(default)]
    datasheets: Vec<OctopartDatasheet>,
    #[serde(default)]
    offers: Vec<OctopartOffer>,
}

#[derive(Debug, Deserialize)]
struct OctopartBrand {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OctopartSpec {
    metadata: Option<OctopartSpecMetadata>,
    display_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OctopartSpecMetadata {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OctopartImageSet {
    medium_image: Option<OctopartImage>,
    credit_string: Option<String>,
    credit_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OctopartImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OctopartDatasheet {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OctopartOffer {
    seller: OctopartSeller,
    sku: Option<String>,
    #[serde(default)]
    prices: BTreeMap<String, Vec<PriceBreakRaw>>,
    in_stock_quantity: Option<i64>,
    moq: Option<i64>,
    product_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OctopartSeller {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PriceBreakRaw(u64, #[serde(deserialize_with = "number_or_string")] Option<f64>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterField;
    use partinfo_core::PriceBreak;

    const ITEM: &str = r#"{
        "mpn": "NE555P",
        "brand": {"name": "Texas Instruments"},
        "short_description": "IC OSC SINGLE TIMER 100KHZ 8-DIP",
        "specs": {
            "pin_count": {"metadata": {"name": "Pin Count"}, "display_value": "8"},
            "case_package": {"metadata": {"name": "Case/Package"}, "display_value": "DIP"},
            "supply_voltage": {"metadata": {"name": "Supply Voltage"}, "display_value": "4.5 V"}
        },
        "imagesets": [
            {"small_image": {"url": "https://example.com/s.png"}},
            {"medium_image": {"url": "https://example.com/m.png"},
             "credit_string": "Texas Instruments", "credit_url": "https://ti.com"}
        ],
        "datasheets": [{"url": null}, {"url": "https://example.com/ne555.pdf"}],
        "offers": [
            {"seller": {"name": "Digi-Key"}, "sku": "296-1411-5-ND",
             "prices": {"USD": [[1, "0.42"], [10, "0.375"]]},
             "in_stock_quantity": 41000, "moq": 1},
            {"seller": {"name": "Farnell"}, "sku": "122-0424",
             "prices": {"GBP": [[1, 0.5]]}, "in_stock_quantity": -1},
            {"seller": {"name": "element14 APAC"}, "sku": "1220424",
             "prices": {"GBP": [[25, 0.25]]}},
            {"seller": {"name": "Some Broker"}, "sku": "X", "prices": {}}
        ]
    }"#;

    fn item() -> OctopartItem {
        serde_json::from_str(ITEM).expect("parse item fixture")
    }

    #[test]
    fn test_decodes_metadata() {
        let part = to_part(item(), None, ResultKind::Search);

        assert_eq!(part.mpn, Mpn::new("Texas Instruments", "NE555P"));
        assert_eq!(part.result_kind, ResultKind::Search);
        assert_eq!(part.datasheet_url.as_deref(), Some("https://example.com/ne555.pdf"));

        let image = part.image.expect("image");
        assert_eq!(image.url, "https://example.com/m.png");
        assert_eq!(image.credit_string.as_deref(), Some("Texas Instruments"));

        let keys: Vec<_> = part.specs.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["case_package", "pin_count", "supply_voltage"]);
    }

    #[test]
    fn test_decodes_offers() {
        let part = to_part(item(), None, ResultKind::Search);
        assert_eq!(part.offers.len(), 2);

        let digikey = part
            .offer_for(&Sku::new("Digikey", "296-1411-5-ND"))
            .expect("digikey keeps dashes");
        assert_eq!(
            digikey.prices["USD"],
            vec![PriceBreak(1, 0.42), PriceBreak(10, 0.375)]
        );
        assert_eq!(digikey.in_stock_quantity, Some(41_000));

        let farnell = part
            .offer_for(&Sku::new("Farnell", "1220424"))
            .expect("farnell offers merged");
        assert_eq!(
            farnell.prices["GBP"],
            vec![PriceBreak(1, 0.5), PriceBreak(25, 0.25)]
        );
        assert_eq!(farnell.in_stock_quantity, None);
    }

    #[test]
    fn test_query_mpn_overrides_item() {
        let query = Mpn::new("TI", "NE555P");
        let part = to_part(item(), Some(&query), ResultKind::Match);
        assert_eq!(part.mpn, query);
    }

    #[test]
    fn test_brand_param() {
        assert_eq!(brand_param("Murata / Syfer"), "Murata Syfer");
        assert_eq!(brand_param("Yageo"), "Yageo");
    }

    #[test]
    fn test_filter_params() {
        let params = filter_params(&[AttributeFilter::new(
            FilterField::ResistanceTolerance,
            vec!["±0.5%".to_string(), "±1%".to_string()],
        )]);
        assert_eq!(params.len(), 2);
        assert_eq!(
            params[0].0,
            "filter[fields][specs.resistance_tolerance.value][]"
        );
        assert_eq!(params[1].1, "±1%");
    }

    #[test]
    fn test_match_query_encoding() {
        let query = MatchQuery {
            sku: Some("1220424".to_string()),
            seller: Some("Farnell".to_string()),
            ..MatchQuery::single()
        };
        let json = serde_json::to_string(&query).expect("encode");
        assert_eq!(
            json,
            r#"{"sku":"1220424","seller":"Farnell","limit":1,"reference":"0"}"#
        );
    }
}
