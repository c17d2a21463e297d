//! LCSC distributor catalog, a secondary source.
//!
//! LCSC has no exact-match endpoint: Mpn and Sku lookups are keyword searches
//! whose results are filtered locally.

use super::common::{build_http_client, known_count, number_or_string, read_json};
use crate::error::{Result, SourceError};
use crate::source::{PartDataSource, SearchRequest, SourceCapabilities, SourceRole};
use async_trait::async_trait;
use partinfo_core::retailers::LCSC_VENDOR;
use partinfo_core::{Image, Mpn, Offer, Part, ResultKind, Sku, SourceConfig, Spec};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const PROVIDER: &str = "lcsc";
const SUCCESS: i64 = 200;

/// LCSC catalog search client.
pub struct LcscSource {
    client: Client,
    base_url: String,
}

impl LcscSource {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn products(&self, keyword: &str) -> Result<Vec<LcscProduct>> {
        let response = self
            .client
            .get(format!("{}/search/global", self.base_url))
            .query(&[("keyword", keyword)])
            .header("Accept", "application/json")
            .send()
            .await?;

        let body: LcscResponse = read_json(PROVIDER, response).await?;
        body.into_products()
    }
}

#[async_trait]
impl PartDataSource for LcscSource {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Part>> {
        let term = request.term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let products = self.products(term).await?;
        debug!(term, hits = products.len(), "LCSC search");
        Ok(products
            .into_iter()
            .map(|product| to_part(product, ResultKind::Search))
            .collect())
    }

    async fn match_mpn(&self, mpn: &Mpn) -> Result<Option<Part>> {
        let keyword = format!("{} {}", mpn.manufacturer, mpn.part);
        let products = self.products(&keyword).await?;
        Ok(pick_by_mpn(products, mpn).map(|product| to_part(product, ResultKind::Match)))
    }

    async fn match_sku(&self, sku: &Sku) -> Result<Option<Part>> {
        if sku.vendor != LCSC_VENDOR {
            return Ok(None);
        }
        let products = self.products(&sku.part).await?;
        Ok(products
            .into_iter()
            .find(|p| p.product_code.eq_ignore_ascii_case(&sku.part))
            .map(|product| to_part(product, ResultKind::Match)))
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            role: SourceRole::Secondary,
            supports_attribute_filters: false,
            sku_vendors: Some(vec![LCSC_VENDOR.to_string()]),
        }
    }

    fn source_id(&self) -> &str {
        PROVIDER
    }
}

fn pick_by_mpn(products: Vec<LcscProduct>, mpn: &Mpn) -> Option<LcscProduct> {
    products
        .into_iter()
        .find(|product| product.mpn().same_part(mpn))
}

fn spec_key(name: &str) -> String {
    let key: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    key.split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn to_part(product: LcscProduct, kind: ResultKind) -> Part {
    let mut part = Part::new(product.mpn(), kind);
    part.description = product.product_intro_en.filter(|d| !d.is_empty());
    part.datasheet_url = product.pdf_url.filter(|url| !url.is_empty());
    part.image = product.product_images.into_iter().next().map(|url| Image {
        url,
        credit_string: Some("LCSC".to_string()),
        credit_url: Some("https://lcsc.com".to_string()),
    });

    let mut specs: Vec<Spec> = product
        .param_vo_list
        .into_iter()
        .filter_map(|p| {
            let name = p.param_name_en?;
            let value = p.param_value_en?;
            Some(Spec::new(spec_key(&name), name, value))
        })
        .collect();
    if let Some(package) = product.encap_standard.filter(|p| !p.is_empty()) {
        if !specs.iter().any(|s| s.key == "case_package") {
            specs.push(Spec::new("case_package", "Case/Package", package));
        }
    }
    part.set_specs(specs);

    let mut offer = Offer::new(Sku::new(LCSC_VENDOR, product.product_code.clone()));
    for ladder in product.product_price_list {
        if let (Some(quantity), Some(price)) = (known_count(ladder.ladder), ladder.usd_price) {
            offer = offer.with_price("USD", quantity, price);
        }
    }
    offer.in_stock_quantity = known_count(product.stock_number);
    offer.moq = known_count(product.min_buy_number);
    offer.product_url = Some(format!(
        "https://www.lcsc.com/product-detail/{}.html",
        product.product_code
    ));
    part.upsert_offer(offer);
    part
}

// LCSC API types

#[derive(Debug, Deserialize)]
struct LcscResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    result: Option<LcscResult>,
}

impl LcscResponse {
    fn into_products(self) -> Result<Vec<LcscProduct>> {
        if self.code != SUCCESS {
            return Err(SourceError::ApiError {
                provider: PROVIDER.to_string(),
                status: u16::try_from(self.code).unwrap_or(0),
                message: self.msg.unwrap_or_default(),
            });
        }
        Ok(self
            .result
            .and_then(|r| r.product_search_result_vo)
            .map(|vo| vo.product_list)
            .unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LcscResult {
    #[serde(rename = "productSearchResultVO")]
    product_search_result_vo: Option<LcscSearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LcscSearchResult {
    #[serde(default)]
    product_list: Vec<LcscProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LcscProduct {
    product_code: String,
    #[serde(default)]
    product_model: String,
    #[serde(default)]
    brand_name_en: String,
    product_intro_en: Option<String>,
    pdf_url: Option<String>,
    encap_standard: Option<String>,
    #[serde(default)]
    product_images: Vec<String>,
    stock_number: Option<i64>,
    min_buy_number: Option<i64>,
    #[serde(default)]
    product_price_list: Vec<LcscPriceLadder>,
    #[serde(default, rename = "paramVOList")]
    param_vo_list: Vec<LcscParam>,
}

impl LcscProduct {
    fn mpn(&self) -> Mpn {
        Mpn::new(self.brand_name_en.clone(), self.product_model.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LcscPriceLadder {
    ladder: Option<i64>,
    #[serde(default, deserialize_with = "number_or_string")]
    usd_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LcscParam {
    param_name_en: Option<String>,
    param_value_en: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use partinfo_core::PriceBreak;

    const RESPONSE: &str = r#"{
        "code": 200,
        "result": {"productSearchResultVO": {"productList": [
            {
                "productCode": "C17414",
                "productModel": "RC0805FR-0710KL",
                "brandNameEn": "YAGEO",
                "productIntroEn": "10kΩ ±1% 125mW 0805 Thick Film Resistors",
                "pdfUrl": "https://datasheet.lcsc.com/C17414.pdf",
                "encapStandard": "0805",
                "productImages": ["https://assets.lcsc.com/C17414.jpg"],
                "stockNumber": 1500000,
                "minBuyNumber": 100,
                "productPriceList": [
                    {"ladder": 100, "usdPrice": 0.0025},
                    {"ladder": 1000, "usdPrice": "0.00125"}
                ],
                "paramVOList": [
                    {"paramNameEn": "Tolerance", "paramValueEn": "±1%"},
                    {"paramNameEn": "Resistance", "paramValueEn": "10kΩ"}
                ]
            },
            {
                "productCode": "C25744",
                "productModel": "0805W8F1002T5E",
                "brandNameEn": "UNI-ROYAL(Uniroyal Elec)",
                "stockNumber": 0
            }
        ]}}
    }"#;

    fn products() -> Vec<LcscProduct> {
        let response: LcscResponse = serde_json::from_str(RESPONSE).expect("parse fixture");
        response.into_products().expect("successful response")
    }

    #[test]
    fn test_decodes_product() {
        let part = to_part(products().remove(0), ResultKind::Search);

        assert_eq!(part.mpn, Mpn::new("YAGEO", "RC0805FR-0710KL"));
        assert_eq!(part.specs[0].key, "resistance");
        assert!(part.specs.iter().any(|s| s.key == "case_package"));

        let offer = part
            .offer_for(&Sku::new("LCSC", "C17414"))
            .expect("lcsc offer");
        assert_eq!(
            offer.prices["USD"],
            vec![PriceBreak(100, 0.0025), PriceBreak(1000, 0.00125)]
        );
        assert_eq!(offer.in_stock_quantity, Some(1_500_000));
        assert_eq!(offer.moq, Some(100));
    }

    #[test]
    fn test_pick_by_normalized_mpn() {
        let picked = pick_by_mpn(products(), &Mpn::new("Yageo", "RC0805FR-0710KL"));
        assert_eq!(picked.map(|p| p.product_code), Some("C17414".to_string()));

        assert!(pick_by_mpn(products(), &Mpn::new("Yageo", "RC0805JR-0710KL")).is_none());
    }

    #[test]
    fn test_error_code() {
        let response: LcscResponse =
            serde_json::from_str(r#"{"code": 429, "msg": "slow down"}"#).expect("parse");
        assert!(matches!(
            response.into_products(),
            Err(SourceError::ApiError { status: 429, .. })
        ));
    }

    #[test]
    fn test_spec_key() {
        assert_eq!(spec_key("Power(Watts)"), "power_watts");
        assert_eq!(spec_key("Resistance"), "resistance");
    }
}
