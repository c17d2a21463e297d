//! Part data model shared across partinfo.
//!
//! Parts are plain owned values rebuilt on every aggregation. Identity across
//! sources is decided by [`Mpn::same_part`], never by strict equality.

use crate::retailers::DASH_SIGNIFICANT_VENDOR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Normalize an identity string for cross-source comparison.
///
/// Lower-cases, rewrites `&` to `and`, and strips everything that is not an
/// ASCII letter or digit. Symbols such as `µ` or `Ω` are dropped too.
#[must_use]
pub fn normalize_identity(value: &str) -> String {
    value
        .to_lowercase()
        .replace('&', "and")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Manufacturer part number: identifies a part independent of any seller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mpn {
    /// Manufacturer name as reported by the source
    pub manufacturer: String,
    /// Manufacturer's part number
    pub part: String,
}

impl Mpn {
    /// Create a new `Mpn`.
    #[must_use]
    pub fn new(manufacturer: impl Into<String>, part: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            part: part.into(),
        }
    }

    /// The normalized `(manufacturer, part)` pair used as identity.
    #[must_use]
    pub fn normalized_key(&self) -> (String, String) {
        (
            normalize_identity(&self.manufacturer),
            normalize_identity(&self.part),
        )
    }

    /// Whether two Mpns name the same part under normalized equality.
    #[must_use]
    pub fn same_part(&self, other: &Mpn) -> bool {
        self.normalized_key() == other.normalized_key()
    }
}

impl fmt::Display for Mpn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.manufacturer, self.part)
    }
}

/// Stock-keeping unit: one sellable listing at one vendor.
///
/// Equality is exact. Construct through [`Sku::new`] so that part numbers are
/// dash-stripped for every vendor except the dash-significant one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sku {
    /// Vendor identifier (e.g. `Digikey`, `Farnell`)
    pub vendor: String,
    /// Vendor's own part number
    pub part: String,
}

impl Sku {
    /// Create a new `Sku`, normalizing the part number for the vendor.
    #[must_use]
    pub fn new(vendor: impl Into<String>, part: impl Into<String>) -> Self {
        let vendor = vendor.into();
        let part = part.into();
        let part = if vendor == DASH_SIGNIFICANT_VENDOR {
            part
        } else {
            part.replace('-', "")
        };
        Self { vendor, part }
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vendor, self.part)
    }
}

/// One price break: `(break_quantity, unit_price)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBreak(pub u64, pub f64);

/// Price table: currency code → ordered price breaks.
pub type PriceTable = BTreeMap<String, Vec<PriceBreak>>;

/// A vendor's sellable listing for a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Listing identity; unique within a part's offers
    pub sku: Sku,
    /// Price breaks per currency
    #[serde(default)]
    pub prices: PriceTable,
    /// Quantity in stock, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock_quantity: Option<u64>,
    /// Minimum order quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moq: Option<u64>,
    /// Units per pack when sold in multipacks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipack_quantity: Option<u64>,
    /// Product page at the vendor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
    /// Country the stock ships from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_location: Option<String>,
    /// Set when the vendor reports the listing as discontinued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_longer_stocked: Option<bool>,
}

impl Offer {
    /// Create an empty offer for a Sku.
    #[must_use]
    pub fn new(sku: Sku) -> Self {
        Self {
            sku,
            prices: PriceTable::new(),
            in_stock_quantity: None,
            moq: None,
            multipack_quantity: None,
            product_url: None,
            stock_location: None,
            no_longer_stocked: None,
        }
    }

    /// Add a price break in the given currency.
    #[must_use]
    pub fn with_price(mut self, currency: impl Into<String>, quantity: u64, price: f64) -> Self {
        self.prices
            .entry(currency.into())
            .or_default()
            .push(PriceBreak(quantity, price));
        self
    }

    /// Set the stock quantity.
    #[must_use]
    pub fn with_stock(mut self, quantity: u64) -> Self {
        self.in_stock_quantity = Some(quantity);
        self
    }

    /// Fold another listing for the same Sku into this one.
    ///
    /// Currencies are unioned; for currencies present on both sides the break
    /// list gains only quantities it does not already price, and stays ordered
    /// by quantity. Scalar fields only fill gaps.
    pub fn absorb(&mut self, other: Offer) {
        for (currency, breaks) in other.prices {
            let existing = self.prices.entry(currency).or_default();
            for price_break in breaks {
                if !existing.iter().any(|b| b.0 == price_break.0) {
                    existing.push(price_break);
                }
            }
            existing.sort_by_key(|b| b.0);
        }
        self.in_stock_quantity = self.in_stock_quantity.or(other.in_stock_quantity);
        self.moq = self.moq.or(other.moq);
        self.multipack_quantity = self.multipack_quantity.or(other.multipack_quantity);
        self.product_url = self.product_url.take().or(other.product_url);
        self.stock_location = self.stock_location.take().or(other.stock_location);
        self.no_longer_stocked = self.no_longer_stocked.or(other.no_longer_stocked);
    }
}

/// Image reference with attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image URL
    pub url: String,
    /// Attribution text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_string: Option<String>,
    /// Attribution link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_url: Option<String>,
}

/// A technical specification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    /// Machine key (e.g. `resistance`)
    pub key: String,
    /// Human-readable name
    pub name: String,
    /// Display value (e.g. `10 kΩ`)
    pub display_value: String,
}

impl Spec {
    /// Create a new spec entry.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        display_value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            display_value: display_value.into(),
        }
    }
}

/// Spec keys grouped by importance, most important group first.
const SPEC_IMPORTANCE: &[&[&str]] = &[
    &["color", "capacitance", "resistance"],
    &["case_package"],
    &["dielectric_characteristic"],
    &["resistance_tolerance", "capacitance_tolerance"],
    &["voltage_rating", "power_rating"],
    &["pin_count"],
    &["case_package_si"],
];

fn importance(key: &str) -> usize {
    SPEC_IMPORTANCE
        .iter()
        .position(|group| group.contains(&key))
        .unwrap_or(SPEC_IMPORTANCE.len())
}

/// Sort specs by importance. Unranked keys go last, in their original order.
pub fn sort_specs(specs: &mut [Spec]) {
    specs.sort_by_key(|spec| importance(&spec.key));
}

/// How a part was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Exact identity lookup (Mpn, Sku, or common-parts shortcut)
    Match,
    /// Free-text search hit
    Search,
}

/// Canonical part record assembled from one or more sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Manufacturer identity
    pub mpn: Mpn,
    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Datasheet link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasheet_url: Option<String>,
    /// Product image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    /// Specifications ordered by importance
    #[serde(default)]
    pub specs: Vec<Spec>,
    /// Offers, unique by Sku
    #[serde(default)]
    pub offers: Vec<Offer>,
    /// Provenance tag
    pub result_kind: ResultKind,
}

impl Part {
    /// Create a part with no metadata and no offers.
    #[must_use]
    pub fn new(mpn: Mpn, result_kind: ResultKind) -> Self {
        Self {
            mpn,
            description: None,
            datasheet_url: None,
            image: None,
            specs: Vec::new(),
            offers: Vec::new(),
            result_kind,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an offer, folding it into an existing offer with the same Sku.
    #[must_use]
    pub fn with_offer(mut self, offer: Offer) -> Self {
        self.upsert_offer(offer);
        self
    }

    /// Replace the specs, sorting them by importance.
    pub fn set_specs(&mut self, mut specs: Vec<Spec>) {
        sort_specs(&mut specs);
        self.specs = specs;
    }

    /// Offer with exactly this Sku, if any.
    #[must_use]
    pub fn offer_for(&self, sku: &Sku) -> Option<&Offer> {
        self.offers.iter().find(|offer| &offer.sku == sku)
    }

    /// Add an offer; an existing offer with the same Sku absorbs it.
    pub fn upsert_offer(&mut self, offer: Offer) {
        match self.offers.iter_mut().find(|o| o.sku == offer.sku) {
            Some(existing) => existing.absorb(offer),
            None => self.offers.push(offer),
        }
    }

    /// Add an offer, discarding any existing offer with the same Sku.
    pub fn replace_offer(&mut self, offer: Offer) {
        self.offers.retain(|o| o.sku != offer.sku);
        self.offers.push(offer);
    }

    /// Fill missing metadata from another record of the same part.
    pub fn backfill_from(&mut self, other: &Part) {
        if self.description.is_none() {
            self.description.clone_from(&other.description);
        }
        if self.datasheet_url.is_none() {
            self.datasheet_url.clone_from(&other.datasheet_url);
        }
        if self.image.is_none() {
            self.image.clone_from(&other.image);
        }
        if self.specs.is_empty() {
            self.specs.clone_from(&other.specs);
        }
    }
}
