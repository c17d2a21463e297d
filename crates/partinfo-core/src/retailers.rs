//! Known retailers and the names sources use for them.

use std::collections::BTreeSet;

/// Vendor whose part numbers keep their dashes.
pub const DASH_SIGNIFICANT_VENDOR: &str = "Digikey";

/// Vendor id for the LCSC catalog.
pub const LCSC_VENDOR: &str = "LCSC";

/// Seller display names (as reported by the aggregator) mapped to vendor ids.
///
/// Several display names may map to one vendor; the last entry for a vendor
/// is the name used when querying by vendor.
pub const RETAILER_NAMES: &[(&str, &str)] = &[
    ("Digi-Key", "Digikey"),
    ("Mouser", "Mouser"),
    ("RS Components", "RS"),
    ("Newark", "Newark"),
    ("element14 APAC", "Farnell"),
    ("Farnell", "Farnell"),
];

/// Vendor id for a seller display name.
#[must_use]
pub fn vendor_for_seller(seller: &str) -> Option<&'static str> {
    RETAILER_NAMES
        .iter()
        .find(|(name, _)| *name == seller)
        .map(|(_, vendor)| *vendor)
}

/// Seller display name for a vendor id.
#[must_use]
pub fn seller_for_vendor(vendor: &str) -> Option<&'static str> {
    RETAILER_NAMES
        .iter()
        .rev()
        .find(|(_, v)| *v == vendor)
        .map(|(name, _)| *name)
}

/// Vendors served when a caller does not name any.
#[must_use]
pub fn default_retailers() -> BTreeSet<String> {
    RETAILER_NAMES
        .iter()
        .map(|(_, vendor)| (*vendor).to_string())
        .chain(std::iter::once(LCSC_VENDOR.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seller_mapping() {
        assert_eq!(vendor_for_seller("Digi-Key"), Some("Digikey"));
        assert_eq!(vendor_for_seller("element14 APAC"), Some("Farnell"));
        assert_eq!(vendor_for_seller("Arrow"), None);
        assert_eq!(seller_for_vendor("Farnell"), Some("Farnell"));
        assert_eq!(seller_for_vendor("RS"), Some("RS Components"));
    }

    #[test]
    fn test_default_retailers() {
        let defaults = default_retailers();
        assert_eq!(defaults.len(), 6);
        assert!(defaults.contains("Digikey"));
        assert!(defaults.contains("LCSC"));
    }
}
