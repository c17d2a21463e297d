//! Curated catalog of generic passives and LEDs.
//!
//! A term like `10k 0805 1%` names a commodity part that many manufacturers
//! make. When the parsed attributes pin such a part down, the catalog supplies
//! well-known exact part numbers so the query can be answered by exact matches
//! instead of a fuzzy search.

use crate::error::Result;
use partinfo_core::{AttributeParser, ComponentAttributes, ComponentType, Mpn, Query};
use serde::Deserialize;
use tracing::debug;

const EMBEDDED_CATALOG: &str = include_str!("../data/common_parts.json");

const VALUE_TOLERANCE: f64 = 1e-9;

/// One catalog entry: a set of interchangeable parts.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    /// Catalog id
    pub id: String,
    /// Component category
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Package size code
    pub size: String,
    /// Resistance or capacitance in base units
    pub value: Option<f64>,
    /// Tolerance in percent
    pub tolerance: Option<f64>,
    /// Power rating in watts
    pub power_rating: Option<f64>,
    /// Voltage rating in volts
    pub voltage_rating: Option<f64>,
    /// LED color
    pub color: Option<String>,
    /// Exact parts that satisfy this entry
    pub part_numbers: Vec<Mpn>,
}

impl CatalogEntry {
    fn matches(&self, attrs: &ComponentAttributes) -> bool {
        if attrs.component_type != Some(self.component_type) {
            return false;
        }
        if !attrs
            .size
            .as_deref()
            .is_some_and(|size| size.eq_ignore_ascii_case(&self.size))
        {
            return false;
        }
        if let Some(wanted) = attrs.value {
            if !self.value.is_some_and(|value| same_value(value, wanted)) {
                return false;
            }
        }
        if let Some(wanted) = attrs.tolerance {
            if !self.tolerance.is_some_and(|t| t <= wanted) {
                return false;
            }
        }
        if let Some(wanted) = attrs.power_rating {
            if !self.power_rating.is_some_and(|r| r >= wanted) {
                return false;
            }
        }
        if let Some(wanted) = attrs.voltage_rating {
            if !self.voltage_rating.is_some_and(|r| r >= wanted) {
                return false;
            }
        }
        if let Some(wanted) = &attrs.color {
            if !self
                .color
                .as_deref()
                .is_some_and(|color| color.eq_ignore_ascii_case(wanted))
            {
                return false;
            }
        }
        true
    }
}

fn same_value(a: f64, b: f64) -> bool {
    (a - b).abs() <= VALUE_TOLERANCE * a.abs().max(b.abs())
}

/// The common-parts catalog.
#[derive(Debug, Clone, Default)]
pub struct CommonParts {
    entries: Vec<CatalogEntry>,
}

impl CommonParts {
    /// The catalog bundled with the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Parse a catalog from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    /// Number of catalog entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of entries satisfying the attributes. Requires a curated type and a
    /// size.
    #[must_use]
    pub fn match_ids(&self, attrs: &ComponentAttributes) -> Vec<&str> {
        let curated = matches!(
            attrs.component_type,
            Some(ComponentType::Resistor | ComponentType::Capacitor | ComponentType::Led)
        );
        if !curated || attrs.size.is_none() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|entry| entry.matches(attrs))
            .map(|entry| entry.id.as_str())
            .collect()
    }

    /// Part numbers for a list of ids, in id order.
    #[must_use]
    pub fn resolve(&self, ids: &[&str]) -> Vec<Mpn> {
        ids.iter()
            .filter_map(|id| self.entries.iter().find(|entry| entry.id == *id))
            .flat_map(|entry| entry.part_numbers.iter().cloned())
            .collect()
    }

    /// Parse a term query's attributes and attach catalog shortcuts.
    ///
    /// Non-term queries and unrecognized terms are left unchanged.
    pub fn annotate(&self, query: &mut Query, parser: &dyn AttributeParser) {
        let Some(term) = query.search_term() else {
            return;
        };
        let Some(attrs) = parser.parse(term) else {
            return;
        };

        let ids = self.match_ids(&attrs);
        let mpns = self.resolve(&ids);
        if !mpns.is_empty() {
            debug!(term, ids = ?ids, "Common parts shortcut");
            query.shortcut_matches = mpns;
        }
        query.attributes = Some(attrs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CommonParts {
        CommonParts::embedded().expect("embedded catalog parses")
    }

    struct FixedParser(Option<ComponentAttributes>);

    impl AttributeParser for FixedParser {
        fn parse(&self, _term: &str) -> Option<ComponentAttributes> {
            self.0.clone()
        }
    }

    #[test]
    fn test_embedded_catalog_loads() {
        assert!(catalog().len() >= 10);
    }

    #[test]
    fn test_resistor_match() {
        let attrs = ComponentAttributes::of_type(ComponentType::Resistor)
            .with_size("0805")
            .with_value(10_000.0);
        let catalog = catalog();
        let ids = catalog.match_ids(&attrs);
        assert_eq!(ids, vec!["resistor-0805-10k"]);

        let mpns = catalog.resolve(&ids);
        assert!(mpns.contains(&Mpn::new("Yageo", "RC0805FR-0710KL")));
    }

    #[test]
    fn test_size_is_required() {
        let attrs = ComponentAttributes::of_type(ComponentType::Resistor).with_value(10_000.0);
        assert!(catalog().match_ids(&attrs).is_empty());
    }

    #[test]
    fn test_tolerance_and_rating_bounds() {
        let catalog = catalog();
        let loose = ComponentAttributes::of_type(ComponentType::Resistor)
            .with_size("0805")
            .with_value(10_000.0)
            .with_tolerance(5.0);
        assert_eq!(catalog.match_ids(&loose).len(), 1);

        let tight = loose.clone().with_tolerance(0.1);
        assert!(catalog.match_ids(&tight).is_empty());

        let mut high_power = loose;
        high_power.power_rating = Some(0.25);
        assert!(catalog.match_ids(&high_power).is_empty());
    }

    #[test]
    fn test_capacitor_value_comparison() {
        let attrs = ComponentAttributes::of_type(ComponentType::Capacitor)
            .with_size("0805")
            .with_value(100e-9);
        let catalog = catalog();
        assert_eq!(catalog.match_ids(&attrs), vec!["capacitor-0805-100n"]);
    }

    #[test]
    fn test_led_color_is_case_insensitive() {
        let attrs = ComponentAttributes::of_type(ComponentType::Led)
            .with_size("0603")
            .with_color("Green");
        let catalog = catalog();
        let mpns = catalog.resolve(&catalog.match_ids(&attrs));
        assert_eq!(mpns, vec![Mpn::new("Kingbright", "APT1608SGC")]);
    }

    #[test]
    fn test_annotate_keeps_term() {
        let parser = FixedParser(Some(
            ComponentAttributes::of_type(ComponentType::Resistor)
                .with_size("0805")
                .with_value(10_000.0),
        ));
        let mut query = Query::term("10k 0805");
        catalog().annotate(&mut query, &parser);

        assert_eq!(query.search_term(), Some("10k 0805"));
        assert_eq!(query.shortcut_matches.len(), 2);
        assert!(query.attributes.is_some());
    }

    #[test]
    fn test_annotate_without_match_leaves_shortcuts_empty() {
        let parser = FixedParser(Some(ComponentAttributes::of_type(ComponentType::Other)));
        let mut query = Query::term("SPI FLASH SOIC");
        catalog().annotate(&mut query, &parser);
        assert!(query.shortcut_matches.is_empty());

        let mut mpn_query = Query::mpn(Mpn::new("Texas Instruments", "NE555P"));
        catalog().annotate(&mut mpn_query, &parser);
        assert!(mpn_query.attributes.is_none());
    }
}
