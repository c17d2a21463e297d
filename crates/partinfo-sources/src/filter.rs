//! Attribute filters built from parsed component attributes.
//!
//! Tolerances are an upper bound and ratings a lower bound, so both expand to
//! the set of known catalog values that satisfy the request.

use partinfo_core::{ComponentAttributes, ComponentType};
use serde::{Deserialize, Serialize};

/// Tolerance values used by part catalogs, in percent.
pub const TOLERANCES: &[f64] = &[
    0.01, 0.02, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0,
];

/// Power ratings used by part catalogs, in watts.
pub const POWER_RATINGS: &[f64] = &[
    0.031_25, 0.05, 0.062_5, 0.1, 0.125, 0.25, 0.333, 0.5, 0.75, 1.0, 2.0, 3.0, 5.0,
];

/// Voltage ratings used by part catalogs, in volts.
pub const VOLTAGE_RATINGS: &[f64] = &[
    4.0, 6.3, 10.0, 16.0, 25.0, 35.0, 50.0, 63.0, 100.0, 200.0, 250.0, 400.0, 450.0, 500.0,
    630.0, 1000.0,
];

const EPSILON: f64 = 1e-9;

/// A spec field a search can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    /// Package size code
    CasePackage,
    /// Resistance in ohms
    Resistance,
    /// Capacitance in farads
    Capacitance,
    /// Resistor tolerance
    ResistanceTolerance,
    /// Capacitor tolerance
    CapacitanceTolerance,
    /// Power rating in watts
    PowerRating,
    /// Voltage rating in volts
    VoltageRating,
    /// LED color
    Color,
}

impl FilterField {
    /// Spec key, as providers name it.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::CasePackage => "case_package",
            Self::Resistance => "resistance",
            Self::Capacitance => "capacitance",
            Self::ResistanceTolerance => "resistance_tolerance",
            Self::CapacitanceTolerance => "capacitance_tolerance",
            Self::PowerRating => "power_rating",
            Self::VoltageRating => "voltage_rating",
            Self::Color => "color",
        }
    }
}

/// Restrict a spec field to any of a set of values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeFilter {
    /// Field being filtered
    pub field: FilterField,
    /// Accepted values, formatted as providers display them
    pub values: Vec<String>,
}

impl AttributeFilter {
    /// Create a filter.
    #[must_use]
    pub fn new(field: FilterField, values: Vec<String>) -> Self {
        Self { field, values }
    }

    /// Compact, order-preserving cache key fragment.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}={}", self.field.key(), self.values.join(","))
    }
}

/// Known tolerances no worse than `requested`, formatted `±1%`.
#[must_use]
pub fn tolerances_within(requested: f64) -> Vec<String> {
    TOLERANCES
        .iter()
        .filter(|t| **t <= requested + EPSILON)
        .map(|t| format!("±{t}%"))
        .collect()
}

/// Known ratings at least `requested`.
#[must_use]
pub fn ratings_at_least(known: &[f64], requested: f64) -> Vec<String> {
    known
        .iter()
        .filter(|r| **r + EPSILON >= requested)
        .map(ToString::to_string)
        .collect()
}

/// Build provider filters from parsed attributes.
///
/// Bounds that no known catalog value satisfies produce no filter.
#[must_use]
pub fn build_filters(attributes: &ComponentAttributes) -> Vec<AttributeFilter> {
    let mut filters = Vec::new();
    let mut push = |field: FilterField, values: Vec<String>| {
        if !values.is_empty() {
            filters.push(AttributeFilter::new(field, values));
        }
    };

    if let Some(size) = &attributes.size {
        push(FilterField::CasePackage, vec![size.clone()]);
    }

    let (value_field, tolerance_field) = match attributes.component_type {
        Some(ComponentType::Resistor) => (
            Some(FilterField::Resistance),
            Some(FilterField::ResistanceTolerance),
        ),
        Some(ComponentType::Capacitor) => (
            Some(FilterField::Capacitance),
            Some(FilterField::CapacitanceTolerance),
        ),
        _ => (None, None),
    };

    if let (Some(field), Some(value)) = (value_field, attributes.value) {
        push(field, vec![value.to_string()]);
    }
    if let (Some(field), Some(tolerance)) = (tolerance_field, attributes.tolerance) {
        push(field, tolerances_within(tolerance));
    }
    if let Some(power) = attributes.power_rating {
        push(FilterField::PowerRating, ratings_at_least(POWER_RATINGS, power));
    }
    if let Some(voltage) = attributes.voltage_rating {
        push(
            FilterField::VoltageRating,
            ratings_at_least(VOLTAGE_RATINGS, voltage),
        );
    }
    if let Some(color) = &attributes.color {
        push(FilterField::Color, vec![color.to_lowercase()]);
    }

    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_is_an_upper_bound() {
        let values = tolerances_within(1.0);
        assert!(values.contains(&"±0.1%".to_string()));
        assert!(values.contains(&"±0.5%".to_string()));
        assert!(values.contains(&"±1%".to_string()));
        assert!(!values.contains(&"±2%".to_string()));
    }

    #[test]
    fn test_ratings_are_a_lower_bound() {
        let values = ratings_at_least(VOLTAGE_RATINGS, 50.0);
        assert_eq!(values.first().map(String::as_str), Some("50"));
        assert!(!values.contains(&"35".to_string()));
        assert!(values.contains(&"1000".to_string()));
    }

    #[test]
    fn test_resistor_filters() {
        let attrs = ComponentAttributes::of_type(ComponentType::Resistor)
            .with_size("0805")
            .with_value(10_000.0)
            .with_tolerance(1.0);

        let filters = build_filters(&attrs);
        let fields: Vec<_> = filters.iter().map(|f| f.field).collect();
        assert_eq!(
            fields,
            vec![
                FilterField::CasePackage,
                FilterField::Resistance,
                FilterField::ResistanceTolerance,
            ]
        );
        assert_eq!(filters[1].values, vec!["10000".to_string()]);
    }

    #[test]
    fn test_capacitor_uses_capacitance_fields() {
        let attrs = ComponentAttributes::of_type(ComponentType::Capacitor)
            .with_value(1e-7)
            .with_tolerance(10.0);

        let filters = build_filters(&attrs);
        assert_eq!(filters[0].field, FilterField::Capacitance);
        assert_eq!(filters[1].field, FilterField::CapacitanceTolerance);
    }

    #[test]
    fn test_led_filters_on_color_not_value() {
        let attrs = ComponentAttributes::of_type(ComponentType::Led)
            .with_size("0603")
            .with_value(1.0)
            .with_color("Red");

        let filters = build_filters(&attrs);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1], AttributeFilter::new(FilterField::Color, vec!["red".into()]));
    }

    #[test]
    fn test_unsatisfiable_bound_adds_no_filter() {
        let attrs = ComponentAttributes::of_type(ComponentType::Resistor).with_tolerance(0.001);
        assert!(build_filters(&attrs).is_empty());
    }
}
