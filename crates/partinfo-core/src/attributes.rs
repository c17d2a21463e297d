//! Structured component attributes and the parser boundary.
//!
//! Turning free text like `10k 0805 1%` into attributes is the job of an
//! external grammar; partinfo only consumes the result through
//! [`AttributeParser`].

use serde::{Deserialize, Serialize};

/// Component category recognized by the attribute grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    /// Resistor
    Resistor,
    /// Capacitor
    Capacitor,
    /// Light-emitting diode
    Led,
    /// Any other category
    #[serde(other)]
    Other,
}

/// Attributes parsed from a free-text term.
///
/// Values use base units: ohms, farads, percent, watts, volts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentAttributes {
    /// Component category
    #[serde(rename = "type")]
    pub component_type: Option<ComponentType>,
    /// Package size code (e.g. `0805`)
    pub size: Option<String>,
    /// Resistance or capacitance
    pub value: Option<f64>,
    /// Tolerance in percent
    pub tolerance: Option<f64>,
    /// Power rating in watts
    pub power_rating: Option<f64>,
    /// Voltage rating in volts
    pub voltage_rating: Option<f64>,
    /// Color (LEDs)
    pub color: Option<String>,
    /// Leftover text the grammar did not understand
    pub ignored: Option<String>,
}

impl ComponentAttributes {
    /// Attributes for a component type with nothing else parsed.
    #[must_use]
    pub fn of_type(component_type: ComponentType) -> Self {
        Self {
            component_type: Some(component_type),
            ..Self::default()
        }
    }

    /// Set the package size.
    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Set the value.
    #[must_use]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the tolerance in percent.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Set the color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Boundary to the external attribute grammar.
pub trait AttributeParser: Send + Sync {
    /// Parse a term, or `None` when it is not recognizably a component.
    fn parse(&self, term: &str) -> Option<ComponentAttributes>;
}

/// Parser that never recognizes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttributeParser;

impl AttributeParser for NoAttributeParser {
    fn parse(&self, _term: &str) -> Option<ComponentAttributes> {
        None
    }
}
