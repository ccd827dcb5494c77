//! Boundary classification codes.

use super::Properties;
use serde_json::Value;

/// Classification of a boundary line feature.
///
/// Boundary datasets tag every line with a `type` code. The code is resolved
/// once when the feature is loaded so that styling never compares strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderClass {
    /// National border (code `"0"`)
    National,
    /// Province border (code `"1"`)
    Province,
    /// Coastline (code `"2"`)
    Coastline,
    /// Emphasized border, e.g. special administrative regions (code `"3"`)
    Emphasized,
    /// Undetermined border (code `"4"`)
    Undetermined,
    /// Any other or missing code
    #[default]
    Unknown,
}

impl BorderClass {
    /// Property key holding the classification code.
    pub const PROPERTY: &'static str = "type";

    /// Resolves a classification code string. Codes must match exactly.
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => BorderClass::National,
            "1" => BorderClass::Province,
            "2" => BorderClass::Coastline,
            "3" => BorderClass::Emphasized,
            "4" => BorderClass::Undetermined,
            _ => BorderClass::Unknown,
        }
    }

    /// Resolves a JSON property value. Integer codes are accepted as well as strings.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::from_code(s),
            Value::Number(n) => n
                .as_u64()
                .map(|code| Self::from_code(&code.to_string()))
                .unwrap_or_default(),
            _ => BorderClass::Unknown,
        }
    }

    /// Resolves the class of a feature from its properties.
    pub fn from_properties(properties: &Properties) -> Self {
        properties
            .get(Self::PROPERTY)
            .map(Self::from_value)
            .unwrap_or_default()
    }

    /// Returns the source code for this class, if it has one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            BorderClass::National => Some("0"),
            BorderClass::Province => Some("1"),
            BorderClass::Coastline => Some("2"),
            BorderClass::Emphasized => Some("3"),
            BorderClass::Undetermined => Some("4"),
            BorderClass::Unknown => None,
        }
    }

    /// Returns true for the classes drawn by the dashed province layer
    /// (codes `"1"` and `"4"`).
    pub fn is_province_group(&self) -> bool {
        matches!(self, BorderClass::Province | BorderClass::Undetermined)
    }
}
