//! Style binding: colors, per-feature scales and GPU vertex attributes.
//!
//! Data flows through this module in two steps:
//! 1. `StyleEncoding` evaluates a layer's scales once per feature
//! 2. `StyleAttributeRegistry` turns encoded features into vertex buffers

mod attribute;
mod color;
mod encode;
mod scale;

pub use attribute::{
    AttributeBuffer, AttributeUpdate, BufferUsage, GeometryBuffers, ScalarType, StyleAttribute,
    StyleAttributeRegistry,
};
pub use color::{color_to_rgba, format_color, parse_color, serde_color};
pub use encode::{EncodedFeature, StyleEncoding};
pub use scale::{ClassFn, FeatureFn, StyleMapping};

/// Errors raised while binding styles.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleError {
    /// An update function returned the wrong number of components.
    AttributeSize {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// A scale was constructed with unusable parameters.
    InvalidScale(String),
}

impl std::fmt::Display for StyleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleError::AttributeSize {
                name,
                expected,
                actual,
            } => write!(
                f,
                "Attribute '{}' returned {} components, expected {}",
                name, actual, expected
            ),
            StyleError::InvalidScale(msg) => write!(f, "Invalid scale: {}", msg),
        }
    }
}

impl std::error::Error for StyleError {}
