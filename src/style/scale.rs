//! Per-feature style scales.
//!
//! A scale maps a feature to a style value (color, size, shape). Layers hold
//! one scale per styled channel and evaluate it once per feature when their
//! buffers are built.

use super::StyleError;
use crate::feature::{BorderClass, Feature};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback evaluated against the whole feature.
pub type FeatureFn<T> = Arc<dyn Fn(&Feature) -> T + Send + Sync>;

/// Callback evaluated against the feature's boundary class.
pub type ClassFn<T> = Arc<dyn Fn(BorderClass) -> T + Send + Sync>;

/// Maps features to a style value.
#[derive(Clone)]
pub enum StyleMapping<T> {
    /// Same value for every feature
    Constant(T),
    /// Value chosen by boundary class
    ByClass(ClassFn<T>),
    /// Numeric field split into equal-width buckets over `domain`
    Quantize {
        field: String,
        domain: (f64, f64),
        range: Vec<T>,
    },
    /// String field looked up in a table
    Category {
        field: String,
        values: HashMap<String, T>,
        fallback: T,
    },
    /// Arbitrary callback
    Callback(FeatureFn<T>),
}

impl<T: Clone> StyleMapping<T> {
    pub fn constant(value: T) -> Self {
        StyleMapping::Constant(value)
    }

    pub fn by_class(f: impl Fn(BorderClass) -> T + Send + Sync + 'static) -> Self {
        StyleMapping::ByClass(Arc::new(f))
    }

    pub fn callback(f: impl Fn(&Feature) -> T + Send + Sync + 'static) -> Self {
        StyleMapping::Callback(Arc::new(f))
    }

    /// Creates a quantize scale. The range must be non-empty and the domain increasing.
    pub fn quantize(
        field: impl Into<String>,
        domain: (f64, f64),
        range: Vec<T>,
    ) -> Result<Self, StyleError> {
        if range.is_empty() {
            return Err(StyleError::InvalidScale(
                "quantize range must not be empty".to_string(),
            ));
        }
        if !(domain.0 < domain.1) {
            return Err(StyleError::InvalidScale(format!(
                "quantize domain must be increasing, got [{}, {}]",
                domain.0, domain.1
            )));
        }

        Ok(StyleMapping::Quantize {
            field: field.into(),
            domain,
            range,
        })
    }

    pub fn category(field: impl Into<String>, values: HashMap<String, T>, fallback: T) -> Self {
        StyleMapping::Category {
            field: field.into(),
            values,
            fallback,
        }
    }

    /// Evaluates the scale for a feature.
    pub fn map(&self, feature: &Feature) -> T {
        match self {
            StyleMapping::Constant(value) => value.clone(),
            StyleMapping::ByClass(f) => f(feature.border_class),
            StyleMapping::Quantize {
                field,
                domain,
                range,
            } => {
                let index = feature
                    .property_f64(field)
                    .map(|v| quantize_index(v, *domain, range.len()))
                    .unwrap_or(0);
                range[index].clone()
            }
            StyleMapping::Category {
                field,
                values,
                fallback,
            } => feature
                .property_string(field)
                .and_then(|key| values.get(&key).cloned())
                .unwrap_or_else(|| fallback.clone()),
            StyleMapping::Callback(f) => f(feature),
        }
    }

    /// Returns true if every feature gets the same value.
    pub fn is_constant(&self) -> bool {
        matches!(self, StyleMapping::Constant(_))
    }
}

/// Bucket index for `value` in `n` equal-width buckets over `domain`, clamped.
fn quantize_index(value: f64, domain: (f64, f64), n: usize) -> usize {
    if value.is_nan() {
        return 0;
    }
    let t = (value - domain.0) / (domain.1 - domain.0);
    let index = (t * n as f64).floor();
    index.clamp(0.0, (n - 1) as f64) as usize
}

impl<T: fmt::Debug> fmt::Debug for StyleMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleMapping::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            StyleMapping::ByClass(_) => f.write_str("ByClass(..)"),
            StyleMapping::Quantize {
                field,
                domain,
                range,
            } => f
                .debug_struct("Quantize")
                .field("field", field)
                .field("domain", domain)
                .field("range", range)
                .finish(),
            StyleMapping::Category {
                field, fallback, ..
            } => f
                .debug_struct("Category")
                .field("field", field)
                .field("fallback", fallback)
                .finish_non_exhaustive(),
            StyleMapping::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}
