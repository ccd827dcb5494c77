//! Feature encoding: evaluates a layer's style scales once per feature.

use super::{color_to_rgba, StyleMapping};
use crate::feature::{Feature, FeatureCollection};
use eframe::egui::Color32;

/// A feature together with its evaluated style values.
///
/// This is what triangulators and attribute update functions see.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeature<'a> {
    /// Position of the feature in its collection
    pub index: usize,
    /// The source feature
    pub feature: &'a Feature,
    /// Unmultiplied RGBA color in `0.0..=1.0`
    pub color: [f32; 4],
    /// Size in pixels (line width, point radius)
    pub size: f32,
    /// Shape name, if the layer maps one
    pub shape: Option<String>,
}

impl<'a> EncodedFeature<'a> {
    /// Encodes a feature with default style values (white, size 1, no shape).
    pub fn plain(index: usize, feature: &'a Feature) -> Self {
        Self {
            index,
            feature,
            color: [1.0, 1.0, 1.0, 1.0],
            size: 1.0,
            shape: None,
        }
    }
}

/// Style scales applied to each feature of a layer.
#[derive(Debug, Clone)]
pub struct StyleEncoding {
    pub color: StyleMapping<Color32>,
    pub size: StyleMapping<f32>,
    pub shape: Option<StyleMapping<String>>,
}

impl Default for StyleEncoding {
    fn default() -> Self {
        Self {
            color: StyleMapping::Constant(Color32::WHITE),
            size: StyleMapping::Constant(1.0),
            shape: None,
        }
    }
}

impl StyleEncoding {
    /// Evaluates the scales for every feature of a collection, in order.
    pub fn encode<'a>(&self, features: &'a FeatureCollection) -> Vec<EncodedFeature<'a>> {
        features
            .iter()
            .enumerate()
            .map(|(index, feature)| EncodedFeature {
                index,
                feature,
                color: color_to_rgba(self.color.map(feature)),
                size: self.size.map(feature),
                shape: self.shape.as_ref().map(|s| s.map(feature)),
            })
            .collect()
    }
}
