//! Text labels. Labels are not drawn on the GPU; the host paints them with
//! its own text renderer at the anchors computed here.

use crate::feature::FeatureCollection;
use eframe::egui::Color32;
use geo_types::Coord;

/// One label to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    /// Anchor in lon/lat degrees
    pub anchor: Coord<f64>,
    /// Font size in points
    pub size: f32,
    pub color: Color32,
}

/// Label placement for a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelModel {
    /// Property holding the label text
    pub field: String,
    pub size: f32,
    pub color: Color32,
}

impl LabelModel {
    pub fn new(field: impl Into<String>, size: f32, color: Color32) -> Self {
        Self {
            field: field.into(),
            size,
            color,
        }
    }

    /// Computes one label per feature that has both text and geometry.
    pub fn labels(&self, features: &FeatureCollection) -> Vec<Label> {
        features
            .iter()
            .filter_map(|feature| {
                let text = feature.property_string(&self.field)?;
                if text.trim().is_empty() {
                    return None;
                }
                Some(Label {
                    text,
                    anchor: feature.anchor()?,
                    size: self.size,
                    color: self.color,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Properties};
    use geo_types::{Geometry, Point};
    use serde_json::json;

    #[test]
    fn test_labels_skip_missing_text() {
        let features: FeatureCollection = [Some("北京市"), None, Some(" ")]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut props = Properties::new();
                if let Some(name) = name {
                    props.insert("NAME_CHN".to_string(), json!(name));
                }
                Feature::new(i as u64, Geometry::Point(Point::new(116.4, 39.9)), props)
            })
            .collect();

        let labels = LabelModel::new("NAME_CHN", 8.0, Color32::BLACK).labels(&features);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "北京市");
        assert_eq!(labels[0].anchor, Coord { x: 116.4, y: 39.9 });
        assert_eq!(labels[0].size, 8.0);
    }
}
