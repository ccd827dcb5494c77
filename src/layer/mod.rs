//! Layers and the scene that renders them.
//!
//! A [`LayerSpec`] is a plain description: features, style scales, style
//! options and a z-index. The [`Scene`] owns added layers and turns each into
//! a GPU [`Model`](crate::model::Model) the first time it is rendered.

mod scene;

pub use scene::{RenderStats, Scene};

use crate::feature::{Feature, FeatureCollection, Properties};
use crate::gpu::RasterImage;
use crate::model::{
    AtmosphereModel, FillModel, LabelModel, LayerModel, LineModel, PointModel, RasterModel,
};
use crate::style::{StyleEncoding, StyleMapping};
use crate::triangulation::PointShape;
use eframe::egui::Color32;
use geo_types::{Geometry, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to a layer when it is added to a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Line rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    #[default]
    Solid,
    Dash,
}

/// Per-layer style options. Changing these never rebuilds the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerStyle {
    pub opacity: f32,
    pub line_type: LineType,
    /// Dash and gap length in points
    pub dash_array: [f32; 2],
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            line_type: LineType::Solid,
            dash_array: [0.0, 0.0],
        }
    }
}

/// What a layer draws.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Fill,
    Line,
    Point(PointShape),
    /// Image draped over the extent of the features
    Raster(RasterImage),
    /// Text overlay painted by the host
    Label(LabelModel),
    Atmosphere,
}

impl LayerKind {
    /// Shader model for the kind, or `None` for host-painted kinds.
    pub fn layer_model(&self) -> Option<Box<dyn LayerModel>> {
        match self {
            LayerKind::Fill => Some(Box::new(FillModel::default())),
            LayerKind::Line => Some(Box::new(LineModel::default())),
            LayerKind::Point(shape) => Some(Box::new(PointModel::new(*shape))),
            LayerKind::Raster(image) => Some(Box::new(RasterModel::new(image.clone()))),
            LayerKind::Atmosphere => Some(Box::new(AtmosphereModel::default())),
            LayerKind::Label(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Fill => "fill",
            LayerKind::Line => "line",
            LayerKind::Point(_) => "point",
            LayerKind::Raster(_) => "raster",
            LayerKind::Label(_) => "label",
            LayerKind::Atmosphere => "atmosphere",
        }
    }
}

/// Description of one layer, built with chained setters.
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub name: String,
    pub kind: LayerKind,
    pub features: FeatureCollection,
    pub encoding: StyleEncoding,
    pub style: LayerStyle,
    pub z_index: i32,
    pub visible: bool,
    /// Lowest zoom the layer is drawn at, inclusive
    pub min_zoom: Option<f32>,
    /// Highest zoom the layer is drawn at, exclusive
    pub max_zoom: Option<f32>,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, kind: LayerKind, features: FeatureCollection) -> Self {
        Self {
            name: name.into(),
            kind,
            features,
            encoding: StyleEncoding::default(),
            style: LayerStyle::default(),
            z_index: 0,
            visible: true,
            min_zoom: None,
            max_zoom: None,
        }
    }

    /// Raster layer covering `extent` (lon/lat degrees).
    pub fn raster(name: impl Into<String>, image: RasterImage, extent: Rect<f64>) -> Self {
        let features = FeatureCollection::new(vec![Feature::new(
            0,
            Geometry::Rect(extent),
            Properties::new(),
        )]);
        Self::new(name, LayerKind::Raster(image), features)
    }

    pub fn color(mut self, color: StyleMapping<Color32>) -> Self {
        self.encoding.color = color;
        self
    }

    pub fn size(mut self, size: StyleMapping<f32>) -> Self {
        self.encoding.size = size;
        self
    }

    pub fn shape(mut self, shape: StyleMapping<String>) -> Self {
        self.encoding.shape = Some(shape);
        self
    }

    pub fn style(mut self, style: LayerStyle) -> Self {
        self.style = style;
        self
    }

    pub fn z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Restricts drawing to zoom levels in `min..max`. `None` leaves a side open.
    pub fn zoom_range(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.min_zoom = min;
        self.max_zoom = max;
        self
    }

    /// True if the zoom range admits `zoom`.
    pub fn in_zoom_range(&self, zoom: f32) -> bool {
        self.min_zoom.map_or(true, |min| zoom >= min) && self.max_zoom.map_or(true, |max| zoom < max)
    }
}

/// Something layers can be added to and removed from.
pub trait RenderHost {
    fn add_layer(&mut self, layer: LayerSpec) -> LayerId;

    /// Removes a layer and schedules its GPU resources for release.
    /// Returns false if the id is unknown.
    fn remove_layer(&mut self, id: LayerId) -> bool;
}
