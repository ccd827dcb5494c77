//! Point marker model.

use super::shaders::{POINT_FRAG, POINT_VERT};
use super::{color_attribute, size_attribute, LayerModel, ModelDescriptor};
use crate::gpu::{BlendConfig, DepthConfig};
use crate::style::{BufferUsage, StyleAttribute, StyleAttributeRegistry};
use crate::triangulation::{PointShape, PointTriangulator, Triangulator};

/// Draws one marker per point, sized in points by the encoded size.
#[derive(Debug, Clone, Default)]
pub struct PointModel {
    triangulator: PointTriangulator,
}

impl PointModel {
    /// Creates a model whose markers default to `shape`.
    pub fn new(shape: PointShape) -> Self {
        Self {
            triangulator: PointTriangulator::new(shape),
        }
    }
}

impl LayerModel for PointModel {
    fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            module: "point",
            vertex_shader: POINT_VERT,
            fragment_shader: POINT_FRAG,
            depth: DepthConfig::disabled(),
            blend: BlendConfig::Normal,
            z_index: None,
        }
    }

    fn triangulator(&self) -> &dyn Triangulator {
        &self.triangulator
    }

    fn register_attributes(&self, registry: &mut StyleAttributeRegistry) {
        registry.register(color_attribute());
        registry.register(size_attribute());
        registry.register(StyleAttribute::new(
            "extrude",
            "a_Extrude",
            BufferUsage::Static,
            3,
            |_feature, _feature_idx, _vertex, _attribute_idx, normal| normal.to_vec(),
        ));
    }
}
