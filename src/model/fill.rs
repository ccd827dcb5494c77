//! Polygon fill model.

use super::shaders::{FILL_FRAG, FILL_VERT};
use super::{color_attribute, LayerModel, ModelDescriptor};
use crate::gpu::{BlendConfig, DepthConfig};
use crate::style::StyleAttributeRegistry;
use crate::triangulation::{FillTriangulator, Triangulator};

/// Draws tessellated polygons in their encoded color.
#[derive(Debug, Clone, Default)]
pub struct FillModel {
    triangulator: FillTriangulator,
}

impl LayerModel for FillModel {
    fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            module: "fill",
            vertex_shader: FILL_VERT,
            fragment_shader: FILL_FRAG,
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
    }
}
