//! Raster image model.

use super::shaders::{RASTER_FRAG, RASTER_VERT};
use super::{LayerModel, ModelDescriptor};
use crate::gpu::{BlendConfig, DepthConfig, RasterImage};
use crate::style::{BufferUsage, StyleAttribute, StyleAttributeRegistry};
use crate::triangulation::{RasterTriangulator, Triangulator};

/// Drapes an image over the extent of the layer's features.
///
/// The image is uploaded once when the model is built and sampled through
/// `u_texture`.
#[derive(Debug, Clone)]
pub struct RasterModel {
    image: RasterImage,
    triangulator: RasterTriangulator,
}

impl RasterModel {
    pub fn new(image: RasterImage) -> Self {
        Self {
            image,
            triangulator: RasterTriangulator,
        }
    }
}

impl LayerModel for RasterModel {
    fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            module: "raster",
            vertex_shader: RASTER_VERT,
            fragment_shader: RASTER_FRAG,
            depth: DepthConfig::disabled(),
            blend: BlendConfig::Normal,
            z_index: None,
        }
    }

    fn triangulator(&self) -> &dyn Triangulator {
        &self.triangulator
    }

    fn register_attributes(&self, registry: &mut StyleAttributeRegistry) {
        registry.register(StyleAttribute::new(
            "uv",
            "a_Uv",
            BufferUsage::Static,
            2,
            |_feature, _feature_idx, vertex, _attribute_idx, _normal| {
                vec![
                    vertex.get(3).copied().unwrap_or(0.0),
                    vertex.get(4).copied().unwrap_or(0.0),
                ]
            },
        ));
    }

    fn texture(&self) -> Option<&RasterImage> {
        Some(&self.image)
    }
}
