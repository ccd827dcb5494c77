//! Atmosphere glow around the earth sphere.

use super::shaders::{ATMOSPHERE_FRAG, ATMOSPHERE_VERT};
use super::{size_attribute, LayerModel, ModelDescriptor};
use crate::gpu::{BlendConfig, DepthConfig};
use crate::style::{BufferUsage, StyleAttribute, StyleAttributeRegistry};
use crate::triangulation::{EarthTriangulator, Triangulator};

/// Z-index of the atmosphere. Drawn behind every map layer.
pub const ATMOSPHERE_Z_INDEX: i32 = -997;

/// Translucent shell drawn around the earth sphere.
///
/// Depth testing is off so the shell never occludes the globe.
#[derive(Debug, Clone, Default)]
pub struct AtmosphereModel {
    triangulator: EarthTriangulator,
}

impl AtmosphereModel {
    pub fn new(triangulator: EarthTriangulator) -> Self {
        Self { triangulator }
    }
}

impl LayerModel for AtmosphereModel {
    fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            module: "earthAtmoSphere",
            vertex_shader: ATMOSPHERE_VERT,
            fragment_shader: ATMOSPHERE_FRAG,
            depth: DepthConfig::disabled(),
            blend: BlendConfig::Normal,
            z_index: Some(ATMOSPHERE_Z_INDEX),
        }
    }

    fn triangulator(&self) -> &dyn Triangulator {
        &self.triangulator
    }

    fn register_attributes(&self, registry: &mut StyleAttributeRegistry) {
        registry.register(size_attribute());
        registry.register(StyleAttribute::new(
            "normal",
            "a_Normal",
            BufferUsage::Static,
            3,
            |_feature, _feature_idx, _vertex, _attribute_idx, normal| normal.to_vec(),
        ));
        registry.register(StyleAttribute::new(
            "uv",
            "a_Uv",
            BufferUsage::Dynamic,
            2,
            |_feature, _feature_idx, vertex, _attribute_idx, _normal| {
                vec![
                    vertex.get(3).copied().unwrap_or(0.0),
                    vertex.get(4).copied().unwrap_or(0.0),
                ]
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, FeatureCollection, Properties};
    use crate::gpu::{HeadlessBackend, RenderBackend, UniformValue};
    use crate::layer::LayerStyle;
    use crate::model::Model;
    use crate::style::StyleEncoding;
    use crate::view::FrameContext;
    use geo_types::{Geometry, Point};

    fn globe() -> FeatureCollection {
        vec![Feature::new(
            0,
            Geometry::Point(Point::new(0.0, 0.0)),
            Properties::new(),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_atmosphere_model() {
        let mut backend = HeadlessBackend::new();
        let features = globe();
        let encoded = StyleEncoding::default().encode(&features);
        let atmosphere = AtmosphereModel::default();

        let mut model = Model::build(&mut backend, &atmosphere, &encoded, 5).unwrap();
        assert_eq!(model.module(), "earthAtmoSphere");
        assert_eq!(model.z_index(), ATMOSPHERE_Z_INDEX);
        assert_eq!(model.index_count(), 32 * 64 * 6);

        let style = LayerStyle {
            opacity: 0.6,
            ..Default::default()
        };
        model
            .draw(&mut backend, &atmosphere.uniforms(&style, &FrameContext::default()))
            .unwrap();

        let draw = &backend.draws()[0];
        assert!(!draw.depth.enable);
        assert_eq!(draw.uniforms["u_opacity"], UniformValue::Float(0.6));
        assert_eq!(
            draw.attributes,
            vec!["a_Position", "a_Size", "a_Normal", "a_Uv"]
        );

        model.clear_models(&mut backend);
        assert_eq!(backend.live_resources(), 0);
    }
}
