//! Line model, solid or dashed.

use super::shaders::{LINE_FRAG, LINE_VERT};
use super::{color_attribute, frame_uniforms, size_attribute, LayerModel, ModelDescriptor};
use crate::gpu::{BlendConfig, DepthConfig, UniformValue, Uniforms};
use crate::layer::{LayerStyle, LineType};
use crate::style::{BufferUsage, StyleAttribute, StyleAttributeRegistry};
use crate::triangulation::{LineTriangulator, Triangulator};
use crate::view::FrameContext;

/// Draws extruded line quads. Width comes from the encoded size, in points.
#[derive(Debug, Clone, Default)]
pub struct LineModel {
    triangulator: LineTriangulator,
}

impl LayerModel for LineModel {
    fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            module: "line",
            vertex_shader: LINE_VERT,
            fragment_shader: LINE_FRAG,
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
            "normal",
            "a_Normal",
            BufferUsage::Static,
            3,
            |_feature, _feature_idx, _vertex, _attribute_idx, normal| normal.to_vec(),
        ));
        registry.register(StyleAttribute::new(
            "distance",
            "a_Distance",
            BufferUsage::Static,
            1,
            |_feature, _feature_idx, vertex, _attribute_idx, _normal| {
                vec![vertex.get(3).copied().unwrap_or(0.0)]
            },
        ));
    }

    fn uniforms(&self, style: &LayerStyle, frame: &FrameContext) -> Uniforms {
        let mut uniforms = frame_uniforms(style, frame);
        let dashed = style.line_type == LineType::Dash;
        uniforms.insert(
            "u_dashed".to_string(),
            UniformValue::Float(if dashed { 1.0 } else { 0.0 }),
        );
        uniforms.insert(
            "u_dash_array".to_string(),
            UniformValue::Vec2(style.dash_array),
        );
        uniforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Properties};
    use crate::style::EncodedFeature;
    use crate::view::MapView;
    use geo_types::{line_string, Geometry};

    #[test]
    fn test_attributes_match_declared_sizes() {
        let feature = Feature::new(
            0,
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 3.0)]),
            Properties::new(),
        );
        let encoded = [EncodedFeature::plain(0, &feature)];

        let model = LineModel::default();
        let mut registry = StyleAttributeRegistry::new();
        model.register_attributes(&mut registry);
        let buffers = registry
            .build_buffers(&encoded, model.triangulator())
            .unwrap();

        for attribute in &buffers.attributes {
            assert_eq!(attribute.data.len(), buffers.vertex_count * attribute.size);
        }
        let distance = buffers.attribute("a_Distance").unwrap();
        assert_eq!(distance.data.last(), Some(&5.0));
    }

    #[test]
    fn test_dash_uniforms() {
        let model = LineModel::default();
        let style = LayerStyle {
            line_type: LineType::Dash,
            dash_array: [2.0, 2.0],
            ..Default::default()
        };
        let uniforms = model.uniforms(&style, &FrameContext::default());
        assert_eq!(uniforms["u_dashed"], UniformValue::Float(1.0));
        assert_eq!(uniforms["u_dash_array"], UniformValue::Vec2([2.0, 2.0]));

        let solid = model.uniforms(&LayerStyle::default(), &FrameContext::default());
        assert_eq!(solid["u_dashed"], UniformValue::Float(0.0));
    }

    #[test]
    fn test_extrusion_stays_perpendicular_on_screen() {
        let frame = MapView::new(60.0, 10.0).frame();
        let model = LineModel::default();
        let uniforms = model.uniforms(&LayerStyle::default(), &frame);
        let UniformValue::Vec2([px, py]) = uniforms["u_PixelsPerDegree"] else {
            panic!("missing u_PixelsPerDegree");
        };

        let feature = Feature::new(
            0,
            Geometry::LineString(line_string![(x: 10.0, y: 60.0), (x: 11.0, y: 61.0)]),
            Properties::new(),
        );
        let mesh = model
            .triangulator()
            .triangulate(&EncodedFeature::plain(0, &feature));
        let normal = mesh.normal(0);

        // Segment direction in screen points
        let (dx, dy) = (px, py);
        // Same mapping as the vertex shader before renormalizing
        let (nx, ny) = (normal[0] / px, normal[1] / py);
        assert!((dx * nx + dy * ny).abs() < 1e-4);

        // The raw degree-space normal would be skewed at this latitude
        assert!((dx * normal[0] + dy * normal[1]).abs() > 1.0);
    }
}
