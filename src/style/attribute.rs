//! Style attribute registry.
//!
//! A style attribute declares one GPU vertex buffer (`a_Size`, `a_Normal`, ...)
//! and the function that fills it. When a model is built, every registered
//! update function runs once per vertex of every triangulated feature and its
//! output is appended to the attribute's buffer.

use super::{EncodedFeature, StyleError};
use crate::triangulation::Triangulator;
use std::fmt;
use std::sync::Arc;

/// Per-vertex update function.
///
/// Arguments: encoded feature, feature index, vertex data (one stride of the
/// triangulation), vertex index within the feature, and the vertex normal
/// (empty when the triangulation has none). Must return exactly `size` values.
pub type AttributeUpdate =
    Arc<dyn Fn(&EncodedFeature<'_>, usize, &[f32], usize, &[f32]) -> Vec<f32> + Send + Sync>;

/// GPU buffer usage hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once (`STATIC_DRAW`)
    Static,
    /// Rewritten when style changes (`DYNAMIC_DRAW`)
    Dynamic,
}

/// Scalar type of a buffer component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Float,
}

impl ScalarType {
    /// Size of one component in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            ScalarType::Float => std::mem::size_of::<f32>(),
        }
    }
}

/// Declaration of one vertex attribute and its update function.
#[derive(Clone)]
pub struct StyleAttribute {
    /// Registry name (`size`, `normal`, ...)
    pub name: String,
    /// Shader attribute name (`a_Size`, `a_Normal`, ...)
    pub buffer_name: String,
    pub usage: BufferUsage,
    pub scalar: ScalarType,
    /// Number of components per vertex
    pub size: usize,
    pub update: AttributeUpdate,
}

impl StyleAttribute {
    pub fn new(
        name: impl Into<String>,
        buffer_name: impl Into<String>,
        usage: BufferUsage,
        size: usize,
        update: impl Fn(&EncodedFeature<'_>, usize, &[f32], usize, &[f32]) -> Vec<f32>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            buffer_name: buffer_name.into(),
            usage,
            scalar: ScalarType::Float,
            size,
            update: Arc::new(update),
        }
    }

    /// Runs the update function and checks the returned length.
    pub fn evaluate(
        &self,
        feature: &EncodedFeature<'_>,
        feature_index: usize,
        vertex: &[f32],
        vertex_index: usize,
        normal: &[f32],
    ) -> Result<Vec<f32>, StyleError> {
        let values = (self.update)(feature, feature_index, vertex, vertex_index, normal);
        if values.len() != self.size {
            return Err(StyleError::AttributeSize {
                name: self.name.clone(),
                expected: self.size,
                actual: values.len(),
            });
        }
        Ok(values)
    }
}

impl fmt::Debug for StyleAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleAttribute")
            .field("name", &self.name)
            .field("buffer_name", &self.buffer_name)
            .field("usage", &self.usage)
            .field("scalar", &self.scalar)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Flat data for one attribute, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBuffer {
    pub buffer_name: String,
    pub usage: BufferUsage,
    pub size: usize,
    pub data: Vec<f32>,
}

/// All attribute buffers plus the index buffer of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffers {
    pub attributes: Vec<AttributeBuffer>,
    pub indices: Vec<u32>,
    pub vertex_count: usize,
}

impl GeometryBuffers {
    /// Returns the buffer for a shader attribute name.
    pub fn attribute(&self, buffer_name: &str) -> Option<&AttributeBuffer> {
        self.attributes.iter().find(|a| a.buffer_name == buffer_name)
    }
}

/// Registry of the style attributes of one model type.
///
/// Registration order is buffer order. Registering a name again replaces the
/// previous descriptor in place.
#[derive(Debug, Clone)]
pub struct StyleAttributeRegistry {
    attributes: Vec<StyleAttribute>,
}

impl Default for StyleAttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleAttributeRegistry {
    /// Creates a registry holding the builtin `position` attribute.
    pub fn new() -> Self {
        let mut registry = Self {
            attributes: Vec::new(),
        };
        registry.register(StyleAttribute::new(
            "position",
            "a_Position",
            BufferUsage::Static,
            3,
            |_feature, _feature_idx, vertex, _attribute_idx, _normal| {
                vec![
                    vertex.first().copied().unwrap_or(0.0),
                    vertex.get(1).copied().unwrap_or(0.0),
                    vertex.get(2).copied().unwrap_or(0.0),
                ]
            },
        ));
        registry
    }

    /// Registers an attribute, replacing any attribute with the same name.
    pub fn register(&mut self, attribute: StyleAttribute) {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => {
                log::debug!("Replacing style attribute '{}'", attribute.name);
                *existing = attribute;
            }
            None => self.attributes.push(attribute),
        }
    }

    pub fn get(&self, name: &str) -> Option<&StyleAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attributes(&self) -> &[StyleAttribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Triangulates every feature and fills one buffer per attribute.
    ///
    /// Indices of each feature are offset by the vertices emitted before it,
    /// so the result is a single indexed mesh.
    pub fn build_buffers(
        &self,
        features: &[EncodedFeature<'_>],
        triangulator: &dyn Triangulator,
    ) -> Result<GeometryBuffers, StyleError> {
        let mut buffers = GeometryBuffers {
            attributes: self
                .attributes
                .iter()
                .map(|a| AttributeBuffer {
                    buffer_name: a.buffer_name.clone(),
                    usage: a.usage,
                    size: a.size,
                    data: Vec::new(),
                })
                .collect(),
            indices: Vec::new(),
            vertex_count: 0,
        };

        for (feature_index, feature) in features.iter().enumerate() {
            let triangulation = triangulator.triangulate(feature);
            if triangulation.is_empty() {
                continue;
            }

            let base = buffers.vertex_count as u32;
            for vertex_index in 0..triangulation.vertex_count() {
                let vertex = triangulation.vertex(vertex_index);
                let normal = triangulation.normal(vertex_index);

                for (attribute, buffer) in self.attributes.iter().zip(buffers.attributes.iter_mut()) {
                    let values =
                        attribute.evaluate(feature, feature_index, vertex, vertex_index, normal)?;
                    buffer.data.extend_from_slice(&values);
                }
            }

            buffers
                .indices
                .extend(triangulation.indices.iter().map(|i| base + i));
            buffers.vertex_count += triangulation.vertex_count();
        }

        Ok(buffers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Properties};
    use crate::triangulation::{LineTriangulator, Triangulation};
    use geo_types::{line_string, Geometry};

    struct QuadTriangulator;

    impl Triangulator for QuadTriangulator {
        fn name(&self) -> &'static str {
            "quad"
        }

        fn triangulate(&self, _feature: &EncodedFeature<'_>) -> Triangulation {
            Triangulation {
                vertices: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
                stride: 2,
                indices: vec![0, 1, 2, 0, 2, 3],
                normals: None,
                uvs: None,
            }
        }
    }

    fn line_feature(id: u64) -> Feature {
        Feature::new(
            id,
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
            Properties::new(),
        )
    }

    #[test]
    fn test_reregistration_replaces_in_place() {
        let mut registry = StyleAttributeRegistry::new();
        registry.register(StyleAttribute::new("size", "a_Size", BufferUsage::Dynamic, 1, |f, _, _, _, _| vec![f.size]));
        registry.register(StyleAttribute::new("color", "a_Color", BufferUsage::Dynamic, 4, |f, _, _, _, _| f.color.to_vec()));
        registry.register(StyleAttribute::new("size", "a_Size", BufferUsage::Static, 1, |_, _, _, _, _| vec![7.0]));

        let names: Vec<_> = registry.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["position", "size", "color"]);
        assert_eq!(registry.get("size").unwrap().usage, BufferUsage::Static);
    }

    #[test]
    fn test_build_buffers_offsets_indices() {
        let features = [line_feature(0), line_feature(1)];
        let encoded: Vec<_> = features
            .iter()
            .enumerate()
            .map(|(i, f)| EncodedFeature::plain(i, f))
            .collect();

        let mut registry = StyleAttributeRegistry::new();
        registry.register(StyleAttribute::new("feature", "a_Feature", BufferUsage::Static, 1, |_, idx, _, _, _| vec![idx as f32]));

        let buffers = registry.build_buffers(&encoded, &QuadTriangulator).unwrap();
        assert_eq!(buffers.vertex_count, 8);
        assert_eq!(buffers.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);

        let position = buffers.attribute("a_Position").unwrap();
        assert_eq!(position.data.len(), 8 * 3);
        assert_eq!(&position.data[3..6], &[1.0, 0.0, 0.0]);

        let feature = buffers.attribute("a_Feature").unwrap();
        assert_eq!(feature.data, vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_wrong_update_length_is_rejected() {
        let features = [line_feature(0)];
        let encoded = vec![EncodedFeature::plain(0, &features[0])];

        let mut registry = StyleAttributeRegistry::new();
        registry.register(StyleAttribute::new("uv", "a_Uv", BufferUsage::Dynamic, 2, |_, _, _, _, _| vec![0.0]));

        match registry.build_buffers(&encoded, &LineTriangulator) {
            Err(StyleError::AttributeSize {
                name,
                expected,
                actual,
            }) => {
                assert_eq!(name, "uv");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected size error, got {:?}", other),
        }
    }
}
