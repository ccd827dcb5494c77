//! Triangulation of feature geometry into indexed vertex data.
//!
//! A triangulator turns one encoded feature into a small indexed mesh. The
//! style attribute registry then walks the mesh vertex by vertex, so the
//! vertex layout (`stride`) of a triangulator is part of its contract with
//! the attribute update functions of the model that uses it.

mod earth;
mod fill;
mod line;
mod point;
mod raster;

pub use earth::EarthTriangulator;
pub use fill::FillTriangulator;
pub use line::LineTriangulator;
pub use point::{PointShape, PointTriangulator};
pub use raster::RasterTriangulator;

use crate::style::EncodedFeature;

/// Indexed mesh for one feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triangulation {
    /// Interleaved vertex data, `stride` floats per vertex
    pub vertices: Vec<f32>,
    /// Floats per vertex
    pub stride: usize,
    /// Triangle list indices into the vertices
    pub indices: Vec<u32>,
    /// Optional per-vertex normals, 3 floats per vertex
    pub normals: Option<Vec<f32>>,
    /// Optional per-vertex texture coordinates, 2 floats per vertex
    pub uvs: Option<Vec<f32>>,
}

impl Triangulation {
    /// Creates an empty mesh with the given vertex layout.
    pub fn empty(stride: usize) -> Self {
        Self {
            stride,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.vertices.len() / self.stride
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0 || self.indices.is_empty()
    }

    /// Returns the data of one vertex.
    pub fn vertex(&self, index: usize) -> &[f32] {
        &self.vertices[index * self.stride..(index + 1) * self.stride]
    }

    /// Returns the normal of one vertex, or an empty slice if the mesh has none.
    pub fn normal(&self, index: usize) -> &[f32] {
        match &self.normals {
            Some(normals) => &normals[index * 3..index * 3 + 3],
            None => &[],
        }
    }

    /// Returns true if every index refers to an existing vertex.
    pub fn indices_in_bounds(&self) -> bool {
        let count = self.vertex_count() as u32;
        self.indices.iter().all(|&i| i < count)
    }
}

/// Converts a feature into a mesh.
///
/// Implementations must be deterministic: the same feature and parameters
/// always produce the same arrays.
pub trait Triangulator: Send + Sync {
    /// Shape name used in logs.
    fn name(&self) -> &'static str;

    fn triangulate(&self, feature: &EncodedFeature<'_>) -> Triangulation;
}
