//! Earth sphere mesh.

use super::{Triangulation, Triangulator};
use crate::style::EncodedFeature;
use std::f32::consts::{PI, TAU};

/// Floats per earth vertex: position (3) followed by uv (2).
pub const EARTH_STRIDE: usize = 5;

/// UV sphere used by the earth and atmosphere models.
///
/// Vertex layout is `[x, y, z, u, v]`. The feature is ignored: the sphere is
/// the whole geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthTriangulator {
    pub radius: f32,
    pub lat_segments: u32,
    pub lon_segments: u32,
}

impl Default for EarthTriangulator {
    fn default() -> Self {
        Self {
            radius: 100.0,
            lat_segments: 32,
            lon_segments: 64,
        }
    }
}

impl EarthTriangulator {
    /// Builds the sphere mesh.
    pub fn sphere(&self) -> Triangulation {
        let lat_segments = self.lat_segments.max(3);
        let lon_segments = self.lon_segments.max(3);
        let vertex_count = ((lat_segments + 1) * (lon_segments + 1)) as usize;

        let mut vertices = Vec::with_capacity(vertex_count * EARTH_STRIDE);
        let mut normals = Vec::with_capacity(vertex_count * 3);
        let mut uvs = Vec::with_capacity(vertex_count * 2);

        for lat in 0..=lat_segments {
            let v = lat as f32 / lat_segments as f32;
            let theta = v * PI;
            let (sin_t, cos_t) = theta.sin_cos();

            for lon in 0..=lon_segments {
                let u = lon as f32 / lon_segments as f32;
                let phi = u * TAU;
                let (sin_p, cos_p) = phi.sin_cos();

                let x = sin_t * cos_p;
                let y = cos_t;
                let z = sin_t * sin_p;

                vertices.extend_from_slice(&[
                    x * self.radius,
                    y * self.radius,
                    z * self.radius,
                    u,
                    v,
                ]);
                normals.extend_from_slice(&[x, y, z]);
                uvs.extend_from_slice(&[u, v]);
            }
        }

        let stride = lon_segments + 1;
        let mut indices = Vec::with_capacity((lat_segments * lon_segments * 6) as usize);
        for lat in 0..lat_segments {
            for lon in 0..lon_segments {
                let i0 = lat * stride + lon;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;

                indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
            }
        }

        Triangulation {
            vertices,
            stride: EARTH_STRIDE,
            indices,
            normals: Some(normals),
            uvs: Some(uvs),
        }
    }
}

impl Triangulator for EarthTriangulator {
    fn name(&self) -> &'static str {
        "earth"
    }

    fn triangulate(&self, _feature: &EncodedFeature<'_>) -> Triangulation {
        self.sphere()
    }
}
