//! Textured quad covering a raster's extent.

use super::{Triangulation, Triangulator};
use crate::style::EncodedFeature;

/// Floats per raster vertex: position (3) followed by texture coordinates (2).
pub const RASTER_STRIDE: usize = 5;

/// Spans one quad over the bounding box of the feature.
///
/// Vertex layout is `[lon, lat, 0, u, v]`. The first image row is the
/// northern edge, so `v` runs from 0 at the maximum latitude to 1 at the
/// minimum. Features without coordinates or with a degenerate box produce
/// nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterTriangulator;

impl Triangulator for RasterTriangulator {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn triangulate(&self, feature: &EncodedFeature<'_>) -> Triangulation {
        let mut mesh = Triangulation::empty(RASTER_STRIDE);
        let Some(extent) = feature.feature.bounds() else {
            return mesh;
        };
        if extent.width() <= 0.0 || extent.height() <= 0.0 {
            return mesh;
        }

        let (min, max) = (extent.min(), extent.max());
        let corners = [
            (min.x, max.y, 0.0, 0.0),
            (max.x, max.y, 1.0, 0.0),
            (max.x, min.y, 1.0, 1.0),
            (min.x, min.y, 0.0, 1.0),
        ];
        let mut uvs = Vec::with_capacity(8);
        for (x, y, u, v) in corners {
            mesh.vertices
                .extend_from_slice(&[x as f32, y as f32, 0.0, u, v]);
            uvs.extend_from_slice(&[u, v]);
        }
        mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);
        mesh.uvs = Some(uvs);
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Properties};
    use geo_types::{line_string, Coord, Geometry, Point, Rect};

    fn raster(geometry: Geometry<f64>) -> Triangulation {
        let feature = Feature::new(0, geometry, Properties::new());
        RasterTriangulator.triangulate(&EncodedFeature::plain(0, &feature))
    }

    #[test]
    fn test_quad_spans_extent() {
        let mesh = raster(Geometry::Rect(Rect::new(
            Coord { x: 100.0, y: 20.0 },
            Coord { x: 120.0, y: 40.0 },
        )));

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(mesh.indices_in_bounds());

        // North-west corner samples the first image row
        assert_eq!(mesh.vertex(0), &[100.0, 40.0, 0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertex(2), &[120.0, 20.0, 0.0, 1.0, 1.0]);
        assert_eq!(
            mesh.uvs.as_deref(),
            Some(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0][..])
        );
    }

    #[test]
    fn test_extent_of_any_geometry() {
        let mesh = raster(Geometry::LineString(
            line_string![(x: 3.0, y: 1.0), (x: -1.0, y: 4.0)],
        ));
        assert_eq!(&mesh.vertex(0)[..2], &[-1.0, 4.0]);
        assert_eq!(&mesh.vertex(2)[..2], &[3.0, 1.0]);
    }

    #[test]
    fn test_degenerate_extent_produces_nothing() {
        assert!(raster(Geometry::Point(Point::new(1.0, 1.0))).is_empty());
        assert!(raster(Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)])).is_empty());
    }
}
