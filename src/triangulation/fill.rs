//! Polygon fill tessellation with lyon.

use super::{Triangulation, Triangulator};
use crate::style::EncodedFeature;
use geo_types::{Geometry, LineString, Polygon};
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers,
};

/// Floats per fill vertex: position (3).
pub const FILL_STRIDE: usize = 3;

/// Tessellates polygon features into triangles. Holes are respected.
///
/// Vertex layout is `[lon, lat, 0]`. Non-areal geometry yields an empty mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillTriangulator;

impl Triangulator for FillTriangulator {
    fn name(&self) -> &'static str {
        "fill"
    }

    fn triangulate(&self, feature: &EncodedFeature<'_>) -> Triangulation {
        let mut polygons = Vec::new();
        collect_polygons(&feature.feature.geometry, &mut polygons);

        let mut builder = Path::builder();
        let mut rings = 0;
        for polygon in &polygons {
            if add_ring(&mut builder, polygon.exterior()) {
                rings += 1;
                for interior in polygon.interiors() {
                    add_ring(&mut builder, interior);
                }
            }
        }
        if rings == 0 {
            return Triangulation::empty(FILL_STRIDE);
        }
        let path = builder.build();

        let mut geometry: VertexBuffers<[f32; 3], u32> = VertexBuffers::new();
        let mut tessellator = FillTessellator::new();
        let result = tessellator.tessellate_path(
            &path,
            &FillOptions::default(),
            &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| {
                let p = vertex.position();
                [p.x, p.y, 0.0]
            }),
        );
        if let Err(e) = result {
            log::warn!(
                "Failed to tessellate feature {}: {:?}",
                feature.feature.id,
                e
            );
            return Triangulation::empty(FILL_STRIDE);
        }

        Triangulation {
            vertices: geometry.vertices.into_iter().flatten().collect(),
            stride: FILL_STRIDE,
            indices: geometry.indices,
            normals: None,
            uvs: None,
        }
    }
}

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p.clone()),
        Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

/// Adds a closed ring to the path. Returns false for rings with fewer than 3 points.
fn add_ring(builder: &mut lyon::path::path::Builder, ring: &LineString<f64>) -> bool {
    let mut coords: Vec<_> = ring.0.iter().collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return false;
    }

    builder.begin(point(coords[0].x as f32, coords[0].y as f32));
    for c in &coords[1..] {
        builder.line_to(point(c.x as f32, c.y as f32));
    }
    builder.end(true);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Properties};
    use geo_types::{line_string, polygon, Geometry, Point};

    fn fill(geometry: Geometry<f64>) -> Triangulation {
        let feature = Feature::new(0, geometry, Properties::new());
        FillTriangulator.triangulate(&EncodedFeature::plain(0, &feature))
    }

    fn area(mesh: &Triangulation) -> f32 {
        mesh.indices
            .chunks(3)
            .map(|t| {
                let a = mesh.vertex(t[0] as usize);
                let b = mesh.vertex(t[1] as usize);
                let c = mesh.vertex(t[2] as usize);
                ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() / 2.0
            })
            .sum()
    }

    #[test]
    fn test_square_fills_with_two_triangles() {
        let mesh = fill(Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ]));

        assert_eq!(mesh.stride, FILL_STRIDE);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.indices_in_bounds());
        assert!((area(&mesh) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_hole_is_excluded() {
        let mesh = fill(Geometry::Polygon(polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
            ],
            interiors: [
                [
                    (x: 4.0, y: 4.0),
                    (x: 6.0, y: 4.0),
                    (x: 6.0, y: 6.0),
                    (x: 4.0, y: 6.0),
                ],
            ],
        )));

        assert!(mesh.indices_in_bounds());
        assert!((area(&mesh) - 96.0).abs() < 1e-3);
    }

    #[test]
    fn test_non_areal_geometry_is_empty() {
        assert!(fill(Geometry::Point(Point::new(1.0, 2.0))).is_empty());
        assert!(fill(Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)])).is_empty());
    }

    #[test]
    fn test_degenerate_ring_is_skipped() {
        let mesh = fill(Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]));
        assert!(mesh.is_empty());
    }
}
