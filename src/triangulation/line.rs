//! Line extrusion into screen-space quads.

use super::{Triangulation, Triangulator};
use crate::style::EncodedFeature;
use geo_types::{Coord, Geometry, LineString, Polygon};

/// Floats per line vertex: position (3) followed by distance along the line.
pub const LINE_STRIDE: usize = 4;

/// Expands each line segment into a quad.
///
/// Vertex layout is `[lon, lat, 0, distance]` where `distance` accumulates
/// along each line string and drives dash patterns. Normals are unit
/// extrusion directions; the vertex shader scales them by the line width in
/// pixels. Polygon rings are drawn as their outlines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineTriangulator;

impl Triangulator for LineTriangulator {
    fn name(&self) -> &'static str {
        "line"
    }

    fn triangulate(&self, feature: &EncodedFeature<'_>) -> Triangulation {
        let mut lines = Vec::new();
        collect_lines(&feature.feature.geometry, &mut lines);

        let mut mesh = Triangulation::empty(LINE_STRIDE);
        let mut normals = Vec::new();
        for line in &lines {
            extrude(&line.0, &mut mesh, &mut normals);
        }
        mesh.normals = Some(normals);
        mesh
    }
}

fn extrude(coords: &[Coord<f64>], mesh: &mut Triangulation, normals: &mut Vec<f32>) {
    let mut distance = 0.0f64;
    for segment in coords.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f64::EPSILON {
            continue;
        }

        let nx = (-dy / length) as f32;
        let ny = (dx / length) as f32;
        let start = distance as f32;
        distance += length;
        let end = distance as f32;

        let base = mesh.vertex_count() as u32;
        for (p, d) in [(a, start), (b, end)] {
            for side in [1.0f32, -1.0] {
                mesh.vertices
                    .extend_from_slice(&[p.x as f32, p.y as f32, 0.0, d]);
                normals.extend_from_slice(&[nx * side, ny * side, 0.0]);
            }
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
    }
}

fn collect_lines(geometry: &Geometry<f64>, out: &mut Vec<LineString<f64>>) {
    match geometry {
        Geometry::Line(l) => out.push(LineString(vec![l.start, l.end])),
        Geometry::LineString(ls) => out.push(ls.clone()),
        Geometry::MultiLineString(mls) => out.extend(mls.0.iter().cloned()),
        Geometry::Polygon(p) => push_rings(p, out),
        Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| push_rings(p, out)),
        Geometry::Rect(r) => push_rings(&r.to_polygon(), out),
        Geometry::Triangle(t) => push_rings(&t.to_polygon(), out),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_lines(g, out);
            }
        }
        Geometry::Point(_) | Geometry::MultiPoint(_) => {}
    }
}

fn push_rings(polygon: &Polygon<f64>, out: &mut Vec<LineString<f64>>) {
    out.push(polygon.exterior().clone());
    out.extend(polygon.interiors().iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Properties};
    use geo_types::{line_string, polygon, Point};

    fn lines(geometry: Geometry<f64>) -> Triangulation {
        let feature = Feature::new(0, geometry, Properties::new());
        LineTriangulator.triangulate(&EncodedFeature::plain(0, &feature))
    }

    #[test]
    fn test_segments_become_quads() {
        let mesh = lines(Geometry::LineString(
            line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 4.0)],
        ));

        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.indices.len(), 12);
        assert!(mesh.indices_in_bounds());

        // Distance accumulates across segments
        assert_eq!(mesh.vertex(0)[3], 0.0);
        assert_eq!(mesh.vertex(2)[3], 3.0);
        assert_eq!(mesh.vertex(4)[3], 3.0);
        assert_eq!(mesh.vertex(6)[3], 7.0);

        // First segment runs along +x, so it extrudes along y
        assert_eq!(mesh.normal(0), &[0.0, 1.0, 0.0]);
        assert_eq!(mesh.normal(1), &[0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_normals_are_unit_length() {
        let mesh = lines(Geometry::LineString(
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 2.0), (x: -3.0, y: 5.0)],
        ));
        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), mesh.vertex_count() * 3);
        for n in normals.chunks(3) {
            let length = (n[0] * n[0] + n[1] * n[1]).sqrt();
            assert!((length - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_length_segments_are_skipped() {
        let mesh = lines(Geometry::LineString(
            line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0), (x: 2.0, y: 1.0)],
        ));
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_polygon_outline() {
        let mesh = lines(Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]));
        assert_eq!(mesh.indices.len(), 3 * 6);
    }

    #[test]
    fn test_points_produce_nothing() {
        assert!(lines(Geometry::Point(Point::new(0.0, 0.0))).is_empty());
    }
}
