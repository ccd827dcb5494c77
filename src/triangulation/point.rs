//! Point marker shapes.

use super::{Triangulation, Triangulator};
use crate::feature::visit_coords;
use crate::style::EncodedFeature;
use geo_types::{Coord, Geometry};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

/// Floats per point vertex: anchor position (3).
pub const POINT_STRIDE: usize = 3;

/// Marker outline drawn at each point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointShape {
    #[default]
    Circle,
    Hexagon,
    Square,
    Triangle,
}

impl PointShape {
    /// Parses a shape name. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "circle" => Some(PointShape::Circle),
            "hexagon" => Some(PointShape::Hexagon),
            "square" => Some(PointShape::Square),
            "triangle" => Some(PointShape::Triangle),
            _ => None,
        }
    }

    /// Number of rim vertices.
    pub fn sides(&self) -> u32 {
        match self {
            PointShape::Circle => 24,
            PointShape::Hexagon => 6,
            PointShape::Square => 4,
            PointShape::Triangle => 3,
        }
    }

    fn start_angle(&self) -> f32 {
        match self {
            PointShape::Circle => 0.0,
            PointShape::Hexagon | PointShape::Triangle => FRAC_PI_2,
            PointShape::Square => FRAC_PI_4,
        }
    }
}

/// Builds one marker polygon per point.
///
/// Every rim vertex sits at the point position; its normal is the unit
/// direction to the rim, which the vertex shader scales by the point size in
/// pixels. Non-point geometry is marked at its bounding box center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointTriangulator {
    /// Shape used when the feature has no valid encoded shape
    pub shape: PointShape,
}

impl PointTriangulator {
    pub fn new(shape: PointShape) -> Self {
        Self { shape }
    }
}

impl Triangulator for PointTriangulator {
    fn name(&self) -> &'static str {
        "point"
    }

    fn triangulate(&self, feature: &EncodedFeature<'_>) -> Triangulation {
        let shape = feature
            .shape
            .as_deref()
            .and_then(PointShape::from_name)
            .unwrap_or(self.shape);

        let mut anchors = Vec::new();
        match &feature.feature.geometry {
            geometry @ (Geometry::Point(_) | Geometry::MultiPoint(_)) => {
                visit_coords(geometry, &mut |c| anchors.push(c))
            }
            _ => anchors.extend(feature.feature.anchor()),
        }

        let mut mesh = Triangulation::empty(POINT_STRIDE);
        let mut normals = Vec::new();
        for anchor in anchors {
            push_marker(anchor, shape, &mut mesh, &mut normals);
        }
        mesh.normals = Some(normals);
        mesh
    }
}

fn push_marker(anchor: Coord<f64>, shape: PointShape, mesh: &mut Triangulation, normals: &mut Vec<f32>) {
    let sides = shape.sides();
    let base = mesh.vertex_count() as u32;
    let step = TAU / sides as f32;

    for i in 0..sides {
        let (sin, cos) = (shape.start_angle() + step * i as f32).sin_cos();
        mesh.vertices
            .extend_from_slice(&[anchor.x as f32, anchor.y as f32, 0.0]);
        normals.extend_from_slice(&[cos, sin, 0.0]);
    }
    for i in 1..sides - 1 {
        mesh.indices.extend_from_slice(&[base, base + i, base + i + 1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Properties};
    use geo_types::{polygon, MultiPoint, Point};

    fn markers(geometry: Geometry<f64>, shape: Option<&str>) -> Triangulation {
        let feature = Feature::new(0, geometry, Properties::new());
        let mut encoded = EncodedFeature::plain(0, &feature);
        encoded.shape = shape.map(str::to_string);
        PointTriangulator::default().triangulate(&encoded)
    }

    #[test]
    fn test_shape_names() {
        assert_eq!(PointShape::from_name("Hexagon"), Some(PointShape::Hexagon));
        assert_eq!(PointShape::from_name("square"), Some(PointShape::Square));
        assert_eq!(PointShape::from_name("star"), None);
    }

    #[test]
    fn test_encoded_shape_overrides_default() {
        let mesh = markers(Geometry::Point(Point::new(1.0, 2.0)), Some("triangle"));
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertex(1), &[1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_unknown_shape_falls_back() {
        let mesh = markers(Geometry::Point(Point::new(0.0, 0.0)), Some("star"));
        assert_eq!(mesh.vertex_count(), PointShape::Circle.sides() as usize);
    }

    #[test]
    fn test_multi_point_markers_are_indexed_per_point() {
        let mesh = markers(
            Geometry::MultiPoint(MultiPoint(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)])),
            Some("square"),
        );
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert!(mesh.indices_in_bounds());

        for i in 0..mesh.vertex_count() {
            let n = mesh.normal(i);
            assert!(((n[0] * n[0] + n[1] * n[1]).sqrt() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_polygon_marked_at_center() {
        let mesh = markers(
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 0.0),
                (x: 4.0, y: 2.0),
                (x: 0.0, y: 2.0),
            ]),
            Some("hexagon"),
        );
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.vertex(0), &[2.0, 1.0, 0.0]);
    }
}
