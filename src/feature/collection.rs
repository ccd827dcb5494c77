//! Feature and feature collection data structures.

use super::{BorderClass, Properties};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon, Rect,
};
use geojson::{GeoJson, Value};
use serde_json::Value as JsonValue;

/// A single geographic feature.
///
/// Features are immutable once loaded. The boundary classification is
/// resolved from the properties at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature id, unique within the collection it was loaded into
    pub id: u64,
    /// Feature geometry in lon/lat degrees
    pub geometry: Geometry<f64>,
    /// Raw feature properties
    pub properties: Properties,
    /// Classification resolved from the `type` property
    pub border_class: BorderClass,
}

impl Feature {
    /// Creates a feature, resolving its classification from the properties.
    pub fn new(id: u64, geometry: Geometry<f64>, properties: Properties) -> Self {
        let border_class = BorderClass::from_properties(&properties);
        Self {
            id,
            geometry,
            properties,
            border_class,
        }
    }

    /// Returns a property value by key.
    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// Returns a property as a display string. Numbers and booleans are formatted.
    pub fn property_string(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Returns a property as a number. Numeric strings are parsed.
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        match self.properties.get(key)? {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the center of the feature's bounding box, used to anchor labels.
    pub fn anchor(&self) -> Option<Coord<f64>> {
        self.bounds().map(|rect| rect.center())
    }

    /// Bounding box of every coordinate, or `None` for empty geometry.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let mut bounds: Option<(Coord<f64>, Coord<f64>)> = None;
        visit_coords(&self.geometry, &mut |c| {
            bounds = Some(match bounds {
                None => (c, c),
                Some((min, max)) => (
                    Coord {
                        x: min.x.min(c.x),
                        y: min.y.min(c.y),
                    },
                    Coord {
                        x: max.x.max(c.x),
                        y: max.y.max(c.y),
                    },
                ),
            });
        });

        bounds.map(|(min, max)| Rect::new(min, max))
    }
}

/// Calls `f` for every coordinate of a geometry.
pub(crate) fn visit_coords(geometry: &Geometry<f64>, f: &mut impl FnMut(Coord<f64>)) {
    match geometry {
        Geometry::Point(p) => f(p.0),
        Geometry::Line(l) => {
            f(l.start);
            f(l.end);
        }
        Geometry::LineString(ls) => ls.0.iter().copied().for_each(f),
        Geometry::Polygon(poly) => visit_polygon(poly, f),
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| f(p.0)),
        Geometry::MultiLineString(mls) => mls
            .0
            .iter()
            .for_each(|ls| ls.0.iter().copied().for_each(&mut *f)),
        Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|poly| visit_polygon(poly, &mut *f)),
        Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| visit_coords(g, &mut *f)),
        Geometry::Rect(r) => visit_polygon(&r.to_polygon(), f),
        Geometry::Triangle(t) => visit_polygon(&t.to_polygon(), f),
    }
}

fn visit_polygon(poly: &Polygon<f64>, f: &mut impl FnMut(Coord<f64>)) {
    poly.exterior().0.iter().copied().for_each(&mut *f);
    for ring in poly.interiors() {
        ring.0.iter().copied().for_each(&mut *f);
    }
}

/// An ordered set of features sharing a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

/// Result of splitting a boundary collection by classification.
#[derive(Debug, Clone, Default)]
pub struct BorderSplit {
    /// Province and undetermined borders (codes `"1"` and `"4"`)
    pub province: FeatureCollection,
    /// Everything else: national, coastline, emphasized and unknown borders
    pub national: FeatureCollection,
}

impl FeatureCollection {
    /// Creates a collection from features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Creates an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    /// Splits the collection in two by predicate, preserving order.
    ///
    /// Every feature lands in exactly one of the returned collections:
    /// `(matching, rest)`.
    pub fn partition(self, predicate: impl Fn(&Feature) -> bool) -> (Self, Self) {
        let (matching, rest): (Vec<_>, Vec<_>) = self.features.into_iter().partition(predicate);
        (Self::new(matching), Self::new(rest))
    }

    /// Splits boundary lines into the province group and the national group.
    pub fn split_borders(self) -> BorderSplit {
        let (province, national) = self.partition(|f| f.border_class.is_province_group());
        BorderSplit { province, national }
    }

    /// Parses a GeoJSON document into a collection.
    pub fn from_geojson_str(geojson_str: &str) -> Result<Self, String> {
        let geojson: GeoJson = geojson_str
            .parse()
            .map_err(|e| format!("Failed to parse GeoJSON: {}", e))?;

        Ok(Self::from_geojson(geojson))
    }

    /// Converts a parsed GeoJSON document. Features without a usable geometry are skipped.
    pub fn from_geojson(geojson: GeoJson) -> Self {
        let mut features = Vec::new();

        match geojson {
            GeoJson::FeatureCollection(fc) => {
                for feature in fc.features {
                    push_feature(&mut features, feature);
                }
            }
            GeoJson::Feature(f) => push_feature(&mut features, f),
            GeoJson::Geometry(g) => {
                if let Some(geometry) = convert_geometry(&g.value) {
                    features.push(Feature::new(0, geometry, Properties::new()));
                }
            }
        }

        Self::new(features)
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

fn push_feature(features: &mut Vec<Feature>, feature: geojson::Feature) {
    let Some(geometry) = feature
        .geometry
        .as_ref()
        .and_then(|g| convert_geometry(&g.value))
    else {
        return;
    };

    let id = features.len() as u64;
    let properties = feature.properties.unwrap_or_default();
    features.push(Feature::new(id, geometry, properties));
}

fn coord(position: &[f64]) -> Option<Coord<f64>> {
    match position {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn line(positions: &[Vec<f64>]) -> LineString<f64> {
    LineString::new(positions.iter().filter_map(|p| coord(p)).collect())
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()?;
    Some(Polygon::new(line(exterior), holes.iter().map(|r| line(r)).collect()))
}

fn convert_geometry(value: &Value) -> Option<Geometry<f64>> {
    match value {
        Value::Point(p) => coord(p).map(|c| Geometry::Point(Point(c))),
        Value::MultiPoint(points) => Some(Geometry::MultiPoint(MultiPoint(
            points.iter().filter_map(|p| coord(p)).map(Point).collect(),
        ))),
        Value::LineString(coords) => Some(Geometry::LineString(line(coords))),
        Value::MultiLineString(lines) => Some(Geometry::MultiLineString(MultiLineString(
            lines.iter().map(|l| line(l)).collect(),
        ))),
        Value::Polygon(rings) => polygon(rings).map(Geometry::Polygon),
        Value::MultiPolygon(polygons) => Some(Geometry::MultiPolygon(MultiPolygon(
            polygons.iter().filter_map(|rings| polygon(rings)).collect(),
        ))),
        Value::GeometryCollection(geometries) => Some(Geometry::GeometryCollection(
            GeometryCollection(
                geometries
                    .iter()
                    .filter_map(|g| convert_geometry(&g.value))
                    .collect(),
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::line_string;
    use serde_json::json;

    fn border(id: u64, code: &str) -> Feature {
        let mut props = Properties::new();
        props.insert("type".to_string(), json!(code));
        Feature::new(
            id,
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: id as f64)]),
            props,
        )
    }

    #[test]
    fn test_split_borders_partitions_exactly() {
        let codes = ["1", "2", "3", "4", "0", "7", "1", "0"];
        let fc: FeatureCollection = codes
            .iter()
            .enumerate()
            .map(|(i, code)| border(i as u64, code))
            .collect();
        let original = fc.clone();

        let split = fc.split_borders();
        assert_eq!(split.province.len() + split.national.len(), original.len());

        for feature in original.iter() {
            let in_province = split.province.iter().filter(|f| *f == feature).count();
            let in_national = split.national.iter().filter(|f| *f == feature).count();
            assert_eq!(in_province + in_national, 1, "feature {} placed once", feature.id);
        }

        let mut rebuilt: Vec<Feature> = split
            .province
            .into_iter()
            .chain(split.national)
            .collect();
        rebuilt.sort_by_key(|f| f.id);
        assert_eq!(rebuilt, original.into_features());
    }

    #[test]
    fn test_split_borders_scenario() {
        let fc: FeatureCollection = ["1", "2", "3", "4", "0"]
            .iter()
            .enumerate()
            .map(|(i, code)| border(i as u64, code))
            .collect();

        let split = fc.split_borders();
        let province: Vec<_> = split.province.iter().map(|f| f.border_class.code()).collect();
        let national: Vec<_> = split.national.iter().map(|f| f.border_class.code()).collect();

        assert_eq!(province, vec![Some("1"), Some("4")]);
        assert_eq!(national, vec![Some("2"), Some("3"), Some("0")]);
    }

    #[test]
    fn test_split_empty_collection() {
        let split = FeatureCollection::empty().split_borders();
        assert!(split.province.is_empty());
        assert!(split.national.is_empty());
    }

    #[test]
    fn test_geojson_feature_collection() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "type": "2", "name": "coast" },
                    "geometry": { "type": "LineString", "coordinates": [[100.0, 20.0], [101.0, 21.0]] }
                },
                {
                    "type": "Feature",
                    "properties": { "NAME_CHN": "A", "adcode": 110000 },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": null
                }
            ]
        })
        .to_string();

        let fc = FeatureCollection::from_geojson_str(&doc).unwrap();
        assert_eq!(fc.len(), 2);

        let coast = &fc.features()[0];
        assert_eq!(coast.border_class, BorderClass::Coastline);
        assert_eq!(coast.property_string("name").as_deref(), Some("coast"));

        let region = &fc.features()[1];
        assert_eq!(region.id, 1);
        assert_eq!(region.property_f64("adcode"), Some(110000.0));
        assert_eq!(region.property_string("adcode").as_deref(), Some("110000"));
        assert_eq!(region.anchor(), Some(Coord { x: 2.0, y: 1.0 }));
    }

    #[test]
    fn test_invalid_geojson() {
        assert!(FeatureCollection::from_geojson_str("{ not json").is_err());
    }
}
