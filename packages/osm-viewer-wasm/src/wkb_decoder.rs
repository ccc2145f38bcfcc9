use geo_types::Geometry;
use geozero::wkb::Wkb;
use geozero::ToGeo;
use serde::Serialize;
use std::fmt;

use crate::error::LoadError;

/// Declared kind of a decoded geometry, used for classification and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeometryKind {
    Point,
    Line,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    Rect,
    Triangle,
}

impl GeometryKind {
    pub fn of(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Line(_) => GeometryKind::Line,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
            Geometry::Rect(_) => GeometryKind::Rect,
            Geometry::Triangle(_) => GeometryKind::Triangle,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Parse a WKB body into a geometry tree.
pub fn decode(body: &[u8]) -> Result<Geometry<f64>, LoadError> {
    if body.is_empty() {
        return Err(LoadError::Decode("empty body".to_string()));
    }
    Wkb(body.to_vec())
        .to_geo()
        .map_err(|e| LoadError::Decode(e.to_string()))
}

/// Members of a decoded response. The server always sends a collection; any
/// other geometry is treated as a collection of one.
pub fn collection_members(geometry: Geometry<f64>) -> Vec<Geometry<f64>> {
    match geometry {
        Geometry::GeometryCollection(collection) => collection.0,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wkb;

    #[test]
    fn decodes_collection_members_in_order() {
        let body = wkb::collection(&[
            wkb::polygon(&[wkb::square(0.0, 0.0, 1.0)]),
            wkb::point(3.0, 4.0),
            wkb::multi_polygon(&[wkb::polygon(&[wkb::square(5.0, 5.0, 1.0)])]),
        ]);

        let members = collection_members(decode(&body).unwrap());
        let kinds: Vec<GeometryKind> = members.iter().map(GeometryKind::of).collect();
        assert_eq!(
            kinds,
            vec![GeometryKind::Polygon, GeometryKind::Point, GeometryKind::MultiPolygon]
        );
    }

    #[test]
    fn non_collection_is_a_single_member() {
        let body = wkb::polygon(&[wkb::square(0.0, 0.0, 2.0)]);
        let members = collection_members(decode(&body).unwrap());
        assert_eq!(members.len(), 1);
        assert_eq!(GeometryKind::of(&members[0]), GeometryKind::Polygon);
    }

    #[test]
    fn empty_and_truncated_bodies_fail_to_decode() {
        assert!(matches!(decode(&[]), Err(LoadError::Decode(_))));

        let mut body = wkb::polygon(&[wkb::square(0.0, 0.0, 1.0)]);
        body.truncate(body.len() - 12);
        assert!(matches!(decode(&body), Err(LoadError::Decode(_))));
    }
}
