use geo_types::{Coord, Polygon};

/// 2D outline with holes: the contour path followed by zero or more hole paths.
///
/// Each path starts at its first point and continues through the rest in order;
/// closure is implicit. Nothing is validated here, degenerate rings are carried
/// through to the mesh builder unchanged.
///
/// Rings decoded from WKB are always closed: `geo_types::Polygon::new` appends
/// the first point to an open ring, so an open N-point ring arrives as N + 1
/// points. The mesh builder drops that repeated point again.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outline {
    pub contour: Vec<Coord<f64>>,
    pub holes: Vec<Vec<Coord<f64>>>,
}

impl Outline {
    pub fn point_count(&self) -> usize {
        self.contour.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }
}

/// Build an outline from a polygon: exterior ring as contour, interior rings as holes.
pub fn shape_from_polygon(polygon: &Polygon<f64>) -> Outline {
    Outline {
        contour: polygon.exterior().0.clone(),
        holes: polygon.interiors().iter().map(|ring| ring.0.clone()).collect(),
    }
}
