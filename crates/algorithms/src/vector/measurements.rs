//! Geometric measurements

use geo::Area as GeoArea;
use geo_types::Geometry;

/// Unsigned area of a polygonal geometry in CRS units squared.
///
/// Non-polygonal geometries have zero area.
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, LineString, MultiPolygon, Polygon};

    fn square(x0: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x0, 0.0), (x0 + size, 0.0), (x0 + size, size), (x0, size), (x0, 0.0),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_area_square() {
        let a = area(&Geometry::Polygon(square(0.0, 10.0)));
        assert!((a - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_multipolygon_and_clockwise_ring() {
        let mut cw = square(0.0, 10.0);
        cw.exterior_mut(|ring| ring.0.reverse());
        let mp = MultiPolygon::new(vec![cw, square(20.0, 5.0)]);
        let a = area(&Geometry::MultiPolygon(mp));
        assert!((a - 125.0).abs() < 1e-10);
    }

    #[test]
    fn test_point_has_no_area() {
        assert_eq!(area(&Geometry::Point(point!(x: 1.0, y: 2.0))), 0.0);
    }
}
