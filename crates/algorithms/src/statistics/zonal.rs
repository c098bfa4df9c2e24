//! Zonal statistics under polygon footprints
//!
//! A pixel belongs to a polygon when its centre lies inside the polygon
//! (holes excluded). Only cells in the polygon's pixel-space bounding box
//! are tested.

use geo::{BoundingRect, Contains};
use geo_types::{Geometry, Point};
use scarmap_core::raster::{Raster, RasterElement};

/// Statistics of the valid values under one zone
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub median: f64,
}

impl ZoneStats {
    /// Summarize a set of values; `None` when there are none
    pub fn from_values(mut vals: Vec<f64>) -> Option<Self> {
        if vals.is_empty() {
            return None;
        }

        let count = vals.len();
        let sum: f64 = vals.iter().sum();
        let mean = sum / count as f64;
        let var = vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;

        vals.sort_by(f64::total_cmp);
        let min = vals[0];
        let max = vals[count - 1];

        let median = if count % 2 == 0 {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        } else {
            vals[count / 2]
        };

        Some(ZoneStats {
            count,
            sum,
            mean,
            std_dev: var.sqrt(),
            min,
            max,
            range: max - min,
            median,
        })
    }
}

/// Cells (row, col) of `template` whose centre lies inside `geometry`
pub fn zone_cells<T: RasterElement>(template: &Raster<T>, geometry: &Geometry<f64>) -> Vec<(usize, usize)> {
    let Some(rect) = geometry.bounding_rect() else {
        return Vec::new();
    };
    let (rows, cols) = template.shape();
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    let corners = [
        template.geo_to_pixel(rect.min().x, rect.min().y),
        template.geo_to_pixel(rect.min().x, rect.max().y),
        template.geo_to_pixel(rect.max().x, rect.min().y),
        template.geo_to_pixel(rect.max().x, rect.max().y),
    ];
    let (mut c0, mut r0, mut c1, mut r1) = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (c, r) in corners {
        c0 = c0.min(c);
        r0 = r0.min(r);
        c1 = c1.max(c);
        r1 = r1.max(r);
    }
    if !(c0.is_finite() && r0.is_finite() && c1.is_finite() && r1.is_finite()) {
        return Vec::new();
    }

    let col_start = c0.floor().max(0.0) as usize;
    let row_start = r0.floor().max(0.0) as usize;
    let col_end = (c1.ceil().max(0.0) as usize).min(cols);
    let row_end = (r1.ceil().max(0.0) as usize).min(rows);

    let mut cells = Vec::new();
    for row in row_start..row_end {
        for col in col_start..col_end {
            let (x, y) = template.pixel_to_geo(col, row);
            if geometry.contains(&Point::new(x, y)) {
                cells.push((row, col));
            }
        }
    }
    cells
}

/// Valid (non-nodata) values of `raster` at `cells`
pub fn zone_values(raster: &Raster<f64>, cells: &[(usize, usize)]) -> Vec<f64> {
    cells
        .iter()
        .filter_map(|&(row, col)| {
            let v = raster.get(row, col).ok()?;
            (!raster.is_nodata(v)).then_some(v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{polygon, LineString, Polygon};
    use scarmap_core::GeoTransform;

    fn grid() -> Raster<f64> {
        // 4x4, 10 m pixels, origin (0, 40); value = row * 4 + col
        let data: Vec<f64> = (0..16).map(|v| v as f64).collect();
        let mut r = Raster::from_vec(data, 4, 4).unwrap();
        r.set_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_zone_stats_from_values() {
        let stats = ZoneStats::from_values(vec![4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.median, 2.5);
        assert_relative_eq!(stats.range, 3.0);
        assert_relative_eq!(stats.std_dev, 1.25f64.sqrt());
        assert!(ZoneStats::from_values(Vec::new()).is_none());
    }

    #[test]
    fn test_pixel_centre_rule() {
        // Covers pixels (0,0), (0,1), (1,0), (1,1) exactly
        let poly = polygon![
            (x: 0.0, y: 40.0), (x: 20.0, y: 40.0), (x: 20.0, y: 20.0), (x: 0.0, y: 20.0), (x: 0.0, y: 40.0),
        ];
        let raster = grid();
        let mut cells = zone_cells(&raster, &Geometry::Polygon(poly));
        cells.sort();
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

        let stats = ZoneStats::from_values(zone_values(&raster, &cells)).unwrap();
        assert_relative_eq!(stats.mean, (0.0 + 1.0 + 4.0 + 5.0) / 4.0);
    }

    #[test]
    fn test_hole_excluded() {
        let exterior = LineString::from(vec![(0.0, 40.0), (30.0, 40.0), (30.0, 10.0), (0.0, 10.0), (0.0, 40.0)]);
        let hole = LineString::from(vec![(10.0, 30.0), (20.0, 30.0), (20.0, 20.0), (10.0, 20.0), (10.0, 30.0)]);
        let poly = Geometry::Polygon(Polygon::new(exterior, vec![hole]));

        let cells = zone_cells(&grid(), &poly);
        assert_eq!(cells.len(), 8);
        assert!(!cells.contains(&(1, 1)));
    }

    #[test]
    fn test_nodata_excluded_and_empty_zone() {
        let mut raster = grid();
        raster.set(0, 0, f64::NAN).unwrap();
        let poly = Geometry::Polygon(polygon![
            (x: 0.0, y: 40.0), (x: 10.0, y: 40.0), (x: 10.0, y: 30.0), (x: 0.0, y: 30.0), (x: 0.0, y: 40.0),
        ]);
        let cells = zone_cells(&raster, &poly);
        assert_eq!(cells, vec![(0, 0)]);
        assert!(ZoneStats::from_values(zone_values(&raster, &cells)).is_none());

        let outside = Geometry::Polygon(polygon![
            (x: 100.0, y: 100.0), (x: 110.0, y: 100.0), (x: 110.0, y: 90.0), (x: 100.0, y: 100.0),
        ]);
        assert!(zone_cells(&raster, &outside).is_empty());
    }
}
