//! Raster-to-polygon conversion
//!
//! Each maximal 4-connected region of pixels equal to a value becomes one
//! feature. Boundaries are traced along pixel edges in pixel space
//! (x = column, y = row, y pointing down) with the region on the right of
//! every directed edge. At a vertex with two outgoing edges the tracer
//! turns left first, so a ring hugs the outside cells and a hole that
//! touches the outline at a diagonal pinch point stays its own ring.
//! Positive shoelace area marks an exterior ring, negative a hole.

use std::collections::HashMap;

use geo::orient::{Direction, Orient};
use geo::Contains;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use scarmap_core::raster::Mask;
use scarmap_core::vector::{Feature, FeatureCollection};
use scarmap_core::{Error, GeoTransform, Result};
use tracing::debug;

use crate::morphology::{label_regions, Connectivity};

/// Lattice point (x = column, y = row)
type Vertex = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn dir(&self) -> (i64, i64) {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Polygonize the pixels of `mask` equal to `value`.
///
/// Returns one feature per 4-connected region, in scan order of the
/// region's first pixel, carrying geometry only. Nodata pixels never form
/// regions. The collection takes the mask's CRS.
pub fn polygonize(mask: &Mask, value: u8) -> Result<FeatureCollection> {
    let (rows, cols) = mask.shape();
    let labels = label_regions(mask, Connectivity::Four, |v| v == value);
    let label_of = labels.as_slice();

    let mut region_edges: Vec<Vec<Edge>> = vec![Vec::new(); labels.count()];
    let inside = |r: i64, c: i64, l: u32| {
        r >= 0
            && c >= 0
            && (r as usize) < rows
            && (c as usize) < cols
            && label_of[r as usize * cols + c as usize] == l
    };

    for row in 0..rows {
        for col in 0..cols {
            let l = label_of[row * cols + col];
            if l == 0 {
                continue;
            }
            let (r, c) = (row as i64, col as i64);
            let edges = &mut region_edges[l as usize - 1];

            if !inside(r - 1, c, l) {
                edges.push(Edge { from: (c, r), to: (c + 1, r) });
            }
            if !inside(r, c + 1, l) {
                edges.push(Edge { from: (c + 1, r), to: (c + 1, r + 1) });
            }
            if !inside(r + 1, c, l) {
                edges.push(Edge { from: (c + 1, r + 1), to: (c, r + 1) });
            }
            if !inside(r, c - 1, l) {
                edges.push(Edge { from: (c, r + 1), to: (c, r) });
            }
        }
    }

    let mut collection = FeatureCollection::new();
    collection.crs = mask.crs().cloned();

    for edges in &region_edges {
        let rings = trace_rings(edges)?;
        let geometry = assemble(rings, mask.transform());
        collection.push(Feature::new(geometry));
    }

    debug!(features = collection.len(), value, "polygonized mask");
    Ok(collection)
}

/// Follow directed edges into closed rings of corner vertices
fn trace_rings(edges: &[Edge]) -> Result<Vec<Vec<Vertex>>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }

        let mut ring = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            ring.push(edges[current].from);

            let next = successor(edges, &outgoing, current)?;
            if next == start {
                break;
            }
            if used[next] || ring.len() > edges.len() {
                return Err(Error::Algorithm("boundary tracing did not close a ring".to_string()));
            }
            current = next;
        }

        rings.push(drop_collinear(ring));
    }

    Ok(rings)
}

/// Next edge: left turn, then straight, then right
fn successor(edges: &[Edge], outgoing: &HashMap<Vertex, Vec<usize>>, i: usize) -> Result<usize> {
    let edge = edges[i];
    let (dx, dy) = edge.dir();
    let candidates = outgoing
        .get(&edge.to)
        .ok_or_else(|| Error::Algorithm(format!("open boundary at vertex {:?}", edge.to)))?;

    [(dy, -dx), (dx, dy), (-dy, dx)]
        .into_iter()
        .find_map(|want| candidates.iter().copied().find(|&j| edges[j].dir() == want))
        .ok_or_else(|| Error::Algorithm(format!("no continuation at vertex {:?}", edge.to)))
}

fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let v = ring[i];
            let next = ring[(i + 1) % n];
            (v.0 - prev.0, v.1 - prev.1) != (next.0 - v.0, next.1 - v.1)
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the signed shoelace area in pixel space
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum()
}

fn to_line_string(ring: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(x, y)| {
            let (gx, gy) = transform.fractional_to_geo(x as f64, y as f64);
            Coord { x: gx, y: gy }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

fn assemble(rings: Vec<Vec<Vertex>>, transform: &GeoTransform) -> Geometry<f64> {
    let mut exteriors = Vec::new();
    let mut holes = Vec::new();
    for ring in &rings {
        let line = to_line_string(ring, transform);
        if signed_area2(ring) > 0 {
            exteriors.push(line);
        } else {
            holes.push(line);
        }
    }

    if exteriors.len() == 1 {
        let exterior = exteriors.remove(0);
        return Geometry::Polygon(Polygon::new(exterior, holes).orient(Direction::Default));
    }

    let shells: Vec<Polygon<f64>> = exteriors
        .into_iter()
        .map(|e| Polygon::new(e, Vec::new()))
        .collect();
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];
    for hole in holes {
        let hole_polygon = Polygon::new(hole.clone(), Vec::new());
        let owner = shells
            .iter()
            .position(|s| s.contains(&hole_polygon))
            .unwrap_or(0);
        if let Some(list) = interiors.get_mut(owner) {
            list.push(hole);
        }
    }

    let polygons: Vec<Polygon<f64>> = shells
        .into_iter()
        .zip(interiors)
        .map(|(shell, inner)| Polygon::new(shell.exterior().clone(), inner).orient(Direction::Default))
        .collect();
    Geometry::MultiPolygon(MultiPolygon::new(polygons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{Area, Winding};
    use scarmap_core::{Raster, CRS};

    fn mask(data: Vec<u8>, rows: usize, cols: usize) -> Mask {
        let mut m = Raster::from_vec(data, rows, cols).unwrap();
        m.set_nodata(Some(255));
        m.set_transform(GeoTransform::new(100.0, 200.0, 10.0, -10.0));
        m.set_crs(Some(CRS::from_epsg(32633)));
        m
    }

    fn polygon(f: &Feature) -> &Polygon<f64> {
        match f.geometry.as_ref().unwrap() {
            Geometry::Polygon(p) => p,
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_single_pixel() {
        let fc = polygonize(&mask(vec![0, 1, 0, 0], 2, 2), 1).unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.crs.as_ref().and_then(|c| c.epsg()), Some(32633));

        let p = polygon(&fc.features[0]);
        assert_eq!(p.exterior().0.len(), 5);
        assert_relative_eq!(p.unsigned_area(), 100.0);
        assert!(p.exterior().is_ccw());

        let xs: Vec<f64> = p.exterior().0.iter().map(|c| c.x).collect();
        assert!(xs.iter().all(|&x| x == 110.0 || x == 120.0));
    }

    #[test]
    fn test_collinear_vertices_dropped() {
        #[rustfmt::skip]
        let m = mask(vec![
            1, 1, 1,
            1, 1, 1,
        ], 2, 3);
        let fc = polygonize(&m, 1).unwrap();
        let p = polygon(&fc.features[0]);
        assert_eq!(p.exterior().0.len(), 5);
        assert_relative_eq!(p.unsigned_area(), 600.0);
    }

    #[test]
    fn test_hole_kept_as_interior_ring() {
        #[rustfmt::skip]
        let m = mask(vec![
            1, 1, 1,
            1, 0, 1,
            1, 1, 1,
        ], 3, 3);
        let fc = polygonize(&m, 1).unwrap();
        assert_eq!(fc.len(), 1);
        let p = polygon(&fc.features[0]);
        assert_eq!(p.interiors().len(), 1);
        assert!(p.interiors()[0].is_cw());
        assert_relative_eq!(p.unsigned_area(), 800.0);
    }

    #[test]
    fn test_diagonal_pixels_are_separate_features() {
        #[rustfmt::skip]
        let m = mask(vec![
            1, 0,
            0, 1,
        ], 2, 2);
        let fc = polygonize(&m, 1).unwrap();
        assert_eq!(fc.len(), 2);
        for f in fc.iter() {
            assert_relative_eq!(polygon(f).unsigned_area(), 100.0);
        }
    }

    #[test]
    fn test_pinch_point_splits_ring() {
        // Ring of 1s whose enclosed 0 at (2, 2) touches the outside cell
        // (1, 1) at a single corner
        #[rustfmt::skip]
        let m = mask(vec![
            0, 0, 0, 0,
            0, 0, 1, 1,
            0, 1, 0, 1,
            0, 1, 1, 1,
        ], 4, 4);
        let fc = polygonize(&m, 1).unwrap();
        assert_eq!(fc.len(), 1);
        let p = polygon(&fc.features[0]);
        assert_eq!(p.interiors().len(), 1);
        assert_relative_eq!(p.unsigned_area(), 700.0);
    }

    #[test]
    fn test_value_and_nodata_selection() {
        let m = mask(vec![1, 255, 0, 0], 2, 2);
        let ones = polygonize(&m, 1).unwrap();
        assert_eq!(ones.len(), 1);
        let zeros = polygonize(&m, 0).unwrap();
        assert_eq!(zeros.len(), 1);
        assert_relative_eq!(polygon(&zeros.features[0]).unsigned_area(), 200.0);
        assert!(polygonize(&m, 7).unwrap().is_empty());
    }
}
