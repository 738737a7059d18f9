//! Point-to-polyline projection and splitting of street geometry

use geo::{Coord, LineString};

use crate::graph::{planar_length, StreetEdge};

/// Closest point on a polyline to some query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub point: Coord<f64>,
    /// Planar distance from the query point to `point`
    pub distance: f64,
    /// Index of the polyline segment holding `point`
    pub segment: usize,
    /// Distance travelled along the polyline from its start to `point`
    pub along: f64,
}

/// Project `point` onto `geometry`. `None` for polylines with fewer than two points.
pub fn project(geometry: &LineString<f64>, point: Coord<f64>) -> Option<Projection> {
    let mut best: Option<(f64, Projection)> = None;
    let mut travelled = 0.0;

    for (segment, line) in geometry.lines().enumerate() {
        let a = line.start;
        let ab = line.delta();
        let ap = point - a;
        let ab_ab = ab.x * ab.x + ab.y * ab.y;
        let seg_len = ab_ab.sqrt();

        // Degenerate segments project onto their start
        let t = if ab_ab == 0.0 {
            0.0
        } else {
            ((ab.x * ap.x + ab.y * ap.y) / ab_ab).clamp(0.0, 1.0)
        };

        let closest = Coord {
            x: a.x + t * ab.x,
            y: a.y + t * ab.y,
        };
        let dx = point.x - closest.x;
        let dy = point.y - closest.y;
        let dist_2 = dx * dx + dy * dy;

        if best.as_ref().map_or(true, |(d, _)| dist_2 < *d) {
            best = Some((
                dist_2,
                Projection {
                    point: closest,
                    distance: dist_2.sqrt(),
                    segment,
                    along: travelled + t * seg_len,
                },
            ));
        }
        travelled += seg_len;
    }

    best.map(|(_, projection)| projection)
}

/// Split `geometry` at a projection into (start..point, point..end)
pub fn split_geometry(geometry: &LineString<f64>, at: &Projection) -> (LineString<f64>, LineString<f64>) {
    let coords = &geometry.0;
    let cut = (at.segment + 1).min(coords.len());

    let mut head: Vec<Coord<f64>> = coords[..cut].to_vec();
    if head.last() != Some(&at.point) {
        head.push(at.point);
    }

    let mut tail: Vec<Coord<f64>> = Vec::with_capacity(coords.len() - cut + 1);
    tail.push(at.point);
    for &c in &coords[cut..] {
        if tail.last() != Some(&c) {
            tail.push(c);
        }
    }

    (LineString::new(head), LineString::new(tail))
}

/// Two halves of a street edge cut at a projection.
///
/// The original length is apportioned by the geometric fraction, so the
/// halves always sum to the original length.
pub fn split_street(street: &StreetEdge, at: &Projection) -> (StreetEdge, StreetEdge) {
    let (head_geom, tail_geom) = split_geometry(&street.geometry, at);
    let total = planar_length(&street.geometry);
    let fraction = if total > 0.0 { at.along / total } else { 0.0 };
    let head_len = street.length * fraction;

    let head = StreetEdge {
        geometry: head_geom,
        length: head_len,
        ..street.clone()
    };
    let tail = StreetEdge {
        geometry: tail_geom,
        length: street.length - head_len,
        ..street.clone()
    };
    (head, tail)
}
