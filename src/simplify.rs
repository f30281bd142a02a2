use crate::geometry::{Coord, Geometry, Ring};

/// Default simplification tolerance, in degrees.
pub const DEFAULT_TOLERANCE: f64 = 0.0003;

/// Simplifies a ring with the Douglas–Peucker algorithm.
///
/// Every point whose distance to the simplified polyline is greater than `tolerance` is kept.
/// The first and last points are always kept, so a closed ring stays closed. Inputs with two
/// points or fewer are returned unchanged.
pub fn simplify(ring: &[Coord], tolerance: f64) -> Ring {
    if ring.len() <= 2 {
        return ring.to_vec();
    }

    let sq_tolerance = tolerance * tolerance;
    let last = ring.len() - 1;
    let mut keep = vec![false; ring.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0, last)];
    while let Some((first, last)) = stack.pop() {
        let mut max_sq_dist = sq_tolerance;
        let mut index = None;
        for i in first + 1..last {
            let sq_dist = sq_segment_distance(ring[i], ring[first], ring[last]);
            if sq_dist > max_sq_dist {
                index = Some(i);
                max_sq_dist = sq_dist;
            }
        }
        if let Some(index) = index {
            keep[index] = true;
            if index - first > 1 {
                stack.push((first, index));
            }
            if last - index > 1 {
                stack.push((index, last));
            }
        }
    }

    ring.iter()
        .zip(keep)
        .filter_map(|(&coord, keep)| keep.then_some(coord))
        .collect()
}

/// Squared distance from `p` to the segment `[a, b]`.
fn sq_segment_distance([px, py]: Coord, [mut x, mut y]: Coord, [bx, by]: Coord) -> f64 {
    let dx = bx - x;
    let dy = by - y;
    if dx != 0. || dy != 0. {
        let t = ((px - x) * dx + (py - y) * dy) / (dx * dx + dy * dy);
        if t > 1. {
            x = bx;
            y = by;
        } else if t > 0. {
            x += dx * t;
            y += dy * t;
        }
    }
    let dx = px - x;
    let dy = py - y;
    dx * dx + dy * dy
}

/// Simplifies a ring, keeping the input when the result would be a degenerate stub.
///
/// The simplified ring replaces the input only if it has more than 4 points, or none at all.
fn simplify_outer_ring(ring: &mut Ring, tolerance: f64) {
    let simplified = simplify(ring, tolerance);
    if simplified.len() > 4 || simplified.is_empty() {
        *ring = simplified;
    }
}

/// Simplifies the outer ring of every polygon of a geometry, in place.
///
/// Holes are left untouched.
pub fn simplify_geometry(geometry: &mut Geometry, tolerance: f64) {
    match geometry {
        Geometry::Polygon(polygon) => simplify_outer_ring(&mut polygon.exterior, tolerance),
        Geometry::MultiPolygon(polygons) => {
            for polygon in polygons.iter_mut() {
                simplify_outer_ring(&mut polygon.exterior, tolerance);
            }
        }
        Geometry::Unsupported => {}
    }
}
