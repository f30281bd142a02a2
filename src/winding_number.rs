use itertools::Itertools;

use crate::geometry::{Coord, Geometry, Polygon};

/// A point of the 2D plane, `x` being the longitude and `y` the latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Constructs a new [`Point`] from a longitude and a latitude.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { x: lon, y: lat }
    }
}

impl From<&Coord> for Point {
    fn from(&[x, y]: &Coord) -> Self {
        Self { x, y }
    }
}

impl From<Coord> for Point {
    fn from(value: Coord) -> Self {
        Self::from(&value)
    }
}

impl From<Point> for Coord {
    fn from(Point { x, y }: Point) -> Self {
        [x, y]
    }
}

/// Positioning of a `Point` with respect to a line.
#[derive(Debug, PartialEq)]
pub(crate) enum Positioning {
    Left,
    On,
    Right,
}

impl Point {
    /// Tests if a point is Left|On|Right of an infinite 2D line defined by two points.
    pub(crate) fn position(&self, [x1, y1]: Coord, [x2, y2]: Coord) -> Positioning {
        let Self { x: x0, y: y0 } = self;
        match ((x2 - x1) * (y0 - y1) - (x0 - x1) * (y2 - y1)).total_cmp(&0.) {
            std::cmp::Ordering::Greater => Positioning::Left,
            std::cmp::Ordering::Less => Positioning::Right,
            std::cmp::Ordering::Equal => Positioning::On,
        }
    }

    /// Computes the winding number of a ring around this [`Point`].
    ///
    /// This number can be:
    /// - `0` if the [`Point`] is not inside the ring
    /// - `> 0` if the ring winds at least once around the [`Point`] counter-clockwise
    /// - `< 0` if the ring winds at least once around the [`Point`] clockwise
    ///
    /// The ring may or may not repeat its first coordinate at the end: the closing segment of a
    /// closed ring is degenerate and never counts as a crossing.
    ///
    /// For more information, see <https://web.archive.org/web/20130126163405/http://geomalgorithms.com/a03-_inclusion.html>.
    pub fn wn(&self, ring: &[Coord]) -> isize {
        let mut wn = 0;
        for (&a, &b) in ring.iter().circular_tuple_windows() {
            let [_, ya] = a;
            let [_, yb] = b;
            if ya <= self.y {
                // `a` is below self
                if yb > self.y {
                    // an upward crossing
                    if matches!(self.position(a, b), Positioning::Left) {
                        wn += 1;
                    }
                }
            } else {
                // `a` is above self
                if yb <= self.y {
                    // a downward crossing
                    if matches!(self.position(a, b), Positioning::Right) {
                        wn -= 1;
                    }
                }
            }
        }
        wn
    }

    /// Returns `true` if the point is inside the input ring.
    pub fn is_inside(&self, ring: &[Coord]) -> bool {
        self.wn(ring) != 0
    }
}

impl Polygon {
    /// Returns `true` if the point is inside the outer ring and outside every hole.
    pub fn contains(&self, point: &Point) -> bool {
        point.is_inside(&self.exterior)
            && !self.interiors.iter().any(|hole| point.is_inside(hole))
    }
}

impl Geometry {
    /// Returns `true` if any polygon member contains the point.
    pub fn contains(&self, point: &Point) -> bool {
        self.polygons().iter().any(|polygon| polygon.contains(point))
    }
}
