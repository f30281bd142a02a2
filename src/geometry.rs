use itertools::{Itertools, MinMaxResult};
use serde::Deserialize;

/// A `[lon, lat]` coordinate pair, in degrees.
pub type Coord = [f64; 2];

/// An ordered sequence of coordinates bounding an area.
///
/// Rings coming from GeoJSON are closed: the first coordinate is repeated at the end.
pub type Ring = Vec<Coord>;

/// A polygon made of one outer ring and zero or more holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub exterior: Ring,
    pub interiors: Vec<Ring>,
}

impl Polygon {
    /// Constructs a new [`Polygon`] from its outer ring and holes.
    pub fn new(exterior: Ring, interiors: Vec<Ring>) -> Self {
        Self {
            exterior,
            interiors,
        }
    }

    /// The bounding box of the outer ring, or [`None`] if the ring is empty.
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_ring(&self.exterior)
    }
}

impl From<Vec<Ring>> for Polygon {
    /// GeoJSON layout: the first ring is the outer boundary, the others are holes.
    fn from(rings: Vec<Ring>) -> Self {
        let mut rings = rings.into_iter();
        let exterior = rings.next().unwrap_or_default();
        Self::new(exterior, rings.collect())
    }
}

/// The geometry attached to a gazetteer record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "GeoJsonGeometry")]
pub enum Geometry {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
    /// Any other GeoJSON geometry type. Kept on the record but never matched by a query.
    Unsupported,
}

impl Geometry {
    /// The polygon members of this geometry, in order.
    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Self::Polygon(polygon) => std::slice::from_ref(polygon),
            Self::MultiPolygon(polygons) => polygons,
            Self::Unsupported => &[],
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Polygon {
        coordinates: Vec<Ring>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
    #[serde(other)]
    Unsupported,
}

impl From<GeoJsonGeometry> for Geometry {
    fn from(value: GeoJsonGeometry) -> Self {
        match value {
            GeoJsonGeometry::Polygon { coordinates } => Self::Polygon(coordinates.into()),
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                Self::MultiPolygon(coordinates.into_iter().map(Polygon::from).collect())
            }
            GeoJsonGeometry::Unsupported => Self::Unsupported,
        }
    }
}

/// An axis-aligned bounding box, bounds included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Computes the bounding box of a ring, or [`None`] if the ring is empty.
    pub fn from_ring(ring: &[Coord]) -> Option<Self> {
        let (xmin, xmax) = match ring.iter().map(|&[x, _]| x).minmax_by(f64::total_cmp) {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(x) => (x, x),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        let (ymin, ymax) = match ring.iter().map(|&[_, y]| y).minmax_by(f64::total_cmp) {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(y) => (y, y),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        Some(Self {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    /// The smallest box covering both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            ymin: self.ymin.min(other.ymin),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// Returns `true` if `[x, y]` lies in the box or on its boundary.
    pub fn contains(&self, &[x, y]: &Coord) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Returns `true` if `other` lies entirely in the box.
    pub fn covers(&self, other: &Self) -> bool {
        self.xmin <= other.xmin
            && other.xmax <= self.xmax
            && self.ymin <= other.ymin
            && other.ymax <= self.ymax
    }

    /// Returns `true` if the two boxes share at least one point.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }
}
