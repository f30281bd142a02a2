use rayon::prelude::*;

use crate::feature::GeometryRecord;
use crate::geometry::Coord;

/// A trait to locate one or several `[lon, lat]` query points among the polygons of a layer.
///
/// Locations are indices into [`records`](PointLocator::records).
pub trait PointLocator {
    /// The records the locator searches, in load order.
    fn records(&self) -> &[GeometryRecord];

    /// Locates one query point.
    ///
    /// Returns [`None`] if the query point does not lie in any polygon.
    fn locate_one(&self, point: &Coord) -> Option<usize>;

    /// Locates one query point and returns the matching record.
    fn locate_record(&self, point: &Coord) -> Option<&GeometryRecord> {
        self.locate_one(point).map(|idx| &self.records()[idx])
    }

    /// Locates several query points.
    fn locate_many(&self, points: &[Coord]) -> Vec<Option<usize>> {
        points.iter().map(|point| self.locate_one(point)).collect()
    }

    /// Locates several query points in parallel.
    fn par_locate_many(&self, points: &[Coord]) -> Vec<Option<usize>>
    where
        Self: std::marker::Sync,
    {
        points
            .par_iter()
            .map(|point| self.locate_one(point))
            .collect()
    }
}
