use crate::feature::GeometryRecord;
use crate::geometry::Coord;
use crate::point_locator::PointLocator;
use crate::winding_number::Point;

/// A point locator testing every record in turn.
///
/// Useful as a reference for [`SpatialIndex`](crate::SpatialIndex), with the same first-loaded
/// tie-break.
pub struct LinearScan<'a> {
    records: &'a [GeometryRecord],
}

impl<'a> LinearScan<'a> {
    pub fn new(records: &'a [GeometryRecord]) -> Self {
        Self { records }
    }
}

impl PointLocator for LinearScan<'_> {
    fn records(&self) -> &[GeometryRecord] {
        self.records
    }

    fn locate_one(&self, point: &Coord) -> Option<usize> {
        let point = Point::from(point);
        self.records.iter().position(|record| {
            record
                .geometry
                .as_ref()
                .is_some_and(|geometry| geometry.contains(&point))
        })
    }
}
