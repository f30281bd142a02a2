use smallvec::SmallVec;
use tracing::info;

use crate::feature::{FeatureCollection, GeometryRecord};
use crate::geometry::{BoundingBox, Coord, Polygon};
use crate::point_locator::PointLocator;
use crate::winding_number::Point;

/// Default number of polygons a node may hold before being split.
pub const DEFAULT_CAPACITY: usize = 8;

/// Nodes are never split past this depth.
pub const MAX_DEPTH: usize = 20;

/// A point-in-polygon index over the records of one layer.
///
/// This is a region quadtree built over the bounding boxes of the outer rings: the root node is
/// the square enclosing every polygon, and a node holding more than `capacity` polygons is split
/// into four quadrants, each keeping the polygons whose bounding box overlaps it. A polygon
/// overlapping several quadrants is referenced by each of them.
///
/// To locate a point, we walk down to the deepest node containing it, then test its polygons in
/// insertion order: first against their bounding box, then with the winding number of the outer
/// ring and of every hole.
///
/// When several polygons contain the point, the record loaded first wins. Node polygon lists
/// are always sorted in insertion order, so this does not depend on the shape of the tree.
///
/// The index owns the records it was built from, and is never mutated after construction.
#[derive(Debug)]
pub struct SpatialIndex {
    records: Vec<GeometryRecord>,
    entries: Vec<Entry>,
    arena: Vec<Node>,
}

/// One polygon member of a record.
#[derive(Debug, Clone, Copy)]
struct Entry {
    record: usize,
    polygon: usize,
    bbox: BoundingBox,
}

#[derive(Debug)]
struct Node {
    // Lower-left corner and side length
    xc: f64,
    yc: f64,
    h: f64,
    // Children, in order: south-west, south-east, north-west, north-east
    children: [Option<usize>; 4],
    // Conflict list: indices of the entries overlapping this node, sorted
    conflicts: SmallVec<[usize; DEFAULT_CAPACITY]>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    fn contains(&self, &[x, y]: &Coord) -> bool {
        x >= self.xc && x <= self.xc + self.h && y >= self.yc && y <= self.yc + self.h
    }

    /// The quadrant a point of this node falls into.
    ///
    /// Points on the dividing lines go to the south and west quadrants.
    fn quadrant(&self, &[x, y]: &Coord) -> usize {
        let h2 = self.h / 2.;
        match (x <= self.xc + h2, y <= self.yc + h2) {
            (true, true) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (false, false) => 3,
        }
    }
}

impl SpatialIndex {
    /// Builds the index of a layer with the default node capacity.
    pub fn build(collection: FeatureCollection) -> Self {
        Self::with_capacity(collection, DEFAULT_CAPACITY)
    }

    /// Builds the index of a layer, splitting nodes holding more than `capacity` polygons.
    pub fn with_capacity(collection: FeatureCollection, capacity: usize) -> Self {
        let records = collection.into_records();

        let mut entries = Vec::new();
        for (record_idx, record) in records.iter().enumerate() {
            let Some(geometry) = &record.geometry else {
                continue;
            };
            for (polygon_idx, polygon) in geometry.polygons().iter().enumerate() {
                if let Some(bbox) = polygon.bbox() {
                    entries.push(Entry {
                        record: record_idx,
                        polygon: polygon_idx,
                        bbox,
                    });
                }
            }
        }

        let mut index = Self {
            records,
            entries,
            arena: Vec::new(),
        };

        let Some(extent) = index
            .entries
            .iter()
            .map(|entry| entry.bbox)
            .reduce(|a, b| a.union(&b))
        else {
            info!(records = index.records.len(), "built an empty spatial index");
            return index;
        };

        let h = (extent.xmax - extent.xmin)
            .max(extent.ymax - extent.ymin)
            .max(f64::EPSILON);
        index.arena.push(Node {
            xc: extent.xmin,
            yc: extent.ymin,
            h,
            children: [None; 4],
            conflicts: (0..index.entries.len()).collect(),
        });
        if index.entries.len() > capacity {
            index.split(0, 0, capacity.max(1));
        }

        info!(
            records = index.records.len(),
            polygons = index.entries.len(),
            nodes = index.arena.len(),
            depth = index.depth(),
            "built spatial index"
        );
        index
    }

    fn split(&mut self, id: usize, depth: usize, capacity: usize) {
        let (xc, yc, h) = {
            let node = &self.arena[id];
            (node.xc, node.yc, node.h)
        };
        let h2 = h / 2.;
        let parent_count = self.arena[id].conflicts.len();

        let corners = [(xc, yc), (xc + h2, yc), (xc, yc + h2), (xc + h2, yc + h2)];
        for (quadrant, (x, y)) in corners.into_iter().enumerate() {
            let cell = BoundingBox {
                xmin: x,
                xmax: x + h2,
                ymin: y,
                ymax: y + h2,
            };
            let conflicts: SmallVec<[usize; DEFAULT_CAPACITY]> = self.arena[id]
                .conflicts
                .iter()
                .copied()
                .filter(|&entry| self.entries[entry].bbox.overlaps(&cell))
                .collect();
            if conflicts.is_empty() {
                continue;
            }

            let conflict_count = conflicts.len();
            let prunable = self.can_prune(&conflicts, &cell, parent_count);
            let child_id = self.arena.len();
            self.arena.push(Node {
                xc: x,
                yc: y,
                h: h2,
                children: [None; 4],
                conflicts,
            });
            self.arena[id].children[quadrant] = Some(child_id);

            if conflict_count > capacity && prunable && depth + 1 < MAX_DEPTH {
                self.split(child_id, depth + 1, capacity);
            }
        }
    }

    /// Whether splitting a cell holding `conflicts` may leave some of them out of a quadrant.
    ///
    /// It cannot when every box covers the whole cell. When the cell kept all of its parent's
    /// entries, it can only if they are clustered in a part of it.
    fn can_prune(&self, conflicts: &[usize], cell: &BoundingBox, parent_count: usize) -> bool {
        let boxes = || conflicts.iter().map(|&entry| self.entries[entry].bbox);
        if boxes().all(|bbox| bbox.covers(cell)) {
            return false;
        }
        if conflicts.len() < parent_count {
            return true;
        }
        boxes()
            .reduce(|a, b| a.union(&b))
            .is_some_and(|extent| !extent.covers(cell))
    }

    /// The records of the layer, in load order.
    pub fn records(&self) -> &[GeometryRecord] {
        &self.records
    }

    /// Number of indexed polygons.
    pub fn polygon_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Depth of the deepest node, the root being at depth 0.
    pub fn depth(&self) -> usize {
        fn depth_from(arena: &[Node], id: usize) -> usize {
            arena[id]
                .children
                .iter()
                .flatten()
                .map(|&child| 1 + depth_from(arena, child))
                .max()
                .unwrap_or(0)
        }
        if self.arena.is_empty() {
            0
        } else {
            depth_from(&self.arena, 0)
        }
    }

    /// The deepest node containing the point, if any.
    fn find_leaf(&self, point: &Coord) -> Option<&Node> {
        let mut node = self.arena.first()?;
        if !node.contains(point) {
            return None;
        }
        while !node.is_leaf() {
            // A missing quadrant has no polygon overlapping it
            node = &self.arena[node.children[node.quadrant(point)]?];
        }
        Some(node)
    }

    fn polygon(&self, entry: &Entry) -> Option<&Polygon> {
        self.records[entry.record]
            .geometry
            .as_ref()?
            .polygons()
            .get(entry.polygon)
    }
}

impl PointLocator for SpatialIndex {
    fn records(&self) -> &[GeometryRecord] {
        &self.records
    }

    fn locate_one(&self, point: &Coord) -> Option<usize> {
        let leaf = self.find_leaf(point)?;
        let query = Point::from(point);
        leaf.conflicts
            .iter()
            .map(|&idx| &self.entries[idx])
            .filter(|entry| entry.bbox.contains(point))
            .find(|entry| {
                self.polygon(entry)
                    .is_some_and(|polygon| polygon.contains(&query))
            })
            .map(|entry| entry.record)
    }
}
