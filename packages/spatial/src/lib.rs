#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial indexes for grid aggregation and lookup.
//!
//! Every index is an R-tree over bounding boxes; exact predicates
//! (`Intersects`, `Contains`) are only evaluated for the candidates whose
//! envelopes overlap the query. This keeps the cells x geometries predicate
//! evaluation of the aggregators far below the all-pairs cost.

use geo::{BoundingRect, Contains, Geometry, Intersects, MultiPolygon, Point, Polygon};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree, RTreeObject};

/// A geometry stored in the R-tree together with its precomputed envelope.
struct GeometryEntry {
    envelope: AABB<[f64; 2]>,
    geometry: Geometry<f64>,
}

impl RTreeObject for GeometryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Index over arbitrary geometries (points, lines, polygons) answering
/// "how many of these intersect this cell".
pub struct GeometryIndex {
    tree: RTree<GeometryEntry>,
}

impl GeometryIndex {
    /// Bulk loads the geometries. Geometries without a bounding box (empty
    /// collections) are skipped.
    #[must_use]
    pub fn new(geometries: impl IntoIterator<Item = Geometry<f64>>) -> Self {
        let entries: Vec<GeometryEntry> = geometries
            .into_iter()
            .filter_map(|geometry| {
                let envelope = envelope_of(&geometry)?;
                Some(GeometryEntry { envelope, geometry })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed geometries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Counts indexed geometries that intersect `area` (boundary contact
    /// included).
    #[must_use]
    pub fn count_intersecting(&self, area: &Polygon<f64>) -> usize {
        let Some(query_env) = polygon_envelope(area) else {
            return 0;
        };

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.geometry.intersects(area))
            .count()
    }
}

/// Index over points, keyed by their position in the input sequence.
pub struct PointIndex {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl PointIndex {
    /// Bulk loads the points; each point remembers its input position.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = Point<f64>>) -> Self {
        let entries: Vec<GeomWithData<[f64; 2], usize>> = points
            .into_iter()
            .enumerate()
            .map(|(idx, point)| GeomWithData::new([point.x(), point.y()], idx))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Returns the input positions of points strictly inside `area`, in
    /// ascending order.
    #[must_use]
    pub fn contained_in(&self, area: &Polygon<f64>) -> Vec<usize> {
        let Some(query_env) = polygon_envelope(area) else {
            return Vec::new();
        };

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope(&query_env)
            .filter(|entry| {
                let [x, y] = *entry.geom();
                area.contains(&Point::new(x, y))
            })
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();
        hits
    }
}

/// A polygon stored in the R-tree with its payload and insertion order.
struct PolygonEntry<T> {
    order: usize,
    value: T,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl<T> RTreeObject for PolygonEntry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Index over (multi)polygons carrying a payload, answering "which
/// polygon covers this point".
pub struct PolygonIndex<T> {
    tree: RTree<PolygonEntry<T>>,
}

impl<T> PolygonIndex<T> {
    /// Bulk loads the polygons. Empty polygons are skipped with a warning.
    #[must_use]
    pub fn new(polygons: impl IntoIterator<Item = (T, MultiPolygon<f64>)>) -> Self {
        let mut skipped = 0usize;
        let entries: Vec<PolygonEntry<T>> = polygons
            .into_iter()
            .enumerate()
            .filter_map(|(order, (value, polygon))| {
                let Some(rect) = polygon.bounding_rect() else {
                    skipped += 1;
                    return None;
                };
                Some(PolygonEntry {
                    order,
                    value,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    polygon,
                })
            })
            .collect();

        if skipped > 0 {
            log::warn!("Skipped {skipped} empty polygons while building polygon index");
        }

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Payloads of every polygon covering the point (boundary included),
    /// in insertion order.
    #[must_use]
    pub fn covering(&self, lng: f64, lat: f64) -> Vec<&T> {
        let point = Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        let mut hits: Vec<&PolygonEntry<T>> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&point))
            .collect();
        hits.sort_unstable_by_key(|entry| entry.order);
        hits.into_iter().map(|entry| &entry.value).collect()
    }

    /// The earliest inserted polygon covering the point.
    ///
    /// Polygons that tile a plane may share boundaries; the first one in
    /// insertion order wins.
    #[must_use]
    pub fn first_covering(&self, lng: f64, lat: f64) -> Option<&T> {
        let point = Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&point))
            .min_by_key(|entry| entry.order)
            .map(|entry| &entry.value)
    }
}

fn envelope_of(geometry: &Geometry<f64>) -> Option<AABB<[f64; 2]>> {
    geometry
        .bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

fn polygon_envelope(polygon: &Polygon<f64>) -> Option<AABB<[f64; 2]>> {
    polygon
        .bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, line_string, point, polygon};

    fn unit_square(x: f64, y: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]
    }

    #[test]
    fn counts_intersecting_geometries() {
        let line: LineString<f64> = line_string![(x: -1.0, y: 0.5), (x: 0.5, y: 0.5)];
        let index = GeometryIndex::new(vec![
            Geometry::Point(point!(x: 0.5, y: 0.5)),
            Geometry::Point(point!(x: 5.0, y: 5.0)),
            Geometry::LineString(line),
            Geometry::Polygon(unit_square(0.5, 0.5)),
        ]);

        assert_eq!(index.len(), 4);
        assert_eq!(index.count_intersecting(&unit_square(0.0, 0.0)), 3);
        assert_eq!(index.count_intersecting(&unit_square(10.0, 10.0)), 0);
    }

    #[test]
    fn counting_is_repeatable() {
        let index = GeometryIndex::new(vec![Geometry::Point(point!(x: 0.5, y: 0.5))]);
        let area = unit_square(0.0, 0.0);
        assert_eq!(index.count_intersecting(&area), index.count_intersecting(&area));
    }

    #[test]
    fn point_containment_excludes_boundary() {
        let index = PointIndex::new(vec![
            point!(x: 0.5, y: 0.5),
            point!(x: 1.0, y: 0.5),
            point!(x: 3.0, y: 3.0),
            point!(x: 0.25, y: 0.75),
        ]);

        assert_eq!(index.contained_in(&unit_square(0.0, 0.0)), vec![0, 3]);
    }

    #[test]
    fn first_covering_prefers_insertion_order() {
        let index = PolygonIndex::new(vec![
            ("west", MultiPolygon(vec![unit_square(0.0, 0.0)])),
            ("east", MultiPolygon(vec![unit_square(1.0, 0.0)])),
        ]);

        assert_eq!(index.first_covering(0.5, 0.5), Some(&"west"));
        assert_eq!(index.first_covering(1.5, 0.5), Some(&"east"));
        // Shared edge: both cover it, the first wins.
        assert_eq!(index.first_covering(1.0, 0.5), Some(&"west"));
        assert_eq!(index.covering(1.0, 0.5), vec![&"west", &"east"]);
        assert_eq!(index.first_covering(5.0, 5.0), None);
    }
}
