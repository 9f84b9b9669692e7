#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the scouting grid.
//!
//! A [`Cell`] is one square of the rasterized region. It owns a center
//! [`Coordinate`], a catchment polygon, the features computed for it by the
//! aggregators, and the cluster label written back by the model trainer.
//!
//! This crate contains only data types. It has no I/O and no geodesy.

use geo::{Point, Polygon};
use serde::{Deserialize, Serialize};

/// Stable cell identifier, assigned in row-major order at grid build time.
pub type CellId = u32;

/// A (longitude, latitude) pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Returns `true` if both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }

    /// Converts to a [`geo::Point`] with `x = longitude`, `y = latitude`.
    #[must_use]
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

impl From<Point<f64>> for Coordinate {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_point()
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            x: coordinate.longitude,
            y: coordinate.latitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.longitude, self.latitude)
    }
}

/// Integer identifier of a similarity group produced by clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub u32);

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered feature name to value mapping.
///
/// Keys keep their insertion order and are never duplicated: inserting an
/// existing name replaces its value in place. A `None` value is a null
/// (for example a left-join miss or a median over no venues).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureMap {
    entries: Vec<(String, Option<f64>)>,
}

impl FeatureMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts or replaces a feature value.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Returns the value for `name`, or `None` if it is absent or null.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| *v)
    }

    /// Returns `true` if a feature called `name` has been recorded, even if
    /// its value is null.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates features in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Collects the values of `names` in the given order.
    ///
    /// Returns `None` if any of them is absent or null.
    #[must_use]
    pub fn vector(&self, names: &[String]) -> Option<Vec<f64>> {
        names.iter().map(|name| self.value(name)).collect()
    }
}

/// One square of the scouting grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Unique row-major identifier.
    pub id: CellId,
    /// Center of the cell.
    pub center: Coordinate,
    /// Catchment quadrilateral used for intersection and containment.
    pub area: Polygon<f64>,
    /// Postal code (or other locality key) used by the demographic join.
    pub locality_key: Option<String>,
    /// Features populated by the aggregators.
    pub features: FeatureMap,
    /// Cluster label, set once by the model trainer.
    pub cluster: Option<ClusterId>,
}

impl Cell {
    #[must_use]
    pub const fn new(id: CellId, center: Coordinate, area: Polygon<f64>) -> Self {
        Self {
            id,
            center,
            area,
            locality_key: None,
            features: FeatureMap::new(),
            cluster: None,
        }
    }
}
