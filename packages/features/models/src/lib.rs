#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types for the datasets the aggregators consume.
//!
//! Three external datasets feed the grid: tabular demographics keyed by
//! postal code, tagged map geometries (streets, transit, buildings,
//! amenities), and ranked venues. Records are immutable once loaded.

pub mod names;

use std::collections::BTreeMap;

use geo::Geometry;
use scout_grid_models::Coordinate;
use serde::{Deserialize, Serialize};

/// One row of the demographic table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    /// Locality key the row is joined on (postal code).
    pub locality_key: String,
    /// Numeric attributes in column order. `None` marks an empty or
    /// unparseable value.
    pub attributes: Vec<(String, Option<f64>)>,
}

/// A tagged map geometry (street, station, building, amenity, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    /// Selected map tags, e.g. `highway = "primary"`.
    pub tags: BTreeMap<String, String>,
    /// Shape in WGS84 longitude/latitude.
    pub geometry: Geometry<f64>,
    /// Optional display name.
    pub name: Option<String>,
}

impl GeometryRecord {
    /// Value of a tag, if present.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Price tier of a venue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum PriceLevel {
    #[strum(serialize = "$")]
    #[serde(rename = "$")]
    CheapEats,
    #[strum(serialize = "$$ - $$$")]
    #[serde(rename = "$$ - $$$")]
    MidRange,
    #[strum(serialize = "$$$$")]
    #[serde(rename = "$$$$")]
    FineDining,
}

impl PriceLevel {
    /// Feature name counting successful venues of this tier.
    #[must_use]
    pub const fn successful_feature(self) -> &'static str {
        match self {
            Self::CheapEats => names::SUCCESSFUL_CHEAP_EATS,
            Self::MidRange => names::SUCCESSFUL_MID_RANGE,
            Self::FineDining => names::SUCCESSFUL_FINE_DINING,
        }
    }
}

/// A ranked venue (restaurant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    pub location: Coordinate,
    /// Rank relative to all venues of the reference population, in
    /// percent. Lower is better.
    pub success_percentile: f64,
    pub price_level: Option<PriceLevel>,
    pub cuisine: Vec<String>,
}

impl Venue {
    /// Whether this venue ranks better than `threshold` percent.
    #[must_use]
    pub fn is_successful(&self, threshold: f64) -> bool {
        self.success_percentile < threshold
    }

    /// Whether the percentile lies in `[0, 100]`.
    #[must_use]
    pub fn has_valid_percentile(&self) -> bool {
        (0.0..=100.0).contains(&self.success_percentile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn parses_price_levels() {
        assert_eq!(PriceLevel::from_str("$").unwrap(), PriceLevel::CheapEats);
        assert_eq!(
            PriceLevel::from_str("$$ - $$$").unwrap(),
            PriceLevel::MidRange
        );
        assert_eq!(PriceLevel::from_str("$$$$").unwrap(), PriceLevel::FineDining);
        assert!(PriceLevel::from_str("$$").is_err());
    }

    #[test]
    fn success_is_strictly_below_threshold() {
        let venue = Venue {
            name: "Zeughauskeller".to_string(),
            location: Coordinate::new(8.539, 47.371),
            success_percentile: 30.0,
            price_level: None,
            cuisine: vec![],
        };
        assert!(!venue.is_successful(30.0));
        assert!(venue.is_successful(30.1));
    }
}
