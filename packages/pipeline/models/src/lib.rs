#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration and result types shared by the pipeline and its callers.
//!
//! Every configuration section has defaults matching the Zurich
//! deployment, so an empty TOML file is a valid configuration.

use std::path::PathBuf;

use scout_features_models::{PriceLevel, Venue, names};
use scout_grid_models::Coordinate;
use serde::{Deserialize, Serialize};

/// Zurich main station, the default region center.
pub const DEFAULT_CENTER: Coordinate = Coordinate::new(8.540_251_5, 47.377_787_3);
pub const DEFAULT_REGION_SIDE_M: f64 = 10_000.0;
pub const DEFAULT_CELL_SIDE_M: f64 = 200.0;
pub const DEFAULT_CLUSTER_COUNT: usize = 20;
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 30.0;
pub const DEFAULT_CV_FOLDS: usize = 10;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub region: RegionConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
    pub store: StoreConfig,
}

/// The square region the grid covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Longitude of the region center.
    pub longitude: f64,
    /// Latitude of the region center.
    pub latitude: f64,
    /// Side length of the region in meters.
    pub side_m: f64,
    /// Side length of one cell in meters.
    pub cell_side_m: f64,
}

impl RegionConfig {
    #[must_use]
    pub const fn center(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            longitude: DEFAULT_CENTER.longitude,
            latitude: DEFAULT_CENTER.latitude,
            side_m: DEFAULT_REGION_SIDE_M,
            cell_side_m: DEFAULT_CELL_SIDE_M,
        }
    }
}

/// Training and success-definition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub cluster_count: usize,
    /// Venues ranked below this percentile count as successful.
    pub success_percentile_threshold: f64,
    pub seed: u64,
    pub cv_folds: usize,
    /// Candidate features in vector order.
    pub features: Vec<String>,
    pub target: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            cluster_count: DEFAULT_CLUSTER_COUNT,
            success_percentile_threshold: DEFAULT_SUCCESS_THRESHOLD,
            seed: 0,
            cv_folds: DEFAULT_CV_FOLDS,
            features: names::DEFAULT_MODEL_FEATURES
                .iter()
                .map(|&name| name.to_string())
                .collect(),
            target: names::DEFAULT_TARGET.to_string(),
        }
    }
}

/// Dataset locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// `GeoJSON` map features.
    pub geometries: PathBuf,
    /// CSV demographic table.
    pub demographics: PathBuf,
    /// CSV ranked venues.
    pub venues: PathBuf,
    /// `GeoJSON` postal code boundaries. Without it cells get no locality
    /// key and demographic features stay null.
    pub postal_boundaries: Option<PathBuf>,
    /// Property of a boundary feature holding its postal code.
    pub postal_code_property: String,
    /// Column of the demographic table holding the postal code.
    pub demographics_key: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            geometries: PathBuf::from("data/zurich.geojson"),
            demographics: PathBuf::from("data/zurich_demographics.csv"),
            venues: PathBuf::from("data/zurich_venues.csv"),
            postal_boundaries: Some(PathBuf::from("data/zurich_postal_codes.geojson")),
            postal_code_property: "plz".to_string(),
            demographics_key: "zipcode".to_string(),
        }
    }
}

/// Where built artifacts are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/artifacts"),
        }
    }
}

/// One venue in a query answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVenue {
    pub name: String,
    pub success_percentile: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<PriceLevel>,
    pub cuisine: Vec<String>,
}

impl From<&Venue> for RankedVenue {
    fn from(venue: &Venue) -> Self {
        Self {
            name: venue.name.clone(),
            success_percentile: venue.success_percentile,
            price_level: venue.price_level,
            cuisine: venue.cuisine.clone(),
        }
    }
}

/// Answer to a point query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResult {
    /// Venues in cells similar to the queried point, best first.
    Ranked {
        /// Cells sharing the queried cell's cluster.
        similar_cells: usize,
        venues: Vec<RankedVenue>,
    },
    /// The point is not inside any labeled cell.
    NoSimilarLocation,
}

impl QueryResult {
    /// Ranked venues; empty for [`QueryResult::NoSimilarLocation`].
    #[must_use]
    pub fn venues(&self) -> &[RankedVenue] {
        match self {
            Self::Ranked { venues, .. } => venues,
            Self::NoSimilarLocation => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ScoutConfig = toml::from_str("").unwrap();
        assert_eq!(config, ScoutConfig::default());
        assert_eq!(config.model.features.len(), 22);
        assert_eq!(config.region.center(), DEFAULT_CENTER);
    }

    #[test]
    fn sections_override_individually() {
        let config: ScoutConfig = toml::from_str(
            r#"
            [region]
            side_m = 1000.0
            cell_side_m = 500.0

            [model]
            cluster_count = 4
            features = ["population", "bars"]
            "#,
        )
        .unwrap();

        assert!((config.region.side_m - 1000.0).abs() < f64::EPSILON);
        assert!((config.region.longitude - DEFAULT_CENTER.longitude).abs() < f64::EPSILON);
        assert_eq!(config.model.cluster_count, 4);
        assert_eq!(config.model.features, vec!["population", "bars"]);
        assert_eq!(config.model.target, names::DEFAULT_TARGET);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn query_result_serializes_with_status_tag() {
        let result = QueryResult::Ranked {
            similar_cells: 2,
            venues: vec![RankedVenue {
                name: "Kronenhalle".to_string(),
                success_percentile: 0.2,
                price_level: Some(PriceLevel::FineDining),
                cuisine: vec!["Swiss".to_string()],
            }],
        };
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "ranked");
        assert_eq!(json["venues"][0]["price_level"], "$$$$");

        let none = serde_json::to_value(QueryResult::NoSimilarLocation).unwrap();
        assert_eq!(none["status"], "no_similar_location");
    }
}
