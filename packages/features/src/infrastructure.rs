//! Infrastructure counts from tagged map geometries.
//!
//! The [`CATALOGUE`] maps each feature to a tag predicate. For every
//! category the matching geometries are loaded into an R-tree and each
//! cell counts how many of them intersect its area. Categories and cells
//! fan out over `rayon`; the per-category count vectors are merged onto
//! the cells afterwards, so no cell is written concurrently.

use std::sync::Arc;
use std::time::Instant;

use geo::Validation as _;
use rayon::prelude::*;
use scout_features_models::{GeometryRecord, names};
use scout_grid_models::Cell;
use scout_spatial::GeometryIndex;

use crate::progress::{ProgressCallback, null_progress};
use crate::{Aggregator, count_value};

/// Which values of a tag select a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    /// Any value, as long as the tag is present.
    Any,
    /// One of the listed values.
    OneOf(&'static [&'static str]),
}

/// One row of the infrastructure catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    /// Feature name written onto cells.
    pub feature: &'static str,
    /// Map tag inspected.
    pub key: &'static str,
    /// Accepted values of the tag.
    pub values: TagMatch,
}

impl CategoryRule {
    /// Whether the record belongs to this category.
    #[must_use]
    pub fn matches(&self, record: &GeometryRecord) -> bool {
        match (record.tag(self.key), self.values) {
            (None, _) => false,
            (Some(_), TagMatch::Any) => true,
            (Some(value), TagMatch::OneOf(accepted)) => accepted.contains(&value),
        }
    }
}

const fn one_of(
    feature: &'static str,
    key: &'static str,
    values: &'static [&'static str],
) -> CategoryRule {
    CategoryRule {
        feature,
        key,
        values: TagMatch::OneOf(values),
    }
}

const fn any(feature: &'static str, key: &'static str) -> CategoryRule {
    CategoryRule {
        feature,
        key,
        values: TagMatch::Any,
    }
}

/// Infrastructure categories counted per cell.
pub const CATALOGUE: &[CategoryRule] = &[
    one_of(names::STREETS_MOTORWAYS, "highway", &["motorway"]),
    one_of(names::STREETS_MAJOR, "highway", &["trunk", "primary", "secondary"]),
    one_of(names::STREETS_MINOR, "highway", &["tertiary", "residential"]),
    one_of(
        names::STREETS_PEDESTRIAN,
        "highway",
        &["pedestrian", "footway", "living_street"],
    ),
    one_of(names::PUBLIC_TRANSPORT_STATION, "public_transport", &["station"]),
    one_of(names::PUBLIC_TRANSPORT_STOPS, "public_transport", &["stop_position"]),
    one_of(names::PUBLIC_BUILDINGS, "building", &["public"]),
    one_of(
        names::RESIDENTIAL_BUILDINGS,
        "building",
        &["residential", "apartments", "house"],
    ),
    one_of(names::SCHOOLS, "amenity", &["school"]),
    one_of(names::UNIVERSITIES, "amenity", &["university", "college"]),
    one_of(names::PARKINGS, "amenity", &["parking"]),
    one_of(names::HOSPITALS, "amenity", &["hospital"]),
    one_of(
        names::ENTERTAINMENTS,
        "amenity",
        &["arts_centre", "cinema", "theatre"],
    ),
    // Any `leisure` value. Keying this on `amenity` would recount schools,
    // parkings, bars and food under leisure.
    any(names::LEISURES, "leisure"),
    one_of(names::BARS, "amenity", &["bar", "nightclub", "pub", "biergarten"]),
    one_of(names::FOODS, "amenity", &["restaurant", "cafe", "fast_food"]),
    one_of(names::SUPERMARKETS, "shop", &["supermarket"]),
    any(names::SHOPS, "shop"),
    any(names::TOURISMS, "tourism"),
];

/// Tag keys that make a geometry relevant to the catalogue.
pub const RELEVANT_TAGS: &[&str] = &[
    "highway",
    "railway",
    "public_transport",
    "amenity",
    "building",
    "tourism",
    "shop",
    "leisure",
];

/// Counts catalogue geometries intersecting each cell.
pub struct InfrastructureAggregator {
    rules: Vec<CategoryRule>,
    progress: Arc<dyn ProgressCallback>,
}

impl Default for InfrastructureAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl InfrastructureAggregator {
    /// Aggregator over the full [`CATALOGUE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_rules(CATALOGUE.to_vec())
    }

    /// Aggregator over a custom set of categories.
    #[must_use]
    pub fn with_rules(rules: Vec<CategoryRule>) -> Self {
        Self {
            rules,
            progress: null_progress(),
        }
    }

    /// Reports one unit of progress per finished category.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// The categories this aggregator counts.
    #[must_use]
    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Per-cell counts for one category, in cell order.
    fn count_category(
        rule: &CategoryRule,
        records: &[&GeometryRecord],
        cells: &[Cell],
    ) -> Vec<usize> {
        let index = GeometryIndex::new(
            records
                .iter()
                .filter(|record| rule.matches(record))
                .map(|record| record.geometry.clone()),
        );
        log::debug!("{}: {} geometries", rule.feature, index.len());

        if index.is_empty() {
            return vec![0; cells.len()];
        }

        cells
            .par_iter()
            .map(|cell| index.count_intersecting(&cell.area))
            .collect()
    }
}

impl Aggregator for InfrastructureAggregator {
    type Dataset = [GeometryRecord];

    fn name(&self) -> &'static str {
        "infrastructure"
    }

    fn populate(&self, mut cells: Vec<Cell>, dataset: &[GeometryRecord]) -> Vec<Cell> {
        let start = Instant::now();

        let records: Vec<&GeometryRecord> = dataset
            .iter()
            .filter(|record| record.geometry.is_valid())
            .collect();
        let dropped = dataset.len() - records.len();
        if dropped > 0 {
            log::warn!("Dropped {dropped} geometries with invalid shapes");
        }

        self.progress.set_total(self.rules.len() as u64);
        self.progress.set_message("Counting infrastructure".to_string());

        let counts: Vec<(&'static str, Vec<usize>)> = self
            .rules
            .par_iter()
            .map(|rule| {
                let per_cell = Self::count_category(rule, &records, &cells);
                self.progress.inc(1);
                (rule.feature, per_cell)
            })
            .collect();

        for (feature, per_cell) in counts {
            for (cell, count) in cells.iter_mut().zip(per_cell) {
                cell.features.insert(feature, count_value(count));
            }
        }

        self.progress.finish(format!(
            "Counted {} categories over {} cells",
            self.rules.len(),
            cells.len()
        ));
        log::info!(
            "Infrastructure counts for {} cells from {} geometries in {:.2}s",
            cells.len(),
            records.len(),
            start.elapsed().as_secs_f64()
        );

        cells
    }
}
