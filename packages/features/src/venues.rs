//! Venue statistics per cell.
//!
//! A venue belongs to a cell when its point lies strictly inside the cell
//! area. Besides the raw count each cell gets the median success
//! percentile of its venues (null when it has none) and the number of
//! successful venues overall and per price tier.

use std::time::Instant;

use rayon::prelude::*;
use scout_features_models::{PriceLevel, Venue, names};
use scout_grid_models::Cell;
use scout_spatial::PointIndex;
use strum::IntoEnumIterator as _;

use crate::{Aggregator, count_value};

/// Default success threshold: venues ranked in the top 30 percent.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 30.0;

/// Summarizes ranked venues contained in each cell.
#[derive(Debug, Clone, Copy)]
pub struct VenueAggregator {
    success_threshold: f64,
}

impl Default for VenueAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_SUCCESS_THRESHOLD)
    }
}

#[derive(Debug, Default)]
struct VenueStats {
    count: usize,
    median_percentile: Option<f64>,
    successful: usize,
    successful_by_price: Vec<(PriceLevel, usize)>,
}

impl VenueAggregator {
    /// `success_threshold` is the percentile below which a venue counts as
    /// successful.
    #[must_use]
    pub const fn new(success_threshold: f64) -> Self {
        Self { success_threshold }
    }

    #[must_use]
    pub const fn success_threshold(&self) -> f64 {
        self.success_threshold
    }

    fn stats(&self, venues: &[&Venue]) -> VenueStats {
        let successful: Vec<&&Venue> = venues
            .iter()
            .filter(|venue| venue.is_successful(self.success_threshold))
            .collect();

        let successful_by_price = PriceLevel::iter()
            .map(|level| {
                let count = successful
                    .iter()
                    .filter(|venue| venue.price_level == Some(level))
                    .count();
                (level, count)
            })
            .collect();

        VenueStats {
            count: venues.len(),
            median_percentile: median(venues.iter().map(|venue| venue.success_percentile)),
            successful: successful.len(),
            successful_by_price,
        }
    }
}

impl Aggregator for VenueAggregator {
    type Dataset = [Venue];

    fn name(&self) -> &'static str {
        "venues"
    }

    fn populate(&self, mut cells: Vec<Cell>, dataset: &[Venue]) -> Vec<Cell> {
        let start = Instant::now();

        let usable: Vec<&Venue> = dataset
            .iter()
            .filter(|venue| venue.location.is_finite() && venue.has_valid_percentile())
            .collect();
        let dropped = dataset.len() - usable.len();
        if dropped > 0 {
            log::warn!("Dropped {dropped} venues without a location or a percentile in [0, 100]");
        }

        let index = PointIndex::new(usable.iter().map(|venue| venue.location.to_point()));

        let stats: Vec<VenueStats> = cells
            .par_iter()
            .map(|cell| {
                let contained: Vec<&Venue> = index
                    .contained_in(&cell.area)
                    .into_iter()
                    .map(|idx| usable[idx])
                    .collect();
                self.stats(&contained)
            })
            .collect();

        for (cell, stats) in cells.iter_mut().zip(stats) {
            let features = &mut cell.features;
            features.insert(names::RESTAURANTS, count_value(stats.count));
            features.insert(names::MEDIAN_RANKING_PERCENTILE, stats.median_percentile);
            features.insert(names::SUCCESSFUL_RESTAURANTS, count_value(stats.successful));
            features.insert(
                names::SUCCESSFUL_RESTAURANTS_ANY,
                Some(if stats.successful > 0 { 1.0 } else { 0.0 }),
            );
            for (level, count) in stats.successful_by_price {
                features.insert(level.successful_feature(), count_value(count));
            }
        }

        log::info!(
            "Venue statistics for {} cells from {} venues in {:.2}s",
            cells.len(),
            usable.len(),
            start.elapsed().as_secs_f64()
        );

        cells
    }
}

/// Median of the values, averaging the two middle values for even counts.
fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(f64::midpoint(values[mid - 1], values[mid]))
    } else {
        Some(values[mid])
    }
}
