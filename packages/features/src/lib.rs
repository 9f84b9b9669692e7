#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-cell feature aggregation.
//!
//! Each aggregator consumes one external dataset and extends every cell's
//! feature map:
//!
//! - [`demographics::DemographicAggregator`] left-joins demographic rows by
//!   the cell's locality key.
//! - [`infrastructure::InfrastructureAggregator`] counts tagged map
//!   geometries intersecting each cell, one feature per catalogue category.
//! - [`venues::VenueAggregator`] counts ranked venues contained in each cell
//!   and summarizes their success percentiles.
//!
//! Aggregators never fail: records with unusable geometry are dropped and
//! logged.

pub mod demographics;
pub mod infrastructure;
pub mod progress;
pub mod venues;

use scout_grid_models::Cell;

pub use demographics::DemographicAggregator;
pub use infrastructure::{CATALOGUE, CategoryRule, InfrastructureAggregator, TagMatch};
pub use progress::{NullProgress, ProgressCallback, null_progress};
pub use venues::VenueAggregator;

/// A unit that extends cell feature maps from one dataset.
///
/// `populate` is pure with respect to the dataset and only ever adds (or
/// overwrites its own) feature names.
pub trait Aggregator {
    /// The dataset this aggregator reads.
    type Dataset: ?Sized;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Returns the cells with this aggregator's features added.
    fn populate(&self, cells: Vec<Cell>, dataset: &Self::Dataset) -> Vec<Cell>;
}

/// Converts a count into a feature value.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn count_value(count: usize) -> Option<f64> {
    Some(count as f64)
}
