#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Similarity queries against a labeled grid.
//!
//! A query point is mapped to the grid cell covering it, and that cell's
//! cluster label selects every other cell with the same label. Venues
//! inside the selected cells are then ranked by success percentile.
//!
//! Neighboring cells share their boundary edges, so a point exactly on an
//! edge is covered by more than one cell. The cell with the lowest id wins.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use scout_features_models::Venue;
use scout_grid_models::{Cell, CellId, ClusterId, Coordinate};
use scout_spatial::PolygonIndex;

/// Result of a similarity lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum SimilarCells<'a> {
    /// The point is covered by `matched`, whose cluster is `label`.
    Found {
        matched: CellId,
        label: ClusterId,
        /// Every cell with `label`, the matched cell included, in id order.
        cells: Vec<&'a Cell>,
    },
    /// No labeled cell covers the point.
    NotFound,
}

impl SimilarCells<'_> {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Ids of the similar cells; empty when nothing was found.
    #[must_use]
    pub fn cell_ids(&self) -> Vec<CellId> {
        match self {
            Self::Found { cells, .. } => cells.iter().map(|cell| cell.id).collect(),
            Self::NotFound => vec![],
        }
    }
}

/// Read-only lookup structure over labeled cells.
pub struct SimilarityIndex<'a> {
    lookup: PolygonIndex<&'a Cell>,
    clusters: BTreeMap<ClusterId, Vec<&'a Cell>>,
}

impl<'a> SimilarityIndex<'a> {
    /// Indexes the labeled cells. Cells without a cluster label cannot be
    /// matched and are left out.
    #[must_use]
    pub fn new(cells: &'a [Cell]) -> Self {
        let mut labeled: Vec<&Cell> = cells.iter().filter(|cell| cell.cluster.is_some()).collect();
        labeled.sort_by_key(|cell| cell.id);

        let skipped = cells.len() - labeled.len();
        if skipped > 0 {
            log::debug!("Similarity index skips {skipped} unlabeled cells");
        }

        let mut clusters: BTreeMap<ClusterId, Vec<&Cell>> = BTreeMap::new();
        for &cell in &labeled {
            if let Some(label) = cell.cluster {
                clusters.entry(label).or_default().push(cell);
            }
        }

        let lookup = PolygonIndex::new(
            labeled
                .into_iter()
                .map(|cell| (cell, MultiPolygon::new(vec![cell.area.clone()]))),
        );

        Self { lookup, clusters }
    }

    /// Number of cells that can be matched.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// The labeled cell covering `point`, lowest id first on shared edges.
    #[must_use]
    pub fn locate(&self, point: Coordinate) -> Option<&'a Cell> {
        self.lookup
            .first_covering(point.longitude, point.latitude)
            .copied()
    }

    /// All cells sharing the cluster of the cell covering `point`.
    #[must_use]
    pub fn similar_cells(&self, point: Coordinate) -> SimilarCells<'a> {
        if !point.is_finite() {
            return SimilarCells::NotFound;
        }

        let Some(matched) = self.locate(point) else {
            log::debug!("No labeled cell covers {point}");
            return SimilarCells::NotFound;
        };
        let Some(label) = matched.cluster else {
            return SimilarCells::NotFound;
        };

        let cells = self.clusters.get(&label).cloned().unwrap_or_default();
        log::debug!(
            "Point {point} is in cell {} (cluster {label}, {} similar cells)",
            matched.id,
            cells.len()
        );

        SimilarCells::Found {
            matched: matched.id,
            label,
            cells,
        }
    }
}

/// Venues covered by any of `cells`, best (lowest) percentile first.
///
/// Venues on the boundary of a cell count as inside it. Equal percentiles
/// keep their input order.
#[must_use]
pub fn rank_venues<'v>(cells: &[&Cell], venues: &'v [Venue]) -> Vec<&'v Venue> {
    if cells.is_empty() {
        return vec![];
    }

    let areas = PolygonIndex::new(
        cells
            .iter()
            .map(|cell| ((), MultiPolygon::new(vec![cell.area.clone()]))),
    );

    let mut ranked: Vec<&Venue> = venues
        .iter()
        .filter(|venue| venue.location.is_finite())
        .filter(|venue| {
            areas
                .first_covering(venue.location.longitude, venue.location.latitude)
                .is_some()
        })
        .collect();
    ranked.sort_by(|a, b| a.success_percentile.total_cmp(&b.success_percentile));
    ranked
}
