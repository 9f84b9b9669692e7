#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scouting grid construction.
//!
//! Rasterizes a square region around a center coordinate into
//! `dimension x dimension` square cells. All offsets are geodesic walks
//! (see [`geodesy`]), so cells stay close to true squares on the ground
//! regardless of latitude.
//!
//! Layout: cell `0` sits in the north-east corner, ids increase westward
//! along a row and rows advance southward.

pub mod geodesy;

use std::f64::consts::SQRT_2;

use geo::{LineString, Polygon, Validation as _};
use scout_grid_models::{Cell, CellId, Coordinate};

use crate::geodesy::{Bearing, GeodesyError, walk_toward};

/// Errors that can occur while building a grid.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Region or cell dimensions were rejected.
    #[error("Invalid grid input: {message}")]
    InvalidInput {
        /// Description of what was rejected.
        message: String,
    },

    /// A geodesic walk failed.
    #[error("Geodesy error: {0}")]
    Geodesy(#[from] GeodesyError),

    /// A constructed cell polygon is not a valid simple polygon.
    #[error("Cell {id} has an invalid catchment polygon")]
    InvalidCell {
        /// Identifier of the offending cell.
        id: CellId,
    },
}

/// Derived measurements of a grid configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// Cells per side.
    pub dimension: usize,
    /// Side length of one cell in meters.
    pub cell_side_m: f64,
    /// Half diagonal of the whole region in meters.
    pub region_radius_m: f64,
    /// Half diagonal of one cell in meters.
    pub cell_radius_m: f64,
}

impl GridLayout {
    /// Computes the layout for a region and cell size.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidInput`] if either side length is not a
    /// positive finite number.
    pub fn new(region_side_m: f64, cell_side_m: f64) -> Result<Self, GridError> {
        for (label, value) in [("region side", region_side_m), ("cell side", cell_side_m)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GridError::InvalidInput {
                    message: format!("{label} must be a positive number of meters, got {value}"),
                });
            }
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let dimension = (region_side_m / cell_side_m).floor() as usize;

        Ok(Self {
            dimension,
            cell_side_m,
            region_radius_m: region_side_m / SQRT_2,
            cell_radius_m: cell_side_m / SQRT_2,
        })
    }

    /// Total number of cells.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidInput`] if the count overflows or does not
    /// fit into a [`CellId`].
    pub fn cell_count(&self) -> Result<usize, GridError> {
        self.dimension
            .checked_mul(self.dimension)
            .filter(|&count| CellId::try_from(count).is_ok())
            .ok_or_else(|| GridError::InvalidInput {
                message: format!(
                    "a {0}x{0} grid does not fit into cell ids",
                    self.dimension
                ),
            })
    }
}

/// Builds the grid of cells covering the square region around `center`.
///
/// A region smaller than one cell yields an empty grid.
///
/// # Errors
///
/// Returns [`GridError`] if the inputs are not usable, a geodesic walk
/// fails, or a cell polygon comes out invalid.
pub fn build_grid(
    center: Coordinate,
    region_side_m: f64,
    cell_side_m: f64,
) -> Result<Vec<Cell>, GridError> {
    if !center.is_finite() {
        return Err(GridError::InvalidInput {
            message: format!("center {center} is not finite"),
        });
    }

    let layout = GridLayout::new(region_side_m, cell_side_m)?;
    if layout.dimension == 0 {
        log::warn!(
            "Region side {region_side_m}m is smaller than cell side {cell_side_m}m, grid is empty"
        );
        return Ok(Vec::new());
    }

    let cell_count = layout.cell_count()?;

    log::info!(
        "Building {0}x{0} grid of {cell_side_m}m cells around {center}",
        layout.dimension
    );

    // North-east corner of the region, then the center of the first cell.
    let corner = walk_toward(center, Bearing::NorthEast, layout.region_radius_m)?;
    let mut row_start = walk_toward(corner, Bearing::SouthWest, layout.cell_radius_m)?;

    let mut cells = Vec::with_capacity(cell_count);
    let mut next_id: CellId = 0;

    for _ in 0..layout.dimension {
        let mut here = row_start;
        for _ in 0..layout.dimension {
            let area = cell_area(here, layout.cell_radius_m)?;
            if !area.is_valid() {
                return Err(GridError::InvalidCell { id: next_id });
            }
            cells.push(Cell::new(next_id, here, area));
            next_id += 1;

            here = walk_toward(here, Bearing::West, layout.cell_side_m)?;
        }
        row_start = walk_toward(row_start, Bearing::South, layout.cell_side_m)?;
    }

    Ok(cells)
}

/// Catchment quadrilateral of a cell: the four diagonal walks from its
/// center by the cell's half diagonal.
///
/// # Errors
///
/// Returns [`GeodesyError`] if any of the walks fail.
pub fn cell_area(center: Coordinate, cell_radius_m: f64) -> Result<Polygon<f64>, GeodesyError> {
    let corners = [
        Bearing::NorthEast,
        Bearing::SouthEast,
        Bearing::SouthWest,
        Bearing::NorthWest,
    ]
    .into_iter()
    .map(|bearing| walk_toward(center, bearing, cell_radius_m).map(geo::Coord::from))
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(LineString::from(corners), vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Contains as _, Distance as _, Geodesic};

    const ZURICH_HB: Coordinate = Coordinate::new(8.540_251_5, 47.377_787_3);

    fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
        Geodesic.distance(a.to_point(), b.to_point())
    }

    #[test]
    fn builds_two_by_two_grid() {
        let cells = build_grid(ZURICH_HB, 1000.0, 500.0).unwrap();
        assert_eq!(cells.len(), 4);

        // 0 1 (west of 0)
        // 2 3
        let east_west = distance_m(cells[0].center, cells[1].center);
        let north_south = distance_m(cells[0].center, cells[2].center);
        assert!((east_west - 500.0).abs() < 1.0, "east-west {east_west}");
        assert!((north_south - 500.0).abs() < 1.0, "north-south {north_south}");

        assert!(cells[1].center.longitude < cells[0].center.longitude);
        assert!(cells[2].center.latitude < cells[0].center.latitude);
    }

    #[test]
    fn assigns_sequential_ids() {
        let cells = build_grid(ZURICH_HB, 1000.0, 200.0).unwrap();
        assert_eq!(cells.len(), 25);
        for (expected, cell) in cells.iter().enumerate() {
            assert_eq!(cell.id as usize, expected);
        }
    }

    #[test]
    fn region_smaller_than_cell_is_empty() {
        let cells = build_grid(ZURICH_HB, 100.0, 200.0).unwrap();
        assert!(cells.is_empty());
    }

    #[test]
    fn rejects_non_positive_sides() {
        assert!(build_grid(ZURICH_HB, 0.0, 200.0).is_err());
        assert!(build_grid(ZURICH_HB, 1000.0, -5.0).is_err());
        assert!(build_grid(ZURICH_HB, f64::NAN, 200.0).is_err());
    }

    #[test]
    fn oversized_grid_is_rejected_before_allocating() {
        let result = build_grid(ZURICH_HB, 1.0e12, 1.0);
        assert!(matches!(result, Err(GridError::InvalidInput { .. })));

        let layout = GridLayout::new(1.0e12, 1.0).unwrap();
        assert!(layout.cell_count().is_err());
        assert_eq!(GridLayout::new(1000.0, 250.0).unwrap().cell_count().unwrap(), 16);
    }

    #[test]
    fn grid_is_centered_on_requested_point() {
        let cells = build_grid(ZURICH_HB, 1000.0, 500.0).unwrap();
        let mean_lon = cells.iter().map(|c| c.center.longitude).sum::<f64>() / 4.0;
        let mean_lat = cells.iter().map(|c| c.center.latitude).sum::<f64>() / 4.0;
        let offset = distance_m(Coordinate::new(mean_lon, mean_lat), ZURICH_HB);
        assert!(offset < 1.0, "grid center is {offset}m off");
    }

    #[test]
    fn cell_sides_match_cell_size() {
        let cells = build_grid(ZURICH_HB, 600.0, 300.0).unwrap();
        for cell in &cells {
            let ring: Vec<Coordinate> = cell
                .area
                .exterior()
                .points()
                .map(Coordinate::from)
                .collect();
            // Closed ring: NE, SE, SW, NW, NE
            assert_eq!(ring.len(), 5);
            for pair in ring.windows(2) {
                let side = distance_m(pair[0], pair[1]);
                assert!((side - 300.0).abs() < 1.0, "side {side}");
            }
        }
    }

    #[test]
    fn cells_do_not_overlap() {
        let cells = build_grid(ZURICH_HB, 1000.0, 250.0).unwrap();
        assert_eq!(cells.len(), 16);

        // Probe points well inside each cell must fall in exactly that cell.
        for cell in &cells {
            for bearing in [45.0, 135.0, 225.0, 315.0] {
                let probe = geodesy::walk(cell.center, bearing, 80.0).unwrap();
                let owners: Vec<CellId> = cells
                    .iter()
                    .filter(|other| other.area.contains(&probe.to_point()))
                    .map(|other| other.id)
                    .collect();
                assert_eq!(owners, vec![cell.id]);
            }
        }
    }

    #[test]
    fn every_cell_polygon_is_valid() {
        let cells = build_grid(ZURICH_HB, 2000.0, 200.0).unwrap();
        assert!(cells.iter().all(|cell| cell.area.is_valid()));
    }
}
