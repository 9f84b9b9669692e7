//! Geodesic walks on the WGS84 ellipsoid.
//!
//! [`walk`] answers "where do I end up if I leave `origin` heading
//! `bearing` degrees and travel `distance` meters along the geodesic".
//! Bearings are compass bearings: degrees clockwise from true north.

use geo::{Destination, Geodesic};
use scout_grid_models::Coordinate;

/// Compass bearings used to lay out the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bearing {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Bearing {
    /// Degrees clockwise from north.
    #[must_use]
    pub const fn degrees(self) -> f64 {
        match self {
            Self::North => 0.0,
            Self::NorthEast => 45.0,
            Self::East => 90.0,
            Self::SouthEast => 135.0,
            Self::South => 180.0,
            Self::SouthWest => 225.0,
            Self::West => 270.0,
            Self::NorthWest => 315.0,
        }
    }
}

/// Errors from geodesic computations.
#[derive(Debug, thiserror::Error)]
pub enum GeodesyError {
    /// A coordinate, bearing, or distance was not usable.
    #[error("Invalid geodesic input: {message}")]
    InvalidInput {
        /// Description of what was rejected.
        message: String,
    },
}

/// Walks `distance_m` meters from `origin` along `bearing_deg`.
///
/// A zero distance returns `origin` unchanged.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidInput`] if the origin or bearing is not
/// finite, or the distance is negative or not finite.
pub fn walk(
    origin: Coordinate,
    bearing_deg: f64,
    distance_m: f64,
) -> Result<Coordinate, GeodesyError> {
    if !origin.is_finite() {
        return Err(GeodesyError::InvalidInput {
            message: format!("origin {origin} is not finite"),
        });
    }
    if !bearing_deg.is_finite() {
        return Err(GeodesyError::InvalidInput {
            message: format!("bearing {bearing_deg} is not finite"),
        });
    }
    if !distance_m.is_finite() || distance_m < 0.0 {
        return Err(GeodesyError::InvalidInput {
            message: format!("distance {distance_m} must be a non-negative number"),
        });
    }

    if distance_m == 0.0 {
        return Ok(origin);
    }

    let destination = Geodesic.destination(origin.to_point(), bearing_deg, distance_m);
    Ok(destination.into())
}

/// Convenience wrapper around [`walk`] for the named compass bearings.
///
/// # Errors
///
/// Same as [`walk`].
pub fn walk_toward(
    origin: Coordinate,
    bearing: Bearing,
    distance_m: f64,
) -> Result<Coordinate, GeodesyError> {
    walk(origin, bearing.degrees(), distance_m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Distance as _;

    const ZURICH_HB: Coordinate = Coordinate::new(8.540_251_5, 47.377_787_3);

    #[test]
    fn zero_distance_returns_origin() {
        let arrived = walk(ZURICH_HB, 123.0, 0.0).unwrap();
        assert_eq!(arrived, ZURICH_HB);
    }

    #[test]
    fn rejects_negative_distance() {
        assert!(walk(ZURICH_HB, 0.0, -1.0).is_err());
    }

    #[test]
    fn rejects_nan_inputs() {
        assert!(walk(ZURICH_HB, 0.0, f64::NAN).is_err());
        assert!(walk(ZURICH_HB, f64::NAN, 10.0).is_err());
        assert!(walk(Coordinate::new(f64::NAN, 47.0), 0.0, 10.0).is_err());
    }

    #[test]
    fn walking_north_increases_latitude_only() {
        let arrived = walk_toward(ZURICH_HB, Bearing::North, 1000.0).unwrap();
        assert!(arrived.latitude > ZURICH_HB.latitude);
        assert!((arrived.longitude - ZURICH_HB.longitude).abs() < 1e-9);
    }

    #[test]
    fn walked_distance_matches_request() {
        let arrived = walk_toward(ZURICH_HB, Bearing::NorthEast, 707.0).unwrap();
        let measured = Geodesic.distance(ZURICH_HB.to_point(), arrived.to_point());
        assert!((measured - 707.0).abs() < 1e-3, "measured {measured}");
    }

    #[test]
    fn walking_back_returns_to_origin() {
        for bearing in [0.0, 45.0, 90.0, 135.0, 200.0, 270.0, 333.0] {
            let there = walk(ZURICH_HB, bearing, 1000.0).unwrap();
            let back = walk(there, bearing + 180.0, 1000.0).unwrap();
            assert!(
                (back.longitude - ZURICH_HB.longitude).abs() < 1e-5,
                "bearing {bearing}: {back}"
            );
            assert!(
                (back.latitude - ZURICH_HB.latitude).abs() < 1e-5,
                "bearing {bearing}: {back}"
            );
        }
    }
}
