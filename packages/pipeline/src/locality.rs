//! Resolving cell centers to locality keys for the demographic join.

use geo::MultiPolygon;
use scout_grid_models::{Cell, Coordinate};
use scout_spatial::PolygonIndex;

use crate::store::{StoreError, fingerprint};

/// Maps a coordinate to the locality key demographic rows are keyed by.
pub trait LocalityResolver: Send + Sync {
    /// Locality of `point`, if known.
    fn resolve(&self, point: Coordinate) -> Option<String>;

    /// Identifies the resolver's data for artifact keys.
    fn fingerprint(&self) -> String;
}

/// Leaves every cell without a locality.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocality;

impl LocalityResolver for NoLocality {
    fn resolve(&self, _point: Coordinate) -> Option<String> {
        None
    }

    fn fingerprint(&self) -> String {
        "none".to_string()
    }
}

/// Point-in-polygon lookup over postal code boundaries.
///
/// A point on a shared border resolves to the boundary listed first.
pub struct BoundaryLocalityResolver {
    index: PolygonIndex<String>,
    fingerprint: String,
}

impl BoundaryLocalityResolver {
    /// Indexes `(postal code, boundary)` pairs.
    ///
    /// # Errors
    ///
    /// * If the boundaries cannot be serialized for fingerprinting
    pub fn new(boundaries: Vec<(String, MultiPolygon<f64>)>) -> Result<Self, StoreError> {
        let fingerprint = fingerprint(&boundaries)?;
        Ok(Self {
            index: PolygonIndex::new(boundaries),
            fingerprint,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl LocalityResolver for BoundaryLocalityResolver {
    fn resolve(&self, point: Coordinate) -> Option<String> {
        self.index
            .first_covering(point.longitude, point.latitude)
            .cloned()
    }

    fn fingerprint(&self) -> String {
        format!("boundaries:{}", self.fingerprint)
    }
}

/// Sets `locality_key` on every cell from its center. Returns how many
/// cells were resolved.
pub fn assign_localities(cells: &mut [Cell], resolver: &dyn LocalityResolver) -> usize {
    let mut resolved = 0;
    for cell in cells.iter_mut() {
        cell.locality_key = resolver.resolve(cell.center);
        if cell.locality_key.is_some() {
            resolved += 1;
        }
    }
    if resolved < cells.len() {
        log::warn!(
            "{} of {} cells have no locality",
            cells.len() - resolved,
            cells.len()
        );
    }
    resolved
}
