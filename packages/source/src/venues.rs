//! Ranked venues from a CSV export.
//!
//! The success percentile is either given directly (`ranking_percentile`)
//! or derived from a position in a ranking list (`ranking` out of
//! `ranking_out_of`). Venues without either are not ranked and are skipped.

use std::io::Read;
use std::path::Path;
use std::str::FromStr as _;

use scout_features_models::{PriceLevel, Venue};
use scout_grid_models::Coordinate;
use serde::Deserialize;

use crate::{SourceError, open};

#[derive(Debug, Deserialize)]
struct VenueRow {
    name: String,
    longitude: f64,
    latitude: f64,
    #[serde(default)]
    ranking_percentile: Option<f64>,
    #[serde(default)]
    ranking: Option<f64>,
    #[serde(default)]
    ranking_out_of: Option<f64>,
    #[serde(default)]
    price_level: Option<String>,
    #[serde(default)]
    cuisine: Option<String>,
}

impl VenueRow {
    fn percentile(&self) -> Option<f64> {
        if let Some(percentile) = self.ranking_percentile {
            return Some(percentile);
        }
        match (self.ranking, self.ranking_out_of) {
            (Some(ranking), Some(out_of)) if out_of > 0.0 => Some(100.0 * ranking / out_of),
            _ => None,
        }
    }

    fn into_venue(self) -> Option<Venue> {
        let success_percentile = self.percentile().filter(|p| p.is_finite())?;
        let location = Coordinate::new(self.longitude, self.latitude);
        if !location.is_finite() {
            return None;
        }

        let price_level = self
            .price_level
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| PriceLevel::from_str(raw).ok());

        let cuisine = self
            .cuisine
            .as_deref()
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect();

        Some(Venue {
            name: self.name.trim().to_owned(),
            location,
            success_percentile,
            price_level,
            cuisine,
        })
    }
}

/// Parses ranked venues from CSV.
///
/// # Errors
///
/// * If the CSV header row cannot be read
pub fn parse_venues(reader: impl Read) -> Result<Vec<Venue>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    reader.headers()?;

    let mut venues = Vec::new();
    let mut unranked = 0usize;
    let mut out_of_range = 0usize;
    for result in reader.deserialize::<VenueRow>() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("  skipping malformed venue row: {e}");
                continue;
            }
        };

        match row.into_venue() {
            Some(venue) if venue.has_valid_percentile() => venues.push(venue),
            Some(venue) => {
                log::debug!(
                    "  dropping {}: percentile {} outside [0, 100]",
                    venue.name,
                    venue.success_percentile
                );
                out_of_range += 1;
            }
            None => unranked += 1,
        }
    }

    if unranked > 0 {
        log::warn!("Skipped {unranked} venues without a usable ranking or location");
    }
    if out_of_range > 0 {
        log::warn!("Skipped {out_of_range} venues with a percentile outside [0, 100]");
    }
    log::info!("Loaded {} ranked venues", venues.len());

    Ok(venues)
}

/// Loads ranked venues from a CSV file.
///
/// # Errors
///
/// * If the file cannot be opened or its header row read
pub fn load_venues(path: &Path) -> Result<Vec<Venue>, SourceError> {
    parse_venues(open(path)?)
}
