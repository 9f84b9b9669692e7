#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loaders for the external datasets.
//!
//! Every loader has a `parse_*` function working on in-memory input and a
//! `load_*` wrapper reading a file. Rows that cannot be used are skipped
//! and logged; only unreadable or structurally broken files are errors.

pub mod boundaries;
pub mod demographics;
pub mod geometries;
pub mod venues;

use std::path::Path;

pub use boundaries::{load_boundaries, parse_boundaries};
pub use demographics::{load_demographics, parse_demographics};
pub use geometries::{load_geometries, parse_geometries};
pub use venues::{load_venues, parse_venues};

/// Errors that can occur while loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Reading the file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file parsed but does not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<geojson::Error> for SourceError {
    fn from(value: geojson::Error) -> Self {
        Self::GeoJson(Box::new(value))
    }
}

pub(crate) fn read_to_string(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn open(path: &Path) -> Result<std::fs::File, SourceError> {
    std::fs::File::open(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Canonical form of a locality key.
///
/// Postal codes show up as `"8001"`, `8001`, or `8001.0` depending on the
/// source; all of them normalize to `"8001"`.
#[must_use]
pub fn normalize_locality_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{value:.0}")
        }
        _ => trimmed.to_string(),
    }
}

/// Renders a JSON property value as a tag or key string.
pub(crate) fn property_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}
