//! Demographic table keyed by locality.

use std::io::Read;
use std::path::Path;

use scout_features_models::DemographicRecord;

use crate::{SourceError, normalize_locality_key, open};

/// Parses a CSV demographic table.
///
/// `key_column` names the locality column; every other column becomes a
/// numeric attribute, with empty or non-numeric cells recorded as null.
/// Rows with an empty key are skipped.
///
/// # Errors
///
/// * If the CSV is malformed
/// * If `key_column` is not among the headers
pub fn parse_demographics(
    reader: impl Read,
    key_column: &str,
) -> Result<Vec<DemographicRecord>, SourceError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let Some(key_idx) = headers.iter().position(|h| h == key_column) else {
        return Err(SourceError::Parse(format!(
            "demographic table has no '{key_column}' column"
        )));
    };

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let row = result?;

        let key = row.get(key_idx).map(str::trim).unwrap_or_default();
        if key.is_empty() {
            skipped += 1;
            continue;
        }

        let attributes = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != key_idx)
            .map(|(idx, header)| {
                let value = row.get(idx).and_then(|raw| raw.trim().parse::<f64>().ok());
                (header.clone(), value.filter(|v| v.is_finite()))
            })
            .collect();

        records.push(DemographicRecord {
            locality_key: normalize_locality_key(key),
            attributes,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} demographic rows without a '{key_column}' value");
    }
    log::info!("Loaded {} demographic rows", records.len());

    Ok(records)
}

/// Loads a CSV demographic table from disk.
///
/// # Errors
///
/// * If the file cannot be opened or parsed
pub fn load_demographics(
    path: &Path,
    key_column: &str,
) -> Result<Vec<DemographicRecord>, SourceError> {
    parse_demographics(open(path)?, key_column)
}
