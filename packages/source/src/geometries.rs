//! Tagged map geometries from a `GeoJSON` `FeatureCollection`.
//!
//! Typically an `OpenStreetMap` extract: every feature carries its tags as
//! flat properties. Only features with at least one tag the infrastructure
//! catalogue looks at are kept, and only the relevant tags are retained.

use std::collections::BTreeMap;
use std::path::Path;

use geo::Geometry;
use geojson::{Feature, GeoJson};
use scout_features::infrastructure::RELEVANT_TAGS;
use scout_features_models::GeometryRecord;

use crate::{SourceError, property_string, read_to_string};

/// Parses geometry records from `GeoJSON` text.
///
/// # Errors
///
/// * If the text is not valid `GeoJSON`
/// * If the document is a bare geometry rather than features
pub fn parse_geometries(geojson_str: &str) -> Result<Vec<GeometryRecord>, SourceError> {
    let features = match geojson_str.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(SourceError::Parse(
                "expected a FeatureCollection, found a bare geometry".to_string(),
            ));
        }
    };

    let total = features.len();
    let records: Vec<GeometryRecord> = features.into_iter().filter_map(to_record).collect();

    log::info!("Loaded {} of {total} map features", records.len());
    Ok(records)
}

/// Loads geometry records from a `GeoJSON` file.
///
/// # Errors
///
/// * If the file cannot be read or parsed
pub fn load_geometries(path: &Path) -> Result<Vec<GeometryRecord>, SourceError> {
    parse_geometries(&read_to_string(path)?)
}

fn to_record(feature: Feature) -> Option<GeometryRecord> {
    let properties = feature.properties.unwrap_or_default();

    let tags: BTreeMap<String, String> = RELEVANT_TAGS
        .iter()
        .filter_map(|&key| {
            let value = properties.get(key).and_then(property_string)?;
            Some((key.to_string(), value))
        })
        .collect();
    if tags.is_empty() {
        return None;
    }

    let geometry: Geometry<f64> = match feature.geometry?.try_into() {
        Ok(geometry) => geometry,
        Err(e) => {
            log::trace!("Skipping feature with unconvertible geometry: {e}");
            return None;
        }
    };
    if !matches!(
        geometry,
        Geometry::Point(_)
            | Geometry::LineString(_)
            | Geometry::MultiLineString(_)
            | Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
    ) {
        return None;
    }

    Some(GeometryRecord {
        tags,
        geometry,
        name: properties.get("name").and_then(property_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"amenity": "restaurant", "name": "Zeughauskeller", "cuisine": "swiss"},
                "geometry": {"type": "Point", "coordinates": [8.5396, 47.3713]}
            },
            {
                "type": "Feature",
                "properties": {"highway": "primary", "maxspeed": 50},
                "geometry": {"type": "LineString", "coordinates": [[8.53, 47.37], [8.54, 47.38]]}
            },
            {
                "type": "Feature",
                "properties": {"natural": "tree"},
                "geometry": {"type": "Point", "coordinates": [8.5, 47.3]}
            },
            {
                "type": "Feature",
                "properties": {"shop": "bakery"},
                "geometry": {"type": "MultiPoint", "coordinates": [[8.5, 47.3]]}
            },
            {
                "type": "Feature",
                "properties": {"building": "public"},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn keeps_features_with_relevant_tags() {
        let records = parse_geometries(SAMPLE).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag("amenity"), Some("restaurant"));
        assert_eq!(records[0].name.as_deref(), Some("Zeughauskeller"));
        assert!(matches!(records[0].geometry, Geometry::Point(_)));
        assert_eq!(records[1].tag("highway"), Some("primary"));
        assert!(matches!(records[1].geometry, Geometry::LineString(_)));
    }

    #[test]
    fn drops_irrelevant_tags() {
        let records = parse_geometries(SAMPLE).unwrap();
        assert!(records[0].tag("cuisine").is_none());
        assert!(records[1].tag("maxspeed").is_none());
    }

    #[test]
    fn rejects_bare_geometry() {
        let err = parse_geometries(r#"{"type": "Point", "coordinates": [8.5, 47.3]}"#);
        assert!(matches!(err, Err(SourceError::Parse(_))));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(parse_geometries("not json").is_err());
    }
}
