//! Postal code boundary polygons from `GeoJSON`.

use std::path::Path;

use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;

use crate::{SourceError, normalize_locality_key, property_string, read_to_string};

/// Parses `(locality key, boundary)` pairs from a `FeatureCollection`.
///
/// The key is read from the `key_property` property. Features without the
/// key or without a polygonal geometry are skipped.
///
/// # Errors
///
/// * If the text is not valid `GeoJSON`
/// * If the document is not a `FeatureCollection`
pub fn parse_boundaries(
    geojson_str: &str,
    key_property: &str,
) -> Result<Vec<(String, MultiPolygon<f64>)>, SourceError> {
    let GeoJson::FeatureCollection(collection) = geojson_str.parse::<GeoJson>()? else {
        return Err(SourceError::Parse(
            "postal boundaries must be a FeatureCollection".to_string(),
        ));
    };

    let total = collection.features.len();
    let boundaries: Vec<(String, MultiPolygon<f64>)> = collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let key = feature
                .properties
                .as_ref()
                .and_then(|props| props.get(key_property))
                .and_then(property_string)?;
            let boundary = to_multipolygon(feature.geometry?.try_into().ok()?)?;
            Some((normalize_locality_key(&key), boundary))
        })
        .collect();

    if boundaries.len() < total {
        log::warn!(
            "Skipped {} boundary features without '{key_property}' or a polygon",
            total - boundaries.len()
        );
    }
    log::info!("Loaded {} postal boundaries", boundaries.len());

    Ok(boundaries)
}

/// Loads postal boundaries from a `GeoJSON` file.
///
/// # Errors
///
/// * If the file cannot be read or parsed
pub fn load_boundaries(
    path: &Path,
    key_property: &str,
) -> Result<Vec<(String, MultiPolygon<f64>)>, SourceError> {
    parse_boundaries(&read_to_string(path)?, key_property)
}

fn to_multipolygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSTAL: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"plz": 8001},
                "geometry": {"type": "Polygon", "coordinates": [[[8.53, 47.36], [8.55, 47.36], [8.55, 47.38], [8.53, 47.38], [8.53, 47.36]]]}
            },
            {
                "type": "Feature",
                "properties": {"plz": "8004"},
                "geometry": {"type": "MultiPolygon", "coordinates": [[[[8.51, 47.37], [8.53, 47.37], [8.53, 47.39], [8.51, 47.39], [8.51, 47.37]]]]}
            },
            {
                "type": "Feature",
                "properties": {"name": "no key"},
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
            },
            {
                "type": "Feature",
                "properties": {"plz": 8005},
                "geometry": {"type": "Point", "coordinates": [8.5, 47.3]}
            }
        ]
    }"#;

    #[test]
    fn reads_polygon_and_multipolygon_boundaries() {
        let boundaries = parse_boundaries(POSTAL, "plz").unwrap();

        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].0, "8001");
        assert_eq!(boundaries[0].1.0.len(), 1);
        assert_eq!(boundaries[1].0, "8004");
    }

    #[test]
    fn requires_feature_collection() {
        let single = r#"{"type": "Feature", "properties": {}, "geometry": null}"#;
        assert!(matches!(
            parse_boundaries(single, "plz"),
            Err(SourceError::Parse(_))
        ));
    }
}
