//! `GeoJSON` export of the labeled grid for inspection in a map viewer.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, feature::Id};
use scout_grid_models::Cell;

/// One polygon feature per cell with id, cluster, locality, and features
/// as properties. Null feature values are exported as JSON `null`.
#[must_use]
pub fn cells_to_geojson(cells: &[Cell]) -> FeatureCollection {
    let features = cells
        .iter()
        .map(|cell| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), JsonValue::from(cell.id));
            properties.insert(
                "cluster".to_string(),
                cell.cluster
                    .map_or(JsonValue::Null, |label| JsonValue::from(label.0)),
            );
            properties.insert(
                "locality_key".to_string(),
                cell.locality_key
                    .as_ref()
                    .map_or(JsonValue::Null, |key| JsonValue::from(key.as_str())),
            );
            for (name, value) in cell.features.iter() {
                properties.insert(
                    name.to_string(),
                    value
                        .and_then(serde_json::Number::from_f64)
                        .map_or(JsonValue::Null, JsonValue::Number),
                );
            }

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&cell.area))),
                id: Some(Id::Number(cell.id.into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
