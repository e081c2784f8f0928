//! Vector feature source: GeoJSON layers of polygons with string properties.

use crate::grid::GridTile;
use crate::DataError;
use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Default property holding the grid reference of a tile feature.
pub const DEFAULT_TILE_NAME_FIELD: &str = "TILE_NAME";

/// A polygonal feature with its properties rendered as strings.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Polygon geometry (single polygons are wrapped).
    pub geometry: MultiPolygon<f64>,
    /// Property map. Non-string JSON values are kept in their JSON text form.
    pub properties: BTreeMap<String, String>,
}

impl Feature {
    /// Look up a property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Read every feature of a GeoJSON file.
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<Vec<Feature>, DataError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let features = parse_geojson(&text, &path.display().to_string())?;
    debug!("read {} features from {}", features.len(), path.display());
    Ok(features)
}

/// Parse GeoJSON text (a FeatureCollection, a Feature or a bare Geometry).
///
/// `origin` labels the source in error messages. Every feature must carry
/// polygonal geometry; nothing is skipped.
pub fn parse_geojson(text: &str, origin: &str) -> Result<Vec<Feature>, DataError> {
    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| DataError::InvalidGeoJson {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;

    let raw = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![geojson::Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    raw.into_iter()
        .enumerate()
        .map(|(index, feature)| convert_feature(feature, index, origin))
        .collect()
}

fn convert_feature(
    feature: geojson::Feature,
    index: usize,
    origin: &str,
) -> Result<Feature, DataError> {
    let geometry = feature.geometry.ok_or_else(|| DataError::MissingGeometry {
        origin: origin.to_string(),
        index,
    })?;
    let kind = geometry_kind(&geometry.value).to_string();

    let geometry: Geometry<f64> =
        geometry
            .try_into()
            .map_err(|e: geojson::Error| DataError::InvalidGeoJson {
                origin: origin.to_string(),
                reason: format!("feature {index}: {e}"),
            })?;

    let geometry = match geometry {
        Geometry::MultiPolygon(mp) => mp,
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        _ => {
            return Err(DataError::UnsupportedGeometry {
                origin: origin.to_string(),
                index,
                kind,
            })
        }
    };

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect();

    Ok(Feature {
        geometry,
        properties,
    })
}

fn geometry_kind(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Turn tile features into named grid tiles.
///
/// Each feature must hold a string `name_field` property; the tile name is
/// taken verbatim.
pub fn tiles_from_features(
    features: Vec<Feature>,
    name_field: &str,
) -> Result<Vec<GridTile<MultiPolygon<f64>>>, DataError> {
    features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let name = feature
                .properties
                .get(name_field)
                .filter(|name| !name.is_empty())
                .cloned()
                .ok_or_else(|| DataError::MissingProperty {
                    index,
                    field: name_field.to_string(),
                })?;
            Ok(GridTile::new(name, feature.geometry))
        })
        .collect()
}

/// Geometries of a set of features, for use as an area of interest.
pub fn geometries(features: Vec<Feature>) -> Vec<MultiPolygon<f64>> {
    features.into_iter().map(|f| f.geometry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "TILE_NAME": "TQ28NE", "AREA": 25 },
                "geometry": { "type": "Polygon", "coordinates": [[[525000, 185000], [530000, 185000], [530000, 190000], [525000, 190000], [525000, 185000]]] }
            },
            {
                "type": "Feature",
                "properties": { "TILE_NAME": "TQ28SE" },
                "geometry": { "type": "MultiPolygon", "coordinates": [[[[525000, 180000], [530000, 180000], [530000, 185000], [525000, 185000], [525000, 180000]]]] }
            }
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let features = parse_geojson(TILES, "tiles").unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].property("TILE_NAME"), Some("TQ28NE"));
        assert_eq!(features[0].property("AREA"), Some("25"));
        assert_eq!(features[1].geometry.0.len(), 1);
    }

    #[test]
    fn test_tiles_from_features() {
        let features = parse_geojson(TILES, "tiles").unwrap();
        let tiles = tiles_from_features(features, DEFAULT_TILE_NAME_FIELD).unwrap();
        let names: Vec<&str> = tiles.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["TQ28NE", "TQ28SE"]);
    }

    #[test]
    fn test_missing_name_property() {
        let features = parse_geojson(TILES, "tiles").unwrap();
        let err = tiles_from_features(features, "NAME").unwrap_err();
        assert!(matches!(err, DataError::MissingProperty { index: 0, .. }));
    }

    #[test]
    fn test_tile_name_from_non_string_property() {
        let text = r#"{ "type": "Feature", "properties": { "TILE_NAME": 1234, "LABEL": "" },
            "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] } }"#;
        let tiles = tiles_from_features(parse_geojson(text, "tiles").unwrap(), DEFAULT_TILE_NAME_FIELD).unwrap();
        assert_eq!(tiles[0].name(), "1234");

        let err = tiles_from_features(parse_geojson(text, "tiles").unwrap(), "LABEL").unwrap_err();
        assert_eq!(err.to_string(), "Feature 0 has no value for property 'LABEL'");
    }

    #[test]
    fn test_bare_geometry() {
        let text = r#"{ "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] }"#;
        let features = parse_geojson(text, "aoi").unwrap();
        assert_eq!(features.len(), 1);
        assert!(features[0].properties.is_empty());
    }

    #[test]
    fn test_rejects_non_polygon_geometry() {
        let text = r#"{ "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [1, 2] } }"#;
        let err = parse_geojson(text, "aoi").unwrap_err();
        assert!(matches!(err, DataError::UnsupportedGeometry { ref kind, .. } if kind == "Point"));
    }

    #[test]
    fn test_rejects_missing_geometry() {
        let text = r#"{ "type": "Feature", "properties": {}, "geometry": null }"#;
        assert!(matches!(
            parse_geojson(text, "aoi"),
            Err(DataError::MissingGeometry { index: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            parse_geojson("{ not json", "aoi"),
            Err(DataError::InvalidGeoJson { .. })
        ));
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            read_geojson("/nonexistent/tiles.geojson"),
            Err(DataError::Io { .. })
        ));
    }
}
