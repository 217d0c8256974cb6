use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map, Value};

use crate::{
    common::{multipolygon_to_geojson, parse_areal_geometry},
    config::SessionConfig,
    geom::Projector,
    municipality::{Municipality, MunicipalityId, MunicipalityLayer, UrbanFlag},
};

impl MunicipalityLayer {
    /// Load municipalities from a GeoJSON FeatureCollection.
    /// Coordinates are read in `config.data_crs` and stored in `config.map_crs`.
    pub fn from_geojson_bytes(bytes: &[u8], config: &SessionConfig) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
        Self::from_geojson_value(&value, config)
    }

    pub fn from_geojson_str(text: &str, config: &SessionConfig) -> Result<Self> {
        Self::from_geojson_bytes(text.as_bytes(), config)
    }

    pub fn from_geojson_file(path: &Path, config: &SessionConfig) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))?;
        Self::from_geojson_bytes(&bytes, config)
            .with_context(|| format!("Failed to load municipalities from {}", path.display()))
    }

    /// Fetch the dataset over HTTP and load it.
    #[cfg(feature = "download")]
    pub fn download(url: &str, config: &SessionConfig) -> Result<Self> {
        let bytes = crate::common::fetch_bytes(url)?;
        Self::from_geojson_bytes(&bytes, config)
            .with_context(|| format!("Failed to load municipalities from {url}"))
    }

    pub fn from_geojson_value(value: &Value, config: &SessionConfig) -> Result<Self> {
        if value["type"].as_str() != Some("FeatureCollection") {
            return Err(anyhow!("Expected a FeatureCollection, found {}", value["type"]));
        }
        let features = value["features"].as_array()
            .ok_or_else(|| anyhow!("FeatureCollection has no features array"))?;

        let projector = Projector::new(config.data_crs, config.map_crs)?;

        let mut entities = Vec::with_capacity(features.len());
        let mut shapes = Vec::with_capacity(features.len());

        for (idx, feature) in features.iter().enumerate() {
            let Some(shape) = parse_areal_geometry(&feature["geometry"])
                .with_context(|| format!("Invalid geometry in feature {idx}"))? else {
                tracing::warn!(feature = idx, kind = %feature["geometry"]["type"], "skipping non-areal feature");
                continue;
            };

            let properties = feature["properties"].as_object()
                .ok_or_else(|| anyhow!("Feature {idx} has no properties"))?;
            let name = string_property(properties, &config.name_key)
                .ok_or_else(|| anyhow!("Feature {idx} is missing {:?}", config.name_key))?;
            let type_code = string_property(properties, &config.type_key)
                .ok_or_else(|| anyhow!("Feature {idx} ({name}) is missing {:?}", config.type_key))?;
            let area_km2 = number_property(properties, &config.area_key)
                .ok_or_else(|| anyhow!("Feature {idx} ({name}) has no numeric {:?}", config.area_key))?;

            let shape = projector.project_shape(&shape)
                .with_context(|| format!("Failed to reproject feature {idx} ({name})"))?;

            entities.push(Municipality {
                id: MunicipalityId(entities.len() as u32),
                urban: UrbanFlag::classify(&type_code, &config.urban_code),
                name: name.into(),
                area_km2,
                type_code: type_code.into(),
            });
            shapes.push(shape);
        }

        let layer = Self::new(config.map_crs, entities, shapes)?;
        tracing::info!(
            municipalities = layer.len(),
            skipped = features.len() - layer.len(),
            data_crs = %config.data_crs,
            map_crs = %config.map_crs,
            "loaded municipality layer"
        );
        Ok(layer)
    }

    /// Export the given municipalities (geometry in map CRS) as a GeoJSON FeatureCollection.
    /// Unknown ids are skipped.
    pub fn to_geojson(&self, ids: &[MunicipalityId]) -> Value {
        let features: Vec<Value> = ids.iter()
            .filter_map(|&id| Some((self.get(id)?, self.geometry(id)?)))
            .map(|(m, shape)| json!({
                "type": "Feature",
                "id": m.id.0,
                "geometry": multipolygon_to_geojson(shape),
                "properties": {
                    "name": &*m.name,
                    "area_km2": m.area_km2,
                    "type_code": &*m.type_code,
                    "urban": m.urban.as_str(),
                },
            }))
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

fn string_property(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Areas come as JSON numbers or numeric strings, depending on the exporter.
fn number_property(properties: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match properties.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    };
    value.filter(|v: &f64| v.is_finite())
}
