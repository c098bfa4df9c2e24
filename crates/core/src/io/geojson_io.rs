//! GeoJSON reading/writing for feature collections
//!
//! The layer CRS travels as the legacy `crs` foreign member
//! (`{"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::<code>"}}`)
//! and the layer name as a top-level `name` member, the way GDAL writes them.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, JsonValue};
use serde_json::json;
use std::fs;
use std::path::Path;

/// Read a GeoJSON file into a FeatureCollection
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    feature_collection_from_geojson(&text)
}

/// Write a FeatureCollection to a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let text = feature_collection_to_geojson(collection)?;
    fs::write(path.as_ref(), text)?;
    Ok(())
}

/// Parse GeoJSON text into a FeatureCollection
///
/// A bare Feature or Geometry is accepted and wrapped into a one-element
/// collection.
pub fn feature_collection_from_geojson(text: &str) -> Result<FeatureCollection> {
    let parsed: GeoJson = text.parse()?;

    match parsed {
        GeoJson::FeatureCollection(fc) => {
            let mut collection = FeatureCollection::new();
            if let Some(members) = &fc.foreign_members {
                collection.crs = crs_from_members(members);
                collection.name = members
                    .get("name")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string);
            }
            for feature in fc.features {
                collection.push(convert_feature(feature)?);
            }
            Ok(collection)
        }
        GeoJson::Feature(feature) => {
            let mut collection = FeatureCollection::new();
            collection.push(convert_feature(feature)?);
            Ok(collection)
        }
        GeoJson::Geometry(geometry) => {
            let mut collection = FeatureCollection::new();
            collection.push(Feature::new(geometry.try_into()?));
            Ok(collection)
        }
    }
}

/// Serialize a FeatureCollection to GeoJSON text
pub fn feature_collection_to_geojson(collection: &FeatureCollection) -> Result<String> {
    let features = collection
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: feature
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: feature.id.clone().map(Id::String),
            properties: Some(properties_to_json(feature)),
            foreign_members: None,
        })
        .collect();

    let mut members = JsonObject::new();
    if let Some(name) = &collection.name {
        members.insert("name".to_string(), json!(name));
    }
    if let Some(urn) = collection.crs.as_ref().and_then(CRS::urn) {
        members.insert(
            "crs".to_string(),
            json!({"type": "name", "properties": {"name": urn}}),
        );
    }

    let fc = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: (!members.is_empty()).then_some(members),
    };

    serde_json::to_string(&GeoJson::FeatureCollection(fc))
        .map_err(|e| Error::GeoJson(e.to_string()))
}

fn crs_from_members(members: &JsonObject) -> Option<CRS> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .and_then(CRS::from_identifier)
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(g) => Some(g.try_into()?),
        None => None,
    };

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, attribute_from_json(v)))
        .collect();

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn attribute_from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn properties_to_json(feature: &Feature) -> JsonObject {
    // Sorted keys keep the output stable between runs
    let mut keys: Vec<&String> = feature.properties.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|k| {
            let value = match &feature.properties[k] {
                AttributeValue::Null => JsonValue::Null,
                AttributeValue::Bool(b) => json!(b),
                AttributeValue::Int(i) => json!(i),
                // JSON has no NaN; non-finite floats are written as null
                AttributeValue::Float(f) if f.is_finite() => json!(f),
                AttributeValue::Float(_) => JsonValue::Null,
                AttributeValue::String(s) => json!(s),
            };
            (k.clone(), value)
        })
        .collect()
}
