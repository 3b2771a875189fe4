//! Interchange feature records.
//!
//! A document is a JSON array of GeoJSON `Feature` objects. The `id` member
//! carries the object type tag (`PathAnnotationObject`, ...); producers up to
//! version 0.2.3 left it out and wrote `properties.object_type` instead.
//! Measurements are written as a list of `{name, value}` pairs and read from
//! either that list or a plain map.

use serde::{Deserialize, Serialize};

use slidetree_types::kind::{ROOT_TYPE_TAG, TMA_CORE_TYPE_TAG};
use slidetree_types::{Geometry, Measurements, ObjectKind, PathClass, PathObject};

use crate::error::{StoreError, StoreResult};

/// One interchange record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub feature_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: FeatureProperties,
}

/// The `properties` member of a record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<PathClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "isLocked", default)]
    pub is_locked: bool,
    #[serde(default, with = "measurement_list")]
    pub measurements: Measurements,
}

/// A single `{name, value}` measurement entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl Feature {
    /// Encode an object, always writing the type tag.
    pub fn from_object(object: &PathObject) -> Self {
        Self {
            feature_type: feature_type(),
            id: Some(object.kind().type_tag().to_string()),
            geometry: object.roi().clone(),
            properties: FeatureProperties {
                object_type: None,
                classification: object.path_class().cloned(),
                name: object.name().map(str::to_string),
                is_locked: object.is_locked(),
                measurements: object.measurements().clone(),
            },
        }
    }

    /// The object kind this record describes.
    ///
    /// Only the `id` tag is consulted. An untagged record is an annotation:
    /// reading `properties.object_type` instead depends on which producer
    /// version wrote the document, and that check belongs to the caller that
    /// knows the version (ingestion synthesizes the tag before decoding).
    pub fn kind(&self) -> StoreResult<ObjectKind> {
        match self.id.as_deref() {
            Some(tag @ (ROOT_TYPE_TAG | TMA_CORE_TYPE_TAG)) => {
                Err(StoreError::UnsupportedObjectType(tag.to_string()))
            }
            Some(tag) => Ok(ObjectKind::from_type_tag(tag)?),
            None => Ok(ObjectKind::Annotation),
        }
    }

    /// Decode into a new object with a fresh id.
    pub fn into_object(self) -> StoreResult<PathObject> {
        let kind = self.kind()?;
        let FeatureProperties {
            classification,
            name,
            is_locked,
            measurements,
            ..
        } = self.properties;
        Ok(PathObject::new(kind, self.geometry)?
            .with_class(classification)
            .with_name(name)
            .with_locked(is_locked)
            .with_measurements(measurements))
    }
}

mod measurement_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Measurement;
    use slidetree_types::Measurements;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        List(Vec<Measurement>),
        Map(Measurements),
    }

    pub fn serialize<S: Serializer>(measurements: &Measurements, serializer: S) -> Result<S::Ok, S::Error> {
        measurements
            .iter()
            .map(|(name, value)| Measurement {
                name: name.clone(),
                value: *value,
            })
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Measurements, D::Error> {
        Ok(match Encoded::deserialize(deserializer)? {
            Encoded::List(list) => list.into_iter().map(|m| (m.name, m.value)).collect(),
            Encoded::Map(map) => map,
        })
    }
}
