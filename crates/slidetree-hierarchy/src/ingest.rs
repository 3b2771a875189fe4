//! Bulk ingestion of interchange documents.
//!
//! Records are converted one at a time. A record that fails conversion is
//! logged, tallied under its classification name, and left out; the
//! survivors go into the store as one batch. With
//! [`LoadOptions::raise_on_skip`] a single failure aborts the load before
//! anything is inserted.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use slidetree_store::{Feature, FeatureProperties};
use slidetree_types::kind::{ROOT_TYPE_TAG, TMA_CORE_TYPE_TAG};
use slidetree_types::{Geometry, ObjectKind, PathObject};

use crate::error::{HierarchyError, HierarchyResult};
use crate::hierarchy::Hierarchy;

/// Number of repair passes tried on an invalid geometry before giving up.
pub const MAX_REPAIR_PASSES: usize = 2;

/// Tally key for records without a classification name.
pub const UNDEFINED_CLASS: &str = "UNDEFINED";

/// Options for [`Hierarchy::load`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Fail the whole load if any record is skipped.
    pub raise_on_skip: bool,
    /// Try to repair invalid geometries instead of importing them as-is.
    pub fix_invalid: bool,
}

/// Why a single record could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Skipped-record counts keyed by classification name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SkipTally {
    counts: BTreeMap<String, usize>,
}

impl SkipTally {
    pub fn record(&mut self, class_name: impl Into<String>) {
        *self.counts.entry(class_name.into()).or_default() += 1;
    }

    pub fn get(&self, class_name: &str) -> usize {
        self.counts.get(class_name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Entries ordered by count, highest first; ties by name.
    pub fn most_common(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> =
            self.counts.iter().map(|(name, n)| (name.as_str(), *n)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

impl fmt::Display for SkipTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .most_common()
            .into_iter()
            .map(|(name, n)| format!("{name}={n}"))
            .collect();
        write!(f, "[{}]", entries.join(", "))
    }
}

/// Outcome of a load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Whether the store changed.
    pub added: bool,
    /// Records converted and handed to the store.
    pub converted: usize,
    pub skipped: SkipTally,
}

/// Type tag for a legacy `properties.object_type` value.
///
/// Returns `None` for names no producer ever wrote.
pub fn legacy_type_tag(object_type: &str) -> Option<&'static str> {
    Some(match object_type {
        "annotation" | "unknown" => ObjectKind::Annotation.type_tag(),
        "detection" => ObjectKind::Detection.type_tag(),
        "tile" => ObjectKind::Tile.type_tag(),
        "cell" => ObjectKind::Cell.type_tag(),
        "tma_core" => TMA_CORE_TYPE_TAG,
        "root" => ROOT_TYPE_TAG,
        _ => return None,
    })
}

/// The classification name a skipped record is tallied under.
pub fn classification_name(record: &Value) -> &str {
    record
        .get("properties")
        .and_then(|p| p.get("classification"))
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(UNDEFINED_CLASS)
}

fn repair(mut geometry: Geometry) -> Result<Geometry, ConversionError> {
    for _ in 0..MAX_REPAIR_PASSES {
        if geometry.is_valid() {
            break;
        }
        geometry = geometry.repaired();
    }
    if let Err(issue) = geometry.validate() {
        return Err(ConversionError::MalformedGeometry(issue.to_string()));
    }
    if geometry.is_empty() {
        return Err(ConversionError::MalformedGeometry(
            "nothing left after repair".to_string(),
        ));
    }
    Ok(geometry)
}

fn type_tag(record: &serde_json::Map<String, Value>, legacy: bool) -> Result<Option<String>, ConversionError> {
    match record.get("id") {
        Some(Value::String(tag)) => Ok(Some(tag.clone())),
        Some(other) => Err(ConversionError::InvalidArgument(format!("id is not a string: {other}"))),
        None if legacy => {
            let object_type = record
                .get("properties")
                .and_then(|p| p.get("object_type"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let tag = legacy_type_tag(object_type).unwrap_or_else(|| {
                warn!(object_type, "record has incompatible object_type, importing as annotation");
                ObjectKind::Annotation.type_tag()
            });
            Ok(Some(tag.to_string()))
        }
        None => Ok(None),
    }
}

/// Convert one interchange record into a new object.
///
/// `legacy` enables type tag synthesis for records without an `id`.
pub fn convert_record(record: &Value, fix_invalid: bool, legacy: bool) -> Result<PathObject, ConversionError> {
    let Value::Object(fields) = record else {
        return Err(ConversionError::InvalidArgument("record is not an object".to_string()));
    };
    let properties = fields
        .get("properties")
        .ok_or_else(|| ConversionError::InvalidArgument("missing properties".to_string()))?;
    let geometry = fields
        .get("geometry")
        .ok_or_else(|| ConversionError::InvalidArgument("missing geometry".to_string()))?;

    let geometry: Geometry = serde_json::from_value(geometry.clone())
        .map_err(|e| ConversionError::MalformedGeometry(e.to_string()))?;
    let geometry = if fix_invalid { repair(geometry)? } else { geometry };

    let properties: FeatureProperties = serde_json::from_value(properties.clone())
        .map_err(|e| ConversionError::InvalidArgument(e.to_string()))?;

    let feature = Feature {
        feature_type: "Feature".to_string(),
        id: type_tag(fields, legacy)?,
        geometry,
        properties,
    };
    feature
        .into_object()
        .map_err(|e| ConversionError::InvalidArgument(e.to_string()))
}

impl Hierarchy {
    /// Load interchange records. Returns `true` if new objects were added.
    pub fn load(&self, records: &Value, options: &LoadOptions) -> HierarchyResult<bool> {
        Ok(self.load_with_report(records, options)?.added)
    }

    /// Load interchange records and report what happened to each.
    pub fn load_with_report(&self, records: &Value, options: &LoadOptions) -> HierarchyResult<LoadReport> {
        if self.readonly() {
            return Err(HierarchyError::ReadOnly);
        }
        let Value::Array(records) = records else {
            return Err(HierarchyError::InvalidDocument(
                "requires a list of feature records".to_string(),
            ));
        };

        let legacy = self.store().interchange_version().omits_type_tags();
        let mut staged = Vec::with_capacity(records.len());
        let mut skipped = SkipTally::default();
        for (index, record) in records.iter().enumerate() {
            match convert_record(record, options.fix_invalid, legacy) {
                Ok(object) => staged.push(object),
                Err(err) => {
                    let class_name = classification_name(record);
                    warn!(index, class = class_name, error = %err, "record skipped");
                    skipped.record(class_name);
                }
            }
        }

        if !skipped.is_empty() {
            if options.raise_on_skip {
                return Err(HierarchyError::BatchSkipped {
                    skipped: skipped.total(),
                });
            }
            error!(skipped = skipped.total(), tally = %skipped, "skipped records during load");
        }

        let converted = staged.len();
        let result = self.store().insert_many(staged);
        self.annotations().invalidate();
        self.detections().invalidate();
        let added = result?;

        info!(converted, skipped = skipped.total(), added, "loaded document");
        Ok(LoadReport {
            added,
            converted,
            skipped,
        })
    }
}
