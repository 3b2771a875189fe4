use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::class::PathClass;
use crate::error::TypeError;
use crate::geometry::Geometry;
use crate::id::ObjectId;
use crate::kind::ObjectKind;

/// Named numeric measurements attached to an object.
pub type Measurements = BTreeMap<String, f64>;

/// A spatial object: a region of interest plus classification data.
///
/// Equality and hashing go by [`ObjectId`] only, so two snapshots of the
/// same store-resident object compare equal even if read at different times.
#[derive(Clone, Debug)]
pub struct PathObject {
    id: ObjectId,
    kind: ObjectKind,
    roi: Geometry,
    path_class: Option<PathClass>,
    measurements: Measurements,
    probability: f64,
    name: Option<String>,
    locked: bool,
}

impl PathObject {
    /// Create an object of `kind` with a fresh id.
    ///
    /// Fails if `roi` has no positions.
    pub fn new(kind: ObjectKind, roi: Geometry) -> Result<Self, TypeError> {
        if roi.is_empty() {
            return Err(TypeError::EmptyGeometry);
        }
        Ok(Self {
            id: ObjectId::new(),
            kind,
            roi,
            path_class: None,
            measurements: Measurements::new(),
            probability: f64::NAN,
            name: None,
            locked: false,
        })
    }

    /// Set the classification.
    pub fn with_class(mut self, path_class: Option<PathClass>) -> Self {
        self.path_class = path_class;
        self
    }

    /// Set the measurements.
    pub fn with_measurements(mut self, measurements: Measurements) -> Self {
        self.measurements = measurements;
        self
    }

    /// Set the classification probability. `NaN` means unset.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Set the locked flag.
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn roi(&self) -> &Geometry {
        &self.roi
    }

    pub fn path_class(&self) -> Option<&PathClass> {
        self.path_class.as_ref()
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    /// Classification probability; `NaN` when never set.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl PartialEq for PathObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PathObject {}

impl Hash for PathObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for PathObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.kind, self.roi.type_name())?;
        if let Some(class) = &self.path_class {
            write!(f, ", class={class}")?;
        }
        write!(f, ")")
    }
}

/// The synthetic top of a hierarchy.
///
/// The root has no geometry and can never be classified. Every object
/// attached to a store descends from exactly one root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RootObject {
    id: ObjectId,
}

impl RootObject {
    pub fn new() -> Self {
        Self { id: ObjectId::new() }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Always `None`.
    pub fn path_class(&self) -> Option<&PathClass> {
        None
    }
}

impl Default for RootObject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Geometry {
        Geometry::rectangle(0.0, 0.0, 1.0, 1.0)
    }

    #[test]
    fn new_object_defaults() {
        let obj = PathObject::new(ObjectKind::Annotation, square()).unwrap();
        assert_eq!(obj.kind(), ObjectKind::Annotation);
        assert!(obj.path_class().is_none());
        assert!(obj.measurements().is_empty());
        assert!(obj.probability().is_nan());
        assert!(!obj.is_locked());
    }

    #[test]
    fn empty_roi_is_rejected() {
        let result = PathObject::new(ObjectKind::Detection, Geometry::Polygon(vec![]));
        assert_eq!(result.unwrap_err(), TypeError::EmptyGeometry);
    }

    #[test]
    fn equality_is_by_id() {
        let a = PathObject::new(ObjectKind::Annotation, square()).unwrap();
        let renamed = a.clone().with_name(Some("renamed".into()));
        let b = PathObject::new(ObjectKind::Annotation, square()).unwrap();
        assert_eq!(a, renamed);
        assert_ne!(a, b);
    }

    #[test]
    fn builder_sets_fields() {
        let mut measurements = Measurements::new();
        measurements.insert("area".into(), 1.0);
        let obj = PathObject::new(ObjectKind::Tile, square())
            .unwrap()
            .with_class(Some(PathClass::new("Tumor")))
            .with_measurements(measurements)
            .with_probability(0.75)
            .with_locked(true);
        assert_eq!(obj.path_class().map(PathClass::name), Some("Tumor"));
        assert_eq!(obj.measurements()["area"], 1.0);
        assert_eq!(obj.probability(), 0.75);
        assert!(obj.is_locked());
        assert_eq!(format!("{obj}"), "Tile(Polygon, class=Tumor)");
    }

    #[test]
    fn root_has_no_class() {
        let root = RootObject::new();
        assert!(root.path_class().is_none());
        assert_ne!(root.id(), RootObject::new().id());
    }
}
