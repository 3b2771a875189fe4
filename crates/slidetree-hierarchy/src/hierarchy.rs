//! The hierarchy coordinator.

use std::fmt;
use std::sync::{Arc, Weak};

use serde_json::Value;

use slidetree_store::{InMemoryObjectStore, ObjectStore};
use slidetree_types::{Geometry, Measurements, ObjectKind, PathClass, PathObject, RootObject};

use crate::container::ImageContainer;
use crate::error::{HierarchyError, HierarchyResult};
use crate::view::{ObjectView, PathObjectRef};

/// State shared by a hierarchy and every view derived from it.
pub(crate) struct Shared {
    pub(crate) store: Arc<dyn ObjectStore>,
    container: Option<Weak<dyn ImageContainer>>,
}

impl Shared {
    /// Resolved on every call; an expired container never blocks writes.
    pub(crate) fn readonly(&self) -> bool {
        self.container
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|container| container.is_readonly())
    }

    fn image_name(&self) -> Option<String> {
        self.container
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|container| container.image_name())
    }
}

/// The object hierarchy of one image.
///
/// Owns the two persistent base views, `annotations` and `detections`, and
/// exposes convenience constructors that build an object and insert it
/// through the matching view.
pub struct Hierarchy {
    shared: Arc<Shared>,
    annotations: ObjectView,
    detections: ObjectView,
}

impl Hierarchy {
    /// A standalone hierarchy over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryObjectStore::new()))
    }

    /// A standalone hierarchy over `store`. Always writable.
    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self::build(store, None)
    }

    /// A hierarchy owned by `container`, which decides writability.
    ///
    /// Only a weak reference is kept; once the container is dropped the
    /// hierarchy becomes writable.
    pub fn attached<C: ImageContainer + 'static>(store: Arc<dyn ObjectStore>, container: &Arc<C>) -> Self {
        let weak: Weak<C> = Arc::downgrade(container);
        let container: Weak<dyn ImageContainer> = weak;
        Self::build(store, Some(container))
    }

    fn build(store: Arc<dyn ObjectStore>, container: Option<Weak<dyn ImageContainer>>) -> Self {
        let shared = Arc::new(Shared { store, container });
        Self {
            annotations: ObjectView::base(Arc::clone(&shared), ObjectKind::Annotation),
            detections: ObjectView::base(Arc::clone(&shared), ObjectKind::Detection),
            shared,
        }
    }

    pub fn readonly(&self) -> bool {
        self.shared.readonly()
    }

    /// Number of objects, not counting the root.
    pub fn len(&self) -> HierarchyResult<usize> {
        Ok(self.shared.store.count_objects()?)
    }

    pub fn is_empty(&self) -> HierarchyResult<bool> {
        Ok(self.shared.store.is_empty()?)
    }

    pub fn root(&self) -> RootObject {
        self.shared.store.root_object()
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.shared.store
    }

    /// Name of the enclosing image, if the container is still alive.
    pub fn image_name(&self) -> Option<String> {
        self.shared.image_name()
    }

    pub fn annotations(&self) -> &ObjectView {
        &self.annotations
    }

    pub fn detections(&self) -> &ObjectView {
        &self.detections
    }

    /// The base view whose filter accepts `kind`.
    pub fn view_for(&self, kind: ObjectKind) -> &ObjectView {
        match kind.family() {
            ObjectKind::Annotation => &self.annotations,
            _ => &self.detections,
        }
    }

    pub fn add_annotation(
        &self,
        roi: Geometry,
        path_class: Option<PathClass>,
        measurements: Option<Measurements>,
        probability: Option<f64>,
    ) -> HierarchyResult<PathObjectRef> {
        self.add_object(ObjectKind::Annotation, roi, path_class, measurements, probability)
    }

    pub fn add_detection(
        &self,
        roi: Geometry,
        path_class: Option<PathClass>,
        measurements: Option<Measurements>,
        probability: Option<f64>,
    ) -> HierarchyResult<PathObjectRef> {
        self.add_object(ObjectKind::Detection, roi, path_class, measurements, probability)
    }

    pub fn add_tile(
        &self,
        roi: Geometry,
        path_class: Option<PathClass>,
        measurements: Option<Measurements>,
        probability: Option<f64>,
    ) -> HierarchyResult<PathObjectRef> {
        self.add_object(ObjectKind::Tile, roi, path_class, measurements, probability)
    }

    fn add_object(
        &self,
        kind: ObjectKind,
        roi: Geometry,
        path_class: Option<PathClass>,
        measurements: Option<Measurements>,
        probability: Option<f64>,
    ) -> HierarchyResult<PathObjectRef> {
        if self.readonly() {
            return Err(HierarchyError::ReadOnly);
        }
        let object = PathObject::new(kind, roi)?
            .with_class(path_class)
            .with_measurements(measurements.unwrap_or_default())
            .with_probability(probability.unwrap_or(f64::NAN));
        let view = self.view_for(kind);
        view.add(object.clone())?;
        Ok(view.wrap(object))
    }

    /// Serialize all annotations as interchange feature records.
    pub fn to_document(&self) -> HierarchyResult<Vec<Value>> {
        Ok(self.shared.store.to_document(ObjectKind::Annotation)?)
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let image = self.image_name().unwrap_or_else(|| "N/A".to_string());
        let count = |view: &ObjectView| view.len().map_or_else(|_| "?".to_string(), |n| n.to_string());
        write!(
            f,
            "Hierarchy(image={image}, annotations={}, detections={})",
            count(&self.annotations),
            count(&self.detections),
        )
    }
}

impl fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hierarchy")
            .field("root", &self.root())
            .field("readonly", &self.readonly())
            .field("annotations", &self.annotations)
            .field("detections", &self.detections)
            .finish()
    }
}
