use slidetree_types::{InterchangeVersion, ObjectId, ObjectKind, PathObject, RootObject};

use crate::document::Feature;
use crate::error::{StoreError, StoreResult};

/// A mutable tree of spatial objects under one root.
///
/// All implementations must satisfy these invariants:
/// - The root is fixed for the lifetime of the store and is never listed,
///   counted, or removed.
/// - Every attached object has exactly one parent (the root or another
///   object); `parent_of` is `None` only for the root and unknown ids.
/// - `objects_of_kind` lists in pre-order, children in insertion order.
/// - Inserting an id that is already present changes nothing.
pub trait ObjectStore: Send + Sync {
    /// Number of objects, not counting the root.
    fn count_objects(&self) -> StoreResult<usize>;

    /// Returns `true` if only the root is present.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.count_objects()? == 0)
    }

    /// The root object.
    fn root_object(&self) -> RootObject;

    /// All objects whose kind matches `kind` (see [`ObjectKind::matches`]).
    fn objects_of_kind(&self, kind: ObjectKind) -> StoreResult<Vec<PathObject>>;

    /// Number of objects whose kind matches `kind`.
    fn count_of_kind(&self, kind: ObjectKind) -> StoreResult<usize> {
        Ok(self.objects_of_kind(kind)?.len())
    }

    /// Read an object by id. Returns `Ok(None)` if it is not attached.
    fn get(&self, id: &ObjectId) -> StoreResult<Option<PathObject>>;

    /// The parent id of an attached object.
    fn parent_of(&self, id: &ObjectId) -> StoreResult<Option<ObjectId>>;

    /// Attach `object` under `parent` (the root id or an attached object).
    ///
    /// Returns `false` if an object with the same id is already attached.
    fn insert_child(&self, parent: &ObjectId, object: PathObject) -> StoreResult<bool>;

    /// Attach `object` directly under the root.
    fn insert(&self, object: PathObject) -> StoreResult<bool> {
        self.insert_child(&self.root_object().id(), object)
    }

    /// Attach several objects under the root. Returns `true` if anything changed.
    ///
    /// Default implementation calls `insert()` for each object. Backends may
    /// override to apply the batch under one lock.
    fn insert_many(&self, objects: Vec<PathObject>) -> StoreResult<bool> {
        let mut changed = false;
        for object in objects {
            changed |= self.insert(object)?;
        }
        Ok(changed)
    }

    /// Detach an object. Returns `true` if it was attached.
    ///
    /// With `recursive`, all descendants go with it; otherwise its children
    /// take its place under its parent.
    fn remove(&self, id: &ObjectId, recursive: bool) -> StoreResult<bool>;

    /// Recursively detach several objects. Returns how many ids were attached.
    fn remove_many(&self, ids: &[ObjectId]) -> StoreResult<usize> {
        let mut removed = 0;
        for id in ids {
            if self.remove(id, true)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// The interchange format version this store reads and writes.
    fn interchange_version(&self) -> InterchangeVersion {
        InterchangeVersion::CURRENT
    }

    /// Serialize every object matching `kind` as interchange feature records.
    fn to_document(&self, kind: ObjectKind) -> StoreResult<Vec<serde_json::Value>> {
        self.objects_of_kind(kind)?
            .iter()
            .map(|object| {
                serde_json::to_value(Feature::from_object(object))
                    .map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }
}
