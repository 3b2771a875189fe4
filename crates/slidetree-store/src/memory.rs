use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use slidetree_types::{InterchangeVersion, ObjectId, ObjectKind, PathObject, RootObject};

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. The tree lives behind one `RwLock`;
/// objects are cloned on read.
pub struct InMemoryObjectStore {
    root: RootObject,
    version: InterchangeVersion,
    tree: RwLock<Tree>,
}

#[derive(Default)]
struct Tree {
    objects: HashMap<ObjectId, PathObject>,
    /// Child -> parent. Top-level objects point at the root id.
    parents: HashMap<ObjectId, ObjectId>,
    /// Parent -> children in insertion order. Includes the root id.
    children: HashMap<ObjectId, Vec<ObjectId>>,
}

impl Tree {
    fn contains_node(&self, root: &ObjectId, id: &ObjectId) -> bool {
        id == root || self.objects.contains_key(id)
    }

    fn attach(&mut self, parent: ObjectId, object: PathObject) -> bool {
        let id = object.id();
        if self.objects.contains_key(&id) {
            return false;
        }
        self.children.entry(parent).or_default().push(id);
        self.parents.insert(id, parent);
        self.objects.insert(id, object);
        true
    }

    fn detach(&mut self, id: &ObjectId, recursive: bool) -> bool {
        let Some(parent) = self.parents.remove(id) else {
            return false;
        };
        self.objects.remove(id);
        let children = self.children.remove(id).unwrap_or_default();
        let siblings = self.children.entry(parent).or_default();
        let position = siblings.iter().position(|s| s == id);
        if let Some(position) = position {
            siblings.remove(position);
        }

        if recursive {
            let mut stack = children;
            while let Some(child) = stack.pop() {
                self.parents.remove(&child);
                self.objects.remove(&child);
                stack.extend(self.children.remove(&child).unwrap_or_default());
            }
        } else {
            let at = position.unwrap_or(siblings.len());
            siblings.splice(at..at, children.iter().copied());
            for child in children {
                self.parents.insert(child, parent);
            }
        }
        true
    }

    /// Pre-order walk from `root`, children in insertion order.
    fn walk(&self, root: &ObjectId) -> Vec<&PathObject> {
        let mut out = Vec::with_capacity(self.objects.len());
        let mut stack: Vec<&ObjectId> = self
            .children
            .get(root)
            .map(|c| c.iter().rev().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            if let Some(object) = self.objects.get(id) {
                out.push(object);
            }
            if let Some(children) = self.children.get(id) {
                stack.extend(children.iter().rev());
            }
        }
        out
    }
}

impl InMemoryObjectStore {
    /// Create a new empty store with a fresh root.
    pub fn new() -> Self {
        Self::with_version(InterchangeVersion::CURRENT)
    }

    /// Create an empty store that reads and writes `version` documents.
    pub fn with_version(version: InterchangeVersion) -> Self {
        Self {
            root: RootObject::new(),
            version,
            tree: RwLock::new(Tree::default()),
        }
    }

    fn read_tree(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tree>> {
        self.tree
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_tree(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tree>> {
        self.tree
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    /// Direct children of `parent`, in insertion order.
    pub fn children_of(&self, parent: &ObjectId) -> StoreResult<Vec<ObjectId>> {
        Ok(self
            .read_tree()?
            .children
            .get(parent)
            .cloned()
            .unwrap_or_default())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn count_objects(&self) -> StoreResult<usize> {
        Ok(self.read_tree()?.objects.len())
    }

    fn root_object(&self) -> RootObject {
        self.root
    }

    fn objects_of_kind(&self, kind: ObjectKind) -> StoreResult<Vec<PathObject>> {
        let tree = self.read_tree()?;
        Ok(tree
            .walk(&self.root.id())
            .into_iter()
            .filter(|object| object.kind().matches(kind))
            .cloned()
            .collect())
    }

    fn get(&self, id: &ObjectId) -> StoreResult<Option<PathObject>> {
        Ok(self.read_tree()?.objects.get(id).cloned())
    }

    fn parent_of(&self, id: &ObjectId) -> StoreResult<Option<ObjectId>> {
        Ok(self.read_tree()?.parents.get(id).copied())
    }

    fn insert_child(&self, parent: &ObjectId, object: PathObject) -> StoreResult<bool> {
        let mut tree = self.write_tree()?;
        if !tree.contains_node(&self.root.id(), parent) {
            return Err(StoreError::NotFound(*parent));
        }
        Ok(tree.attach(*parent, object))
    }

    fn insert_many(&self, objects: Vec<PathObject>) -> StoreResult<bool> {
        let mut tree = self.write_tree()?;
        let total = objects.len();
        let root = self.root.id();
        let inserted = objects
            .into_iter()
            .map(|object| tree.attach(root, object))
            .filter(|attached| *attached)
            .count();
        debug!(inserted, skipped = total - inserted, "batch insert");
        Ok(inserted > 0)
    }

    fn remove(&self, id: &ObjectId, recursive: bool) -> StoreResult<bool> {
        Ok(self.write_tree()?.detach(id, recursive))
    }

    fn remove_many(&self, ids: &[ObjectId]) -> StoreResult<usize> {
        let mut tree = self.write_tree()?;
        let removed = ids.iter().filter(|id| tree.detach(id, true)).count();
        debug!(requested = ids.len(), removed, "batch remove");
        Ok(removed)
    }

    fn interchange_version(&self) -> InterchangeVersion {
        self.version
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.count_objects().unwrap_or_default();
        f.debug_struct("InMemoryObjectStore")
            .field("root", &self.root.id())
            .field("object_count", &count)
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidetree_types::{Geometry, PathClass};

    fn make(kind: ObjectKind) -> PathObject {
        PathObject::new(kind, Geometry::rectangle(0.0, 0.0, 10.0, 10.0)).unwrap()
    }

    fn ids(objects: &[PathObject]) -> Vec<ObjectId> {
        objects.iter().map(PathObject::id).collect()
    }

    // -----------------------------------------------------------------------
    // Insert / read
    // -----------------------------------------------------------------------

    #[test]
    fn new_store_is_empty() {
        let store = InMemoryObjectStore::new();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.count_objects().unwrap(), 0);
        assert!(store.parent_of(&store.root_object().id()).unwrap().is_none());
    }

    #[test]
    fn insert_attaches_under_root() {
        let store = InMemoryObjectStore::new();
        let obj = make(ObjectKind::Annotation);
        assert!(store.insert(obj.clone()).unwrap());
        assert_eq!(store.count_objects().unwrap(), 1);
        assert_eq!(store.parent_of(&obj.id()).unwrap(), Some(store.root_object().id()));
        assert_eq!(store.get(&obj.id()).unwrap(), Some(obj));
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let store = InMemoryObjectStore::new();
        let obj = make(ObjectKind::Annotation);
        assert!(store.insert(obj.clone()).unwrap());
        assert!(!store.insert(obj).unwrap());
        assert_eq!(store.count_objects().unwrap(), 1);
    }

    #[test]
    fn insert_child_requires_known_parent() {
        let store = InMemoryObjectStore::new();
        let orphan_parent = ObjectId::new();
        let err = store
            .insert_child(&orphan_parent, make(ObjectKind::Detection))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == orphan_parent));
    }

    #[test]
    fn objects_of_kind_filters_by_family() {
        let store = InMemoryObjectStore::new();
        let annotation = make(ObjectKind::Annotation);
        let detection = make(ObjectKind::Detection);
        let tile = make(ObjectKind::Tile);
        store
            .insert_many(vec![annotation.clone(), detection.clone(), tile.clone()])
            .unwrap();

        assert_eq!(
            ids(&store.objects_of_kind(ObjectKind::Annotation).unwrap()),
            vec![annotation.id()]
        );
        assert_eq!(
            ids(&store.objects_of_kind(ObjectKind::Detection).unwrap()),
            vec![detection.id(), tile.id()]
        );
        assert_eq!(
            ids(&store.objects_of_kind(ObjectKind::Tile).unwrap()),
            vec![tile.id()]
        );
    }

    #[test]
    fn listing_is_preorder() {
        let store = InMemoryObjectStore::new();
        let a = make(ObjectKind::Annotation);
        let b = make(ObjectKind::Annotation);
        let a_child = make(ObjectKind::Annotation);
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();
        store.insert_child(&a.id(), a_child.clone()).unwrap();

        let listed = ids(&store.objects_of_kind(ObjectKind::Annotation).unwrap());
        assert_eq!(listed, vec![a.id(), a_child.id(), b.id()]);
    }

    #[test]
    fn insert_many_reports_change() {
        let store = InMemoryObjectStore::new();
        let obj = make(ObjectKind::Annotation);
        assert!(store.insert_many(vec![obj.clone()]).unwrap());
        assert!(!store.insert_many(vec![obj]).unwrap());
        assert!(!store.insert_many(vec![]).unwrap());
    }

    // -----------------------------------------------------------------------
    // Remove
    // -----------------------------------------------------------------------

    #[test]
    fn recursive_remove_takes_descendants() {
        let store = InMemoryObjectStore::new();
        let parent = make(ObjectKind::Annotation);
        let child = make(ObjectKind::Detection);
        let grandchild = make(ObjectKind::Detection);
        store.insert(parent.clone()).unwrap();
        store.insert_child(&parent.id(), child.clone()).unwrap();
        store.insert_child(&child.id(), grandchild.clone()).unwrap();

        assert!(store.remove(&parent.id(), true).unwrap());
        assert!(store.is_empty().unwrap());
        assert!(store.parent_of(&grandchild.id()).unwrap().is_none());
    }

    #[test]
    fn flat_remove_reparents_children_in_place() {
        let store = InMemoryObjectStore::new();
        let first = make(ObjectKind::Annotation);
        let middle = make(ObjectKind::Annotation);
        let last = make(ObjectKind::Annotation);
        let inner = make(ObjectKind::Annotation);
        store.insert(first.clone()).unwrap();
        store.insert(middle.clone()).unwrap();
        store.insert(last.clone()).unwrap();
        store.insert_child(&middle.id(), inner.clone()).unwrap();

        assert!(store.remove(&middle.id(), false).unwrap());
        let root = store.root_object().id();
        assert_eq!(store.parent_of(&inner.id()).unwrap(), Some(root));
        assert_eq!(
            store.children_of(&root).unwrap(),
            vec![first.id(), inner.id(), last.id()]
        );
    }

    #[test]
    fn removing_unknown_id_is_noop() {
        let store = InMemoryObjectStore::new();
        assert!(!store.remove(&ObjectId::new(), true).unwrap());
        assert!(!store.remove(&store.root_object().id(), true).unwrap());
    }

    #[test]
    fn remove_many_counts_attached_ids() {
        let store = InMemoryObjectStore::new();
        let parent = make(ObjectKind::Annotation);
        let child = make(ObjectKind::Annotation);
        let other = make(ObjectKind::Annotation);
        store.insert(parent.clone()).unwrap();
        store.insert_child(&parent.id(), child.clone()).unwrap();
        store.insert(other.clone()).unwrap();

        let removed = store
            .remove_many(&[parent.id(), child.id(), ObjectId::new()])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count_objects().unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    #[test]
    fn to_document_serializes_matching_kind() {
        let store = InMemoryObjectStore::new();
        let tumor = make(ObjectKind::Annotation).with_class(Some(PathClass::new("Tumor")));
        store
            .insert_many(vec![tumor, make(ObjectKind::Detection)])
            .unwrap();

        let document = store.to_document(ObjectKind::Annotation).unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(document[0]["id"], "PathAnnotationObject");
        assert_eq!(document[0]["properties"]["classification"]["name"], "Tumor");
    }

    #[test]
    fn version_marker() {
        let legacy = InterchangeVersion::new(0, 2, 3);
        assert_eq!(InMemoryObjectStore::with_version(legacy).interchange_version(), legacy);
        assert_eq!(
            InMemoryObjectStore::new().interchange_version(),
            InterchangeVersion::CURRENT
        );
    }

    #[test]
    fn debug_shows_count() {
        let store = InMemoryObjectStore::new();
        store.insert(make(ObjectKind::Annotation)).unwrap();
        assert!(format!("{store:?}").contains("object_count: 1"));
    }
}
