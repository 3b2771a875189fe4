//! Set-like, indexable views over the objects of one kind.
//!
//! An [`ObjectView`] binds a hierarchy, a kind filter, and an optional
//! [`Mask`]. The filtered, masked list is materialized on first use and held
//! in a [`CacheCell`] until a mutation through the view invalidates it.
//!
//! # Invariants
//!
//! - Only base views (no mask) mutate the store; derived views are readonly
//!   snapshots of positions.
//! - The cache is absent or one full point-in-time read of the store.
//! - Membership (`contains`) walks the live tree, never the cache.
//! - Views compare by identity; cloning an `ObjectView` yields another handle
//!   to the same view.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use tracing::debug;

use slidetree_store::ObjectStore;
use slidetree_types::{ObjectId, ObjectKind, PathObject, RootObject};

use crate::cache::CacheCell;
use crate::error::{HierarchyError, HierarchyResult};
use crate::hierarchy::Shared;
use crate::mask::{self, Mask, Selection, Slice};

/// A filtered, optionally masked, cached window onto a hierarchy's store.
#[derive(Clone)]
pub struct ObjectView {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    shared: Arc<Shared>,
    kind: ObjectKind,
    mask: Option<Mask>,
    cache: CacheCell<Vec<PathObject>>,
}

impl ObjectView {
    /// The unmasked view of `kind`. Only the hierarchy creates these.
    pub(crate) fn base(shared: Arc<Shared>, kind: ObjectKind) -> Self {
        Self::with_mask(shared, kind, None)
    }

    fn with_mask(shared: Arc<Shared>, kind: ObjectKind, mask: Option<Mask>) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                shared,
                kind,
                mask,
                cache: CacheCell::new(),
            }),
        }
    }

    /// The kind filter.
    pub fn kind(&self) -> ObjectKind {
        self.inner.kind
    }

    /// The mask, `None` for a base view.
    pub fn mask(&self) -> Option<&Mask> {
        self.inner.mask.as_ref()
    }

    /// Returns `true` for the unmasked view that may mutate the store.
    pub fn is_base(&self) -> bool {
        self.inner.mask.is_none()
    }

    /// Returns `true` if mutations through this view would be refused.
    pub fn is_readonly(&self) -> bool {
        !self.is_base() || self.inner.shared.readonly()
    }

    /// Returns `true` if both handles refer to the same view.
    pub fn ptr_eq(&self, other: &ObjectView) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn store(&self) -> &dyn ObjectStore {
        self.inner.shared.store.as_ref()
    }

    // ---------------------------------------------------------------
    // Cache
    // ---------------------------------------------------------------

    fn objects(&self) -> HierarchyResult<Arc<Vec<PathObject>>> {
        self.inner.cache.get_or_try_init(|| {
            let objects = self.store().objects_of_kind(self.inner.kind)?;
            let objects = match self.mask() {
                None => objects,
                restriction => mask::apply(restriction, &objects)?,
            };
            debug!(kind = %self.inner.kind, count = objects.len(), "materialized view");
            Ok(objects)
        })
    }

    /// Drop the cached list; the next read rematerializes it.
    ///
    /// Mutations through this view do this automatically. Call it after
    /// changing the store by other means.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate();
        debug!(kind = %self.inner.kind, "invalidated view");
    }

    /// Returns `true` if the list is currently materialized.
    pub fn is_cached(&self) -> bool {
        self.inner.cache.is_cached()
    }

    // ---------------------------------------------------------------
    // Sequence operations
    // ---------------------------------------------------------------

    pub fn len(&self) -> HierarchyResult<usize> {
        Ok(self.objects()?.len())
    }

    pub fn is_empty(&self) -> HierarchyResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterate over the current snapshot. Each call starts from the beginning.
    pub fn iter(&self) -> HierarchyResult<ViewIter> {
        Ok(ViewIter {
            objects: self.objects()?,
            position: 0,
            view: Arc::downgrade(&self.inner),
        })
    }

    /// The object at `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> HierarchyResult<PathObjectRef> {
        let objects = self.objects()?;
        let position = mask::normalize(index, objects.len())?;
        Ok(self.wrap(objects[position].clone()))
    }

    /// A derived view over the positions `slice` selects.
    pub fn slice(&self, slice: impl Into<Slice>) -> HierarchyResult<ObjectView> {
        self.derive(Selection::Slice(slice.into()))
    }

    /// A derived view over the listed positions, in the order given.
    pub fn select(&self, indices: &[isize]) -> HierarchyResult<ObjectView> {
        self.derive(Selection::from(indices))
    }

    fn derive(&self, selection: Selection) -> HierarchyResult<ObjectView> {
        let mask = mask::compose(self.mask(), selection, || {
            Ok(self.store().count_of_kind(self.inner.kind)?)
        })?;
        Ok(Self::with_mask(
            Arc::clone(&self.inner.shared),
            self.inner.kind,
            Some(mask),
        ))
    }

    // ---------------------------------------------------------------
    // Set operations
    // ---------------------------------------------------------------

    /// Whether `object` is attached to this view's hierarchy.
    ///
    /// Objects of a kind the view does not select are never members. For the
    /// rest, the parent chain is walked up to its top and compared with the
    /// root.
    pub fn contains(&self, object: &PathObject) -> HierarchyResult<bool> {
        if !object.kind().matches(self.inner.kind) {
            return Ok(false);
        }
        let store = self.store();
        let mut current = object.id();
        while let Some(parent) = store.parent_of(&current)? {
            current = parent;
        }
        Ok(current == store.root_object().id())
    }

    fn check_writable(&self) -> HierarchyResult<()> {
        if !self.is_base() {
            return Err(HierarchyError::ViewRestricted);
        }
        if self.inner.shared.readonly() {
            return Err(HierarchyError::ReadOnly);
        }
        Ok(())
    }

    fn check_kind(&self, object: &PathObject) -> HierarchyResult<()> {
        if object.kind().matches(self.inner.kind) {
            Ok(())
        } else {
            Err(HierarchyError::KindMismatch {
                expected: self.inner.kind,
                actual: object.kind(),
            })
        }
    }

    /// Insert `object` under the root. Returns `false` if it was already stored.
    pub fn add(&self, object: PathObject) -> HierarchyResult<bool> {
        self.check_writable()?;
        self.check_kind(&object)?;
        let result = self.store().insert(object);
        self.invalidate();
        Ok(result?)
    }

    /// Remove `object` and its descendants. Returns `false` for non-members.
    pub fn discard(&self, object: &PathObject) -> HierarchyResult<bool> {
        self.check_writable()?;
        self.check_kind(object)?;
        let result = self.store().remove(&object.id(), true);
        self.invalidate();
        Ok(result?)
    }

    /// Remove every object currently in the view, as one batch.
    pub fn clear(&self) -> HierarchyResult<()> {
        self.check_writable()?;
        let ids: Vec<ObjectId> = self.objects()?.iter().map(PathObject::id).collect();
        let result = self.store().remove_many(&ids);
        self.invalidate();
        let removed = result?;
        debug!(kind = %self.inner.kind, removed, "cleared view");
        Ok(())
    }

    /// Add every object in `objects`.
    pub fn update<I>(&self, objects: I) -> HierarchyResult<()>
    where
        I: IntoIterator,
        I::Item: Into<PathObject>,
    {
        for object in objects {
            self.add(object.into())?;
        }
        Ok(())
    }

    pub(crate) fn wrap(&self, object: PathObject) -> PathObjectRef {
        PathObjectRef {
            object,
            view: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Display for ObjectView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mask() {
            None => write!(f, "ObjectView(kind={})", self.inner.kind),
            Some(mask) => write!(f, "ObjectView(kind={}, mask={mask})", self.inner.kind),
        }
    }
}

impl fmt::Debug for ObjectView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectView")
            .field("kind", &self.inner.kind)
            .field("mask", &self.inner.mask)
            .field("cached", &self.is_cached())
            .finish()
    }
}

/// Iterator over a view snapshot.
pub struct ViewIter {
    objects: Arc<Vec<PathObject>>,
    position: usize,
    view: Weak<ViewInner>,
}

impl Iterator for ViewIter {
    type Item = PathObjectRef;

    fn next(&mut self) -> Option<Self::Item> {
        let object = self.objects.get(self.position)?.clone();
        self.position += 1;
        Some(PathObjectRef {
            object,
            view: self.view.clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.objects.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ViewIter {}

/// The parent of a wrapped object.
#[derive(Clone, Debug)]
pub enum ParentNode {
    Root(RootObject),
    Object(PathObjectRef),
}

/// A store object read through a view.
///
/// Holds a snapshot of the object and a weak back-reference to the view that
/// produced it. The reference never keeps the view alive; it is only used to
/// find the store for [`parent`](Self::parent).
#[derive(Clone, Debug)]
pub struct PathObjectRef {
    object: PathObject,
    view: Weak<ViewInner>,
}

impl PathObjectRef {
    pub fn object(&self) -> &PathObject {
        &self.object
    }

    pub fn into_object(self) -> PathObject {
        self.object
    }

    /// The producing view, if it is still alive.
    pub fn view(&self) -> Option<ObjectView> {
        self.view.upgrade().map(|inner| ObjectView { inner })
    }

    /// The object's current parent in the store.
    ///
    /// `Ok(None)` if the object is no longer attached. Fails with
    /// [`HierarchyError::Detached`] once the producing view is gone.
    pub fn parent(&self) -> HierarchyResult<Option<ParentNode>> {
        let inner = self.view.upgrade().ok_or(HierarchyError::Detached)?;
        let store = inner.shared.store.as_ref();
        let Some(parent) = store.parent_of(&self.object.id())? else {
            return Ok(None);
        };
        let root = store.root_object();
        if parent == root.id() {
            return Ok(Some(ParentNode::Root(root)));
        }
        Ok(store.get(&parent)?.map(|object| {
            ParentNode::Object(PathObjectRef {
                object,
                view: self.view.clone(),
            })
        }))
    }
}

impl Deref for PathObjectRef {
    type Target = PathObject;

    fn deref(&self) -> &PathObject {
        &self.object
    }
}

impl From<PathObjectRef> for PathObject {
    fn from(wrapped: PathObjectRef) -> Self {
        wrapped.object
    }
}

impl PartialEq for PathObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl Eq for PathObjectRef {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ImageEntry;
    use crate::hierarchy::Hierarchy;
    use slidetree_store::InMemoryObjectStore;
    use slidetree_types::{Geometry, PathClass};

    fn square(offset: f64) -> Geometry {
        Geometry::rectangle(offset, offset, 1.0, 1.0)
    }

    fn annotation(name: &str) -> PathObject {
        PathObject::new(ObjectKind::Annotation, square(0.0))
            .unwrap()
            .with_class(Some(PathClass::new(name)))
    }

    fn populated(n: usize) -> (Hierarchy, Vec<PathObject>) {
        let hierarchy = Hierarchy::new();
        let objects: Vec<PathObject> = (0..n).map(|i| annotation(&format!("c{i}"))).collect();
        hierarchy.annotations().update(objects.clone()).unwrap();
        (hierarchy, objects)
    }

    fn classes(view: &ObjectView) -> Vec<String> {
        view.iter()
            .unwrap()
            .map(|o| o.path_class().map(|c| c.name().to_string()).unwrap_or_default())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Sequence access
    // -----------------------------------------------------------------------

    #[test]
    fn length_and_indexing() {
        let (hierarchy, objects) = populated(4);
        let view = hierarchy.annotations();
        assert_eq!(view.len().unwrap(), 4);
        assert_eq!(*view.get(0).unwrap(), objects[0]);
        assert_eq!(*view.get(-1).unwrap(), objects[3]);
        assert!(matches!(
            view.get(4).unwrap_err(),
            HierarchyError::IndexOutOfRange { index: 4, len: 4 }
        ));
    }

    #[test]
    fn iteration_is_restartable() {
        let (hierarchy, _) = populated(3);
        let view = hierarchy.annotations();
        let mut first = view.iter().unwrap();
        assert_eq!(first.len(), 3);
        first.next();
        assert_eq!(first.len(), 2);
        assert_eq!(view.iter().unwrap().count(), 3);
    }

    #[test]
    fn slice_and_select_compose() {
        let (hierarchy, _) = populated(6);
        let view = hierarchy.annotations();

        let tail = view.slice(2..).unwrap();
        assert_eq!(classes(&tail), vec!["c2", "c3", "c4", "c5"]);

        let every_other = tail.slice(Slice::FULL.with_step(2)).unwrap();
        assert_eq!(classes(&every_other), vec!["c2", "c4"]);

        let picked = tail.select(&[-1, 0]).unwrap();
        assert_eq!(classes(&picked), vec!["c5", "c2"]);

        let reversed = picked.slice(Slice::FULL.with_step(-1)).unwrap();
        assert_eq!(classes(&reversed), vec!["c2", "c5"]);
    }

    #[test]
    fn nested_views_match_direct_indexing() {
        let (hierarchy, _) = populated(9);
        let view = hierarchy.annotations();
        let nested = view
            .slice(Slice::FULL.with_step(-1))
            .unwrap()
            .slice(1..7)
            .unwrap()
            .select(&[0, 2, -1])
            .unwrap();
        assert_eq!(classes(&nested), vec!["c7", "c5", "c2"]);
        assert_eq!(nested.get(1).unwrap().path_class().unwrap().name(), "c5");
    }

    #[test]
    fn invalid_selections_are_rejected() {
        let (hierarchy, _) = populated(2);
        let view = hierarchy.annotations();
        assert!(matches!(
            view.select(&[]).unwrap_err(),
            HierarchyError::InvalidMask(_)
        ));
        assert!(matches!(
            view.slice(Slice::FULL.with_step(0)).unwrap_err(),
            HierarchyError::InvalidMask(_)
        ));
    }

    #[test]
    fn derived_views_are_independent_snapshots() {
        let (hierarchy, _) = populated(3);
        let first = hierarchy.annotations().slice(..2).unwrap();
        let second = hierarchy.annotations().slice(..2).unwrap();
        assert!(!first.ptr_eq(&second));
        assert!(first.ptr_eq(&first.clone()));
    }

    // -----------------------------------------------------------------------
    // Mutation and caching
    // -----------------------------------------------------------------------

    #[test]
    fn add_invalidates_cache() {
        let (hierarchy, _) = populated(2);
        let view = hierarchy.annotations();
        assert_eq!(view.len().unwrap(), 2);
        assert!(view.is_cached());

        let extra = annotation("extra");
        assert!(view.add(extra.clone()).unwrap());
        assert!(!view.is_cached());
        assert_eq!(view.len().unwrap(), 3);
        assert_eq!(*view.get(-1).unwrap(), extra);
    }

    #[test]
    fn adding_existing_member_is_noop() {
        let (hierarchy, objects) = populated(2);
        let view = hierarchy.annotations();
        assert!(!view.add(objects[0].clone()).unwrap());
        assert_eq!(view.len().unwrap(), 2);
    }

    #[test]
    fn discard_removes_descendants() {
        let hierarchy = Hierarchy::new();
        let parent = annotation("parent");
        let child = annotation("child");
        hierarchy.annotations().add(parent.clone()).unwrap();
        hierarchy.store().insert_child(&parent.id(), child.clone()).unwrap();
        hierarchy.annotations().invalidate();
        assert_eq!(hierarchy.annotations().len().unwrap(), 2);

        assert!(hierarchy.annotations().discard(&parent).unwrap());
        assert!(hierarchy.annotations().is_empty().unwrap());
        assert!(!hierarchy.annotations().contains(&child).unwrap());
    }

    #[test]
    fn discard_non_member_is_noop() {
        let (hierarchy, _) = populated(2);
        let view = hierarchy.annotations();
        assert!(!view.discard(&annotation("stranger")).unwrap());
        assert_eq!(view.len().unwrap(), 2);
    }

    #[test]
    fn clear_removes_cached_members() {
        let hierarchy = Hierarchy::new();
        hierarchy.annotations().update(vec![annotation("a"), annotation("b")]).unwrap();
        hierarchy
            .add_detection(square(5.0), None, None, None)
            .unwrap();

        hierarchy.annotations().clear().unwrap();
        assert!(hierarchy.annotations().is_empty().unwrap());
        assert_eq!(hierarchy.detections().len().unwrap(), 1);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let hierarchy = Hierarchy::new();
        let detection = PathObject::new(ObjectKind::Detection, square(0.0)).unwrap();
        let err = hierarchy.annotations().add(detection.clone()).unwrap_err();
        assert!(matches!(
            err,
            HierarchyError::KindMismatch {
                expected: ObjectKind::Annotation,
                actual: ObjectKind::Detection
            }
        ));
        assert!(hierarchy.is_empty().unwrap());
        assert!(matches!(
            hierarchy.annotations().discard(&detection).unwrap_err(),
            HierarchyError::KindMismatch { .. }
        ));
    }

    #[test]
    fn tiles_go_through_detections() {
        let hierarchy = Hierarchy::new();
        let tile = PathObject::new(ObjectKind::Tile, square(0.0)).unwrap();
        assert!(hierarchy.detections().add(tile.clone()).unwrap());
        assert!(hierarchy.detections().contains(&tile).unwrap());
    }

    #[test]
    fn derived_views_refuse_mutation() {
        let (hierarchy, objects) = populated(3);
        let derived = hierarchy.annotations().slice(..2).unwrap();
        assert!(derived.is_readonly());

        assert!(matches!(
            derived.add(annotation("new")).unwrap_err(),
            HierarchyError::ViewRestricted
        ));
        assert!(matches!(
            derived.discard(&objects[0]).unwrap_err(),
            HierarchyError::ViewRestricted
        ));
        assert!(matches!(derived.clear().unwrap_err(), HierarchyError::ViewRestricted));
        assert_eq!(hierarchy.len().unwrap(), 3);
    }

    #[test]
    fn readonly_container_blocks_mutation() {
        let entry = Arc::new(ImageEntry::readonly("slide.svs"));
        let hierarchy = Hierarchy::attached(Arc::new(InMemoryObjectStore::new()), &entry);
        let view = hierarchy.annotations();
        assert!(view.is_readonly());
        assert!(matches!(
            view.add(annotation("blocked")).unwrap_err(),
            HierarchyError::ReadOnly
        ));
        assert!(matches!(view.clear().unwrap_err(), HierarchyError::ReadOnly));
    }

    #[test]
    fn mask_check_precedes_readonly_check() {
        let entry = Arc::new(ImageEntry::new("slide.svs"));
        let hierarchy = Hierarchy::attached(Arc::new(InMemoryObjectStore::new()), &entry);
        hierarchy.annotations().add(annotation("a")).unwrap();
        let derived = hierarchy.annotations().slice(..).unwrap();
        entry.set_readonly(true);
        assert!(matches!(
            derived.add(annotation("b")).unwrap_err(),
            HierarchyError::ViewRestricted
        ));
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    #[test]
    fn contains_reflects_live_topology() {
        let (hierarchy, objects) = populated(2);
        let view = hierarchy.annotations();
        assert_eq!(view.len().unwrap(), 2);

        let late = annotation("late");
        hierarchy.store().insert(late.clone()).unwrap();
        assert!(view.is_cached());
        assert!(view.contains(&late).unwrap());
        assert_eq!(view.len().unwrap(), 2);

        hierarchy.store().remove(&objects[0].id(), true).unwrap();
        assert!(!view.contains(&objects[0]).unwrap());
    }

    #[test]
    fn contains_rejects_foreign_kind_and_other_hierarchies() {
        let (hierarchy, objects) = populated(1);
        let detection = hierarchy.add_detection(square(3.0), None, None, None).unwrap();
        assert!(!hierarchy.annotations().contains(&detection).unwrap());
        assert!(hierarchy.detections().contains(&detection).unwrap());

        let (other, _) = populated(1);
        assert!(!other.annotations().contains(&objects[0]).unwrap());
    }

    #[test]
    fn nested_objects_are_members() {
        let hierarchy = Hierarchy::new();
        let parent = hierarchy.add_annotation(square(0.0), None, None, None).unwrap();
        let nested = annotation("nested");
        hierarchy.store().insert_child(&parent.id(), nested.clone()).unwrap();
        assert!(hierarchy.annotations().contains(&nested).unwrap());
    }

    // -----------------------------------------------------------------------
    // Wrapped objects
    // -----------------------------------------------------------------------

    #[test]
    fn wrapped_objects_walk_parents() {
        let hierarchy = Hierarchy::new();
        let parent = hierarchy.add_annotation(square(0.0), None, None, None).unwrap();
        let child = annotation("child");
        hierarchy.store().insert_child(&parent.id(), child.clone()).unwrap();
        hierarchy.annotations().invalidate();

        let wrapped = hierarchy
            .annotations()
            .iter()
            .unwrap()
            .find(|o| o.id() == child.id())
            .unwrap();
        match wrapped.parent().unwrap() {
            Some(ParentNode::Object(p)) => {
                assert_eq!(p.id(), parent.id());
                assert!(matches!(p.parent().unwrap(), Some(ParentNode::Root(r)) if r == hierarchy.root()));
            }
            other => panic!("unexpected parent {other:?}"),
        }
        assert!(wrapped.view().unwrap().ptr_eq(hierarchy.annotations()));
    }

    #[test]
    fn wrapped_object_does_not_keep_view_alive() {
        let (hierarchy, _) = populated(2);
        let derived = hierarchy.annotations().slice(..1).unwrap();
        let wrapped = derived.get(0).unwrap();
        drop(derived);
        assert!(wrapped.view().is_none());
        assert!(matches!(wrapped.parent().unwrap_err(), HierarchyError::Detached));
        assert!(wrapped.path_class().is_some());
    }

    #[test]
    fn display() {
        let (hierarchy, _) = populated(3);
        assert_eq!(hierarchy.annotations().to_string(), "ObjectView(kind=Annotation)");
        let derived = hierarchy.detections().slice(Slice::from(1..3).with_step(2)).unwrap();
        assert_eq!(derived.to_string(), "ObjectView(kind=Detection, mask=1:3:2)");
    }
}
