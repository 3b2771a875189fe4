//! Object hierarchy for slidetree.
//!
//! A [`Hierarchy`] fronts an [`ObjectStore`](slidetree_store::ObjectStore)
//! with two persistent, set-like and indexable views: annotations and
//! detections. Views can be sliced or indexed into derived views that
//! address a subset of positions without copying or touching the store.
//!
//! # Key Types
//!
//! - [`Hierarchy`] -- coordinator owning the store handle and the base views
//! - [`ObjectView`] -- kind-filtered, optionally masked, cached object list
//! - [`PathObjectRef`] -- an object read through a view, able to walk parents
//! - [`Mask`] -- a slice or index list restricting a view
//! - [`ImageContainer`] -- the enclosing image entry that controls writability
//!
//! # Design Rules
//!
//! 1. Only unmasked views mutate, and only while the container allows it.
//! 2. Mutations invalidate the view's cache; reads rebuild it in full.
//! 3. Mask composition is associative: nesting views equals indexing once.
//! 4. Nothing here owns the container or keeps a view alive from an object.

pub mod cache;
pub mod container;
pub mod error;
pub mod hierarchy;
pub mod ingest;
pub mod mask;
pub mod view;

pub use cache::CacheCell;
pub use container::{ImageContainer, ImageEntry};
pub use error::{HierarchyError, HierarchyResult};
pub use hierarchy::Hierarchy;
pub use ingest::{ConversionError, LoadOptions, LoadReport, SkipTally};
pub use mask::{Mask, Selection, Slice};
pub use view::{ObjectView, ParentNode, PathObjectRef, ViewIter};
