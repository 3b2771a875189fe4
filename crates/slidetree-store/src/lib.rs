//! Object storage for slidetree hierarchies.
//!
//! A store holds the spatial objects of one image as a tree under a single
//! synthetic [`RootObject`](slidetree_types::RootObject). It is the sole owner
//! of object data; everything above it (views, wrapped objects) only holds ids
//! and snapshots.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Interchange Documents
//!
//! The [`document`] module converts between store objects and GeoJSON-style
//! feature records ([`Feature`]).
//!
//! # Design Rules
//!
//! 1. The store owns objects; callers receive clones.
//! 2. Every attached object has exactly one parent; the root has none.
//! 3. Listing order is a pre-order walk, children in insertion order.
//! 4. Inserting an id that is already present is a no-op.
//! 5. Single writer: locks make the types `Send + Sync`, nothing more.

pub mod document;
pub mod error;
pub mod memory;
pub mod traits;

pub use document::{Feature, FeatureProperties, Measurement};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
