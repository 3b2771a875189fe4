//! Foundation types for slidetree.
//!
//! This crate provides the identity, classification, and geometry types used
//! throughout the slidetree workspace. Every other slidetree crate depends on
//! `slidetree-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Time-ordered identifier of a store-resident object (UUID v7)
//! - [`ObjectKind`] -- Closed set of object kinds and their storage families
//! - [`PathClass`] -- Classification attached to an object
//! - [`Geometry`] -- GeoJSON-style region of interest with validity and repair
//! - [`PathObject`] -- A spatial object held by a store
//! - [`RootObject`] -- The synthetic root every attached object descends from
//! - [`InterchangeVersion`] -- Version marker of the interchange document format

pub mod class;
pub mod error;
pub mod geometry;
pub mod id;
pub mod kind;
pub mod object;
pub mod version;

pub use class::PathClass;
pub use error::TypeError;
pub use geometry::{Geometry, GeometryIssue, Position};
pub use id::ObjectId;
pub use kind::ObjectKind;
pub use object::{Measurements, PathObject, RootObject};
pub use version::InterchangeVersion;
