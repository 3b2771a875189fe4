//! Object kinds and the kind table.
//!
//! [`ObjectKind`] is a closed set. The table in this module is the only place
//! that maps kinds to interchange type tags and to the storage family a store
//! filters on; views and the document codec both go through it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Type tag of a TMA core in interchange documents. Recognised, not importable.
pub const TMA_CORE_TYPE_TAG: &str = "TMACoreObject";

/// Type tag of the hierarchy root in interchange documents. Recognised, not importable.
pub const ROOT_TYPE_TAG: &str = "PathRootObject";

/// The kind of a spatial object.
///
/// Tiles and cells are stored and queried as detections but are constructed
/// through their own paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Annotation,
    Detection,
    Tile,
    Cell,
}

impl ObjectKind {
    /// All kinds, in table order.
    pub const ALL: [ObjectKind; 4] = [Self::Annotation, Self::Detection, Self::Tile, Self::Cell];

    /// The interchange type tag (`id` field of a feature record).
    pub const fn type_tag(self) -> &'static str {
        match self {
            Self::Annotation => "PathAnnotationObject",
            Self::Detection => "PathDetectionObject",
            Self::Tile => "PathTileObject",
            Self::Cell => "PathCellObject",
        }
    }

    /// The storage family this kind is filtered under.
    pub const fn family(self) -> ObjectKind {
        match self {
            Self::Annotation => Self::Annotation,
            Self::Detection | Self::Tile | Self::Cell => Self::Detection,
        }
    }

    /// Whether an object of this kind is selected by a `filter` kind.
    pub fn matches(self, filter: ObjectKind) -> bool {
        self == filter || self.family() == filter
    }

    /// Look up a kind by its interchange type tag.
    pub fn from_type_tag(tag: &str) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_tag() == tag)
            .ok_or_else(|| TypeError::UnknownTypeTag(tag.to_string()))
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Annotation => write!(f, "Annotation"),
            Self::Detection => write!(f, "Detection"),
            Self::Tile => write!(f, "Tile"),
            Self::Cell => write!(f, "Cell"),
        }
    }
}
