//! Error types for the hierarchy crate.

use slidetree_types::{ObjectKind, TypeError};

/// Errors that can occur during hierarchy and view operations.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    /// The enclosing image container is readonly.
    #[error("hierarchy is in readonly mode")]
    ReadOnly,

    /// Mutation attempted through a masked (derived) view.
    #[error("cannot modify a derived view")]
    ViewRestricted,

    /// The object's kind is not selected by the view.
    #[error("requires {expected} object, got {actual}")]
    KindMismatch {
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// A slice or index list argument is malformed.
    #[error("invalid mask: {0}")]
    InvalidMask(String),

    /// A position is outside the view.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    /// Bulk ingestion was handed something other than a list of records.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Records failed conversion and the caller asked for all-or-nothing.
    #[error("could not convert {skipped} records")]
    BatchSkipped { skipped: usize },

    /// A wrapped object outlived the view that produced it.
    #[error("producing view has been dropped")]
    Detached,

    /// An object could not be constructed.
    #[error("object error: {0}")]
    Object(#[from] TypeError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] slidetree_store::StoreError),
}

/// Convenience alias for hierarchy results.
pub type HierarchyResult<T> = Result<T, HierarchyError>;
