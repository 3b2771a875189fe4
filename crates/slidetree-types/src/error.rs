use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("path objects require a non-empty roi geometry")]
    EmptyGeometry,

    #[error("unknown object type tag: {0}")]
    UnknownTypeTag(String),

    #[error("invalid interchange version: {0}")]
    InvalidVersion(String),
}
