//! Error types for scene edits and document import.
//!
//! Edit errors are invalid-operation notices: the scene is left untouched and
//! the caller decides how to surface the message.

use crate::id::ElementId;
use thiserror::Error;

/// Result type for scene mutations.
pub type Result<T> = std::result::Result<T, EditError>;

/// A rejected scene operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("unknown element: {0}")]
    UnknownElement(ElementId),

    #[error("duplicate element id: {0}")]
    DuplicateId(ElementId),

    #[error("{0} is not a path")]
    NotAPath(ElementId),

    #[error("{0} is not a group")]
    NotAGroup(ElementId),

    /// A path needs at least 2 points for this operation.
    #[error("path {0} has too few points")]
    DegeneratePath(ElementId),

    #[error("a path keeps at least 2 points")]
    PointFloor,

    #[error("point index {index} out of range for {id}")]
    PointOutOfRange { id: ElementId, index: usize },

    #[error("a group needs at least 2 members, got {0}")]
    GroupTooSmall(usize),

    #[error("{0} is locked")]
    Locked(ElementId),

    #[error("order is not a permutation of the scene")]
    InvalidOrder,

    #[error("cannot split {id} at {index}")]
    InvalidSplit { id: ElementId, index: usize },

    /// The operation produced no result (e.g. disjoint intersection).
    #[error("operation has no result: {0}")]
    Empty(&'static str),
}

/// Errors loading a `.clise` document or a persisted snapshot.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed binary snapshot: {0}")]
    Binary(#[from] rmp_serde::decode::Error),

    #[error("unsupported document version {0}")]
    UnsupportedVersion(u32),

    #[error("inconsistent scene: {0}")]
    Scene(#[from] EditError),
}

/// Errors producing a binary snapshot.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding failed: {0}")]
    Binary(#[from] rmp_serde::encode::Error),
}
