//! Error types for the display layer

use thiserror::Error;

use crate::element::ElementId;

/// Errors from tree edits and resolver lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// Element is not (or no longer) in the tree
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    /// Operation is not allowed on the tree root
    #[error("Operation not allowed on the root element")]
    RootElement,

    /// Resolver already started
    #[error("Media resolver already started")]
    AlreadyStarted,

    /// Resolver not started
    #[error("Media resolver not started")]
    NotStarted,
}

/// Result type for display operations
pub type DisplayResult<T> = Result<T, DisplayError>;
