//! Registry and correlation error types.
//!
//! Grammar errors live in `libreg-parser`; these are raised once an entry
//! has been finalized. Every variant is recoverable: the session turns it into
//! a diagnostic and keeps scanning.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// An annotation was finalized while an earlier one was still unbound.
    #[error("no function found for the previous annotation at line {line}")]
    UnboundAnnotation { line: u32 },

    /// The function following an annotation was not on the annotation's line.
    #[error(
        "function '{function}' at line {function_line} is not on the same line as the annotation at line {annotation_line}"
    )]
    LineMismatch {
        function: String,
        function_line: u32,
        annotation_line: u32,
    },

    /// The semantic lookup for a field accessor failed.
    #[error("failed to find field '{field}' on type '{object_type}' for function '{function}'")]
    FieldNotFound {
        function: String,
        object_type: String,
        field: String,
    },

    /// A function bound inside a module has no owning-type prefix.
    #[error("record entry '{name}' is missing an owning-type prefix (no underscore in its name)")]
    MissingOwningType { name: String },

    /// A module declaration used an unknown kind.
    #[error("module '{name}' specified invalid kind '{kind}' (expected userdata or cdata)")]
    InvalidModuleKind { name: String, kind: String },
}

impl RecordError {
    /// The string argument attached to the diagnostic, if any.
    #[must_use]
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::UnboundAnnotation { .. } => None,
            Self::LineMismatch { function, .. } | Self::FieldNotFound { function, .. } => {
                Some(function)
            }
            Self::MissingOwningType { name } | Self::InvalidModuleKind { name, .. } => Some(name),
        }
    }
}
