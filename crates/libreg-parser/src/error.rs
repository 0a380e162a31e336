//! Parser error types for libreg-parser.

/// Errors that stop a file from being scanned at all.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Grammar errors inside one annotation's argument list.
///
/// `offset` is the absolute byte offset in the scanned file where the
/// problem was detected, used to place the diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotationError {
    #[error("expected {expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
        offset: usize,
    },

    #[error("unknown push value or alias '{name}'")]
    UnknownAlias { name: String, offset: usize },

    #[error("too many record options ({count}), at most 4 are supported")]
    TooManyOptions { count: usize, offset: usize },

    #[error("invalid stack offset '{text}'")]
    InvalidOffset { text: String, offset: usize },

    #[error("empty record option")]
    EmptyOption { offset: usize },

    #[error("unbalanced brackets in annotation arguments")]
    Unbalanced { offset: usize },

    #[error("unterminated invocation of '{name}'")]
    UnterminatedInvocation { name: String, offset: usize },
}

impl AnnotationError {
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::Expected { offset, .. }
            | Self::UnknownAlias { offset, .. }
            | Self::TooManyOptions { offset, .. }
            | Self::InvalidOffset { offset, .. }
            | Self::EmptyOption { offset }
            | Self::Unbalanced { offset }
            | Self::UnterminatedInvocation { offset, .. } => *offset,
        }
    }

    /// Name the diagnostic is about, if any.
    #[must_use]
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::UnknownAlias { name, .. } | Self::UnterminatedInvocation { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}
