//! Code generation error types for libreg-codegen.

/// Errors that can occur while rendering registration code.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("Formatting failed: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Invalid C identifier for {what}: '{value}'")]
    InvalidIdentifier { what: &'static str, value: String },
}
