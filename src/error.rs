//! Error types for template-driven section and descriptor decoding

use thiserror::Error;

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Error types encountered while registering templates or decoding payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A field, loop iteration or section would read past the buffer or the
    /// enclosing limit
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// A length or condition refers to a field that is not in scope
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A resolved length is negative, too wide, or not aligned to its unit
    #[error("Invalid length: {0}")]
    InvalidLength(String),

    /// A field definition or template failed self-validation
    #[error("Malformed template: {0}")]
    MalformedTemplate(String),
}

impl DecodeError {
    /// Create a new OutOfBounds error
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        DecodeError::OutOfBounds(msg.into())
    }

    /// Create a new UnresolvedReference error
    pub fn unresolved_reference(msg: impl Into<String>) -> Self {
        DecodeError::UnresolvedReference(msg.into())
    }

    /// Create a new InvalidLength error
    pub fn invalid_length(msg: impl Into<String>) -> Self {
        DecodeError::InvalidLength(msg.into())
    }

    /// Create a new MalformedTemplate error
    pub fn malformed_template(msg: impl Into<String>) -> Self {
        DecodeError::MalformedTemplate(msg.into())
    }

    /// Whether the error was caused by truncated or short input
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, DecodeError::OutOfBounds(_))
    }
}
