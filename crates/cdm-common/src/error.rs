//! Error types for the common data model.

use thiserror::Error;

/// Result type alias using CdmError.
pub type CdmResult<T> = Result<T, CdmError>;

/// Errors raised by the data model and its I/O collaborators.
#[derive(Debug, Error)]
pub enum CdmError {
    /// I/O failure while reading variable values.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reader could not produce values for a variable.
    #[error("failed to read variable '{variable}': {message}")]
    ReadFailed { variable: String, message: String },

    /// A variable was referenced that does not exist.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// A dimension was referenced that does not exist.
    #[error("dimension not found: {0}")]
    DimensionNotFound(String),

    /// Array length does not match the variable shape.
    #[error("shape mismatch for '{variable}': expected {expected} values, got {actual}")]
    ShapeMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },

    /// No reader is attached and the variable carries no cached values.
    #[error("no values available for variable '{0}'")]
    NoData(String),
}

impl CdmError {
    /// Create a ReadFailed error.
    pub fn read_failed(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            variable: variable.into(),
            message: message.into(),
        }
    }
}
