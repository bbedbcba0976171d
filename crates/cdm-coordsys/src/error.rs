//! Error types for coordinate system building.

use cdm_common::CdmError;
use thiserror::Error;

/// Fatal errors that abort a dataset build.
///
/// Advisory problems (unresolved references, untyped axes, rejected
/// aliases) never surface here; they are recorded in
/// [`Diagnostics`](crate::diagnostics::Diagnostics).
#[derive(Error, Debug)]
pub enum CoordSysError {
    /// Reading a coordinate axis' values failed.
    #[error("failed to read values of '{variable}': {source}")]
    Read {
        variable: String,
        #[source]
        source: CdmError,
    },

    /// A convention failed while augmenting the dataset.
    #[error("convention '{convention}' failed to augment dataset: {message}")]
    Augment { convention: String, message: String },

    /// The build was cancelled by the caller.
    #[error("coordinate system build cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoordSysError {
    /// Create a Read error.
    pub fn read(variable: impl Into<String>, source: CdmError) -> Self {
        Self::Read {
            variable: variable.into(),
            source,
        }
    }

    /// Create an Augment error.
    pub fn augment(convention: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Augment {
            convention: convention.into(),
            message: message.into(),
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type for coordinate system operations.
pub type CoordSysResult<T> = std::result::Result<T, CoordSysError>;
