//! Error types for the core layer.

use crate::path::PathError;
use crate::types::TypeError;

/// Errors from navigating and editing documents.
#[derive(Debug)]
pub enum Error {
    /// Path parsing error.
    Path(PathError),

    /// A path that does not fit the document it is applied to.
    InvalidPath { message: String },

    /// A rich scalar could not be parsed or constructed.
    Type(TypeError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Path(e) => write!(f, "path error: {}", e),
            Error::InvalidPath { message } => write!(f, "invalid path: {}", message),
            Error::Type(e) => write!(f, "type error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Path(e) => Some(e),
            Error::Type(e) => Some(e),
            Error::InvalidPath { .. } => None,
        }
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::Path(e)
    }
}

impl From<TypeError> for Error {
    fn from(e: TypeError) -> Self {
        Error::Type(e)
    }
}
