//! Error types for the SerDes layer.
//!
//! Every traversal error carries the path of the node being visited when it
//! happened. Any error aborts the whole traversal; there are no partial
//! results.

use docwire_core::{Path, ValueKind};

use crate::codec::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document nests deeper than the configured maximum depth.
    #[error("malformed document at '{path}': {message}")]
    MalformedDocument { path: Path, message: String },

    /// The key transformer mapped two keys of one map to the same key.
    #[error("key collision at '{path}': '{first}' and '{second}' both map to '{key}'")]
    KeyCollision {
        path: Path,
        key: String,
        first: String,
        second: String,
    },

    /// The key transformer does not map a key back to itself.
    #[error("key '{key}' at '{path}' goes to the wire as '{wire}' but reads back as '{back}'")]
    IrreversibleKey {
        path: Path,
        key: String,
        wire: String,
        back: String,
    },

    /// A value with no codec, no built-in encoding and no JSON form.
    #[error("unsupported {kind} value at '{path}': {message}")]
    UnsupportedValue {
        path: Path,
        kind: ValueKind,
        message: String,
    },

    /// A codec returned an output the engine cannot act on.
    #[error("codec '{codec}' broke its contract at '{path}': {message}")]
    CodecContractViolation {
        path: Path,
        codec: String,
        message: String,
    },

    /// A tagged wire value or number that cannot be decoded.
    #[error("invalid wire value at '{path}': {message}")]
    InvalidWireValue { path: Path, message: String },

    /// A codec failed on its own terms.
    #[error("codec '{codec}' failed at '{path}': {source}")]
    Codec {
        path: Path,
        codec: String,
        #[source]
        source: CodecError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The path of the node the error was raised at, if it has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::MalformedDocument { path, .. }
            | Error::KeyCollision { path, .. }
            | Error::IrreversibleKey { path, .. }
            | Error::UnsupportedValue { path, .. }
            | Error::CodecContractViolation { path, .. }
            | Error::InvalidWireValue { path, .. }
            | Error::Codec { path, .. } => Some(path),
            Error::Json(_) => None,
        }
    }
}
