use base64::Engine;
use bytes::Bytes;

use super::TypeError;

/// Opaque binary data.
///
/// Accepts raw bytes, a base64 string or a [`Bytes`] buffer; the wire form
/// is always standard, padded base64.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct Blob(Bytes);

impl Blob {
    /// Decode a standard base64 string.
    pub fn from_base64(encoded: &str) -> Result<Self, TypeError> {
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map(|bytes| Blob(Bytes::from(bytes)))
            .map_err(|e| TypeError::Base64(e.to_string()))
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying buffer, without copying.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(v: Vec<u8>) -> Self {
        Blob(Bytes::from(v))
    }
}

impl From<&[u8]> for Blob {
    fn from(v: &[u8]) -> Self {
        Blob(Bytes::copy_from_slice(v))
    }
}

impl From<Bytes> for Blob {
    fn from(v: Bytes) -> Self {
        Blob(v)
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
