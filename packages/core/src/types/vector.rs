use base64::Engine;

use super::TypeError;

/// A dense vector of `f32` components (an embedding).
///
/// The binary form packs each component as a big-endian IEEE-754 float.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vector(Vec<f32>);

impl Vector {
    pub fn new(components: Vec<f32>) -> Self {
        Vector(components)
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn to_binary(&self) -> Vec<u8> {
        self.0.iter().flat_map(|f| f.to_be_bytes()).collect()
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() % 4 != 0 {
            return Err(TypeError::VectorLength(bytes.len()));
        }
        Ok(Vector(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ))
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_binary())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, TypeError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| TypeError::Base64(e.to_string()))?;
        Self::from_binary(&bytes)
    }
}

impl From<Vec<f32>> for Vector {
    fn from(v: Vec<f32>) -> Self {
        Vector(v)
    }
}
