//! Byte encoding of embeddings for callers that persist them.
//!
//! Layouts (all multi-byte values little-endian):
//!
//! ```text
//! FloatEmbedding      [f32; D]
//! QuantizedEmbedding  [i8; D] [f32 scale]
//! ```
//!
//! The dimension is not stored; it is implied by the buffer length.

use crate::embedding::{FloatEmbedding, QuantizedEmbedding};
use crate::error::{EmbeddingError, Result};

const F32_BYTES: usize = std::mem::size_of::<f32>();

impl FloatEmbedding {
    /// Encode as `D` little-endian `f32` values.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_slice()
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    /// Decode from [`FloatEmbedding::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % F32_BYTES != 0 {
            return Err(EmbeddingError::MalformedBytes(format!(
                "float embedding length {} is not a multiple of {F32_BYTES}",
                bytes.len()
            )));
        }

        let values = bytes
            .chunks_exact(F32_BYTES)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Self::new(values))
    }

    /// Size in bytes of the encoding for `dimension` components.
    pub fn encoded_len(dimension: usize) -> usize {
        dimension * F32_BYTES
    }
}

impl QuantizedEmbedding {
    /// Encode as `D` signed bytes followed by the little-endian `f32` scale.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::encoded_len(self.dimension()));
        bytes.extend(self.as_slice().iter().map(|v| v.to_le_bytes()[0]));
        bytes.extend_from_slice(&self.scale().to_le_bytes());
        bytes
    }

    /// Decode from [`QuantizedEmbedding::to_bytes`] output, re-checking the
    /// quantization invariants.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(split) = bytes.len().checked_sub(F32_BYTES) else {
            return Err(EmbeddingError::MalformedBytes(format!(
                "quantized embedding needs at least {F32_BYTES} bytes, got {}",
                bytes.len()
            )));
        };

        let (values, scale) = bytes.split_at(split);
        let scale = f32::from_le_bytes([scale[0], scale[1], scale[2], scale[3]]);
        let values = values.iter().map(|b| i8::from_le_bytes([*b])).collect();

        Self::from_parts(values, scale)
    }

    /// Size in bytes of the encoding for `dimension` components.
    pub fn encoded_len(dimension: usize) -> usize {
        dimension + F32_BYTES
    }
}
