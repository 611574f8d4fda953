//! Model runner adapter.
//!
//! A [`ModelRunner`] maps token ids and an attention mask to one hidden-state
//! row per token. The inference backend (ONNX, candle, a remote service...)
//! lives entirely behind this trait.

use crate::error::{EmbeddingError, Result};
use crate::tokenizer::TokenBatch;

/// Per-token activations produced by a model: `rows` tokens × `dimension` floats,
/// stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationMatrix {
    data: Vec<f32>,
    dimension: usize,
}

impl ActivationMatrix {
    /// Wrap a flat row-major buffer.
    ///
    /// Fails if `data.len()` is not a multiple of `dimension`.
    pub fn new(data: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::Inference(
                "activation dimension must be positive".to_string(),
            ));
        }
        if data.len() % dimension != 0 {
            return Err(EmbeddingError::Inference(format!(
                "{} activations do not divide into rows of {dimension}",
                data.len()
            )));
        }
        Ok(Self { data, dimension })
    }

    /// Build a matrix from one vector per token.
    ///
    /// All rows must share `dimension`; an empty row list yields an empty
    /// matrix of that dimension.
    pub fn from_rows(rows: Vec<Vec<f32>>, dimension: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * dimension);
        for row in rows {
            EmbeddingError::check_dimension(dimension, row.len())?;
            data.extend(row);
        }
        Self::new(data, dimension)
    }

    /// Number of token rows.
    pub fn rows(&self) -> usize {
        self.data.len() / self.dimension
    }

    /// Hidden dimension (columns per row).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The activations of token `index`.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        self.data.get(start..start.checked_add(self.dimension)?)
    }

    /// Iterate over token rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }
}

/// Trait for model runners.
///
/// Calls may block on I/O or heavy computation; callers running inside an
/// async runtime should offload them to a blocking-capable thread.
pub trait ModelRunner: Send + Sync {
    /// Identifier of the underlying model, e.g. `"TaylorAI/bge-micro-v2"`.
    fn model_id(&self) -> &str;

    /// Hidden dimension of every activation row.
    fn dimension(&self) -> usize;

    /// Run the model on one token sequence.
    ///
    /// Must return exactly one row per token id.
    fn run(&self, token_ids: &[u32], attention_mask: &[u32]) -> Result<ActivationMatrix>;

    /// Run the model on several token sequences.
    ///
    /// Backends that can batch natively should override this; the result
    /// must hold one matrix per input, in input order.
    fn run_batch(&self, batches: &[TokenBatch]) -> Result<Vec<ActivationMatrix>> {
        batches
            .iter()
            .map(|batch| self.run(batch.ids(), batch.attention_mask()))
            .collect()
    }
}

impl<M: ModelRunner + ?Sized> ModelRunner for std::sync::Arc<M> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn run(&self, token_ids: &[u32], attention_mask: &[u32]) -> Result<ActivationMatrix> {
        (**self).run(token_ids, attention_mask)
    }

    fn run_batch(&self, batches: &[TokenBatch]) -> Result<Vec<ActivationMatrix>> {
        (**self).run_batch(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_matrix_rows() {
        let m = ActivationMatrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(m.row(2), None);
    }

    #[test]
    fn test_matrix_rejects_ragged_buffer() {
        assert!(ActivationMatrix::new(vec![1.0, 2.0, 3.0], 2).is_err());
        assert!(ActivationMatrix::new(vec![], 0).is_err());
    }

    #[test]
    fn test_from_rows_checks_dimension() {
        let err = ActivationMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]], 2).unwrap_err();
        assert_eq!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_empty_matrix() {
        let m = ActivationMatrix::from_rows(Vec::new(), 4).unwrap();
        assert_eq!(m.rows(), 0);
        assert_eq!(m.iter_rows().count(), 0);
    }
}
