//! Pooling of per-token activations into a single embedding.

use crate::embedding::FloatEmbedding;
use crate::error::{EmbeddingError, Result};
use crate::model::ActivationMatrix;

/// Sum the activation rows of every attended token.
///
/// This is sum pooling, not mean pooling: the result is never divided by the
/// token count. Only cosine similarity consumes it, so its magnitude does not
/// matter. If no token is attended the zero vector is returned.
///
/// Fails with [`EmbeddingError::DimensionMismatch`] if the matrix does not have
/// one row per mask entry or its rows are not `dimension` wide.
pub fn sum_pool(
    activations: &ActivationMatrix,
    attention_mask: &[u32],
    dimension: usize,
) -> Result<FloatEmbedding> {
    EmbeddingError::check_dimension(dimension, activations.dimension())?;
    EmbeddingError::check_dimension(attention_mask.len(), activations.rows())?;

    let mut pooled = vec![0.0f32; dimension];
    for (row, _) in activations
        .iter_rows()
        .zip(attention_mask)
        .filter(|(_, mask)| **mask == 1)
    {
        for (sum, value) in pooled.iter_mut().zip(row) {
            *sum += value;
        }
    }

    Ok(FloatEmbedding::new(pooled))
}
