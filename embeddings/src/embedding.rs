//! Embedding representations and similarity scoring.
//!
//! Two storage forms exist for a D-dimensional vector:
//!
//! - [`FloatEmbedding`]: full-precision `f32` components.
//! - [`QuantizedEmbedding`]: `i8` components in `[-127, 127]` plus one scale,
//!   so that `original[i] ≈ values[i] * scale`.
//!
//! Both are immutable and cheap to clone (the components sit behind an `Arc`).
//! Magnitude is irrelevant: only cosine similarity is ever computed on them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Largest magnitude of a quantized component.
pub const QUANTIZED_MAX: i8 = 127;

/// A full-precision embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub struct FloatEmbedding {
    values: Arc<[f32]>,
    norm: f64,
}

impl FloatEmbedding {
    /// Create an embedding from its components.
    pub fn new(values: Vec<f32>) -> Self {
        let norm = values
            .iter()
            .map(|x| f64::from(*x) * f64::from(*x))
            .sum::<f64>()
            .sqrt();
        Self {
            values: values.into(),
            norm,
        }
    }

    /// The all-zero embedding of the given dimension.
    pub fn zeros(dimension: usize) -> Self {
        Self::new(vec![0.0; dimension])
    }

    /// Components of the embedding.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean norm. Saturates to infinity for vectors whose norm does not
    /// fit in an `f32`; similarity scoring uses the full-range value.
    pub fn norm(&self) -> f32 {
        self.norm as f32
    }

    /// Whether every component is zero.
    pub fn is_zero(&self) -> bool {
        self.norm == 0.0
    }

    /// Convert to the 8-bit form. See [`quantize`].
    pub fn quantize(&self) -> QuantizedEmbedding {
        quantize(self)
    }
}

impl From<Vec<f32>> for FloatEmbedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl From<FloatEmbedding> for Vec<f32> {
    fn from(embedding: FloatEmbedding) -> Self {
        embedding.values.to_vec()
    }
}

/// An 8-bit quantized embedding.
///
/// Invariants: every component lies in `[-127, 127]`, the scale is finite and
/// non-negative, and a zero scale implies all components are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuantizedParts", into = "QuantizedParts")]
pub struct QuantizedEmbedding {
    values: Arc<[i8]>,
    scale: f32,
    norm_sq: i64,
}

/// Serialized shape of a [`QuantizedEmbedding`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuantizedParts {
    values: Vec<i8>,
    scale: f32,
}

impl QuantizedEmbedding {
    /// Assemble a quantized embedding from raw components and a scale.
    pub fn from_parts(values: Vec<i8>, scale: f32) -> Result<Self> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(EmbeddingError::MalformedBytes(format!(
                "scale must be finite and non-negative, got {scale}"
            )));
        }
        if values.contains(&i8::MIN) {
            return Err(EmbeddingError::MalformedBytes(
                "quantized component -128 is outside [-127, 127]".to_string(),
            ));
        }
        if scale == 0.0 && values.iter().any(|v| *v != 0) {
            return Err(EmbeddingError::MalformedBytes(
                "zero scale with non-zero components".to_string(),
            ));
        }
        Ok(Self::assemble(values, scale))
    }

    /// The degenerate all-zero embedding of the given dimension.
    pub fn zeros(dimension: usize) -> Self {
        Self::assemble(vec![0; dimension], 0.0)
    }

    fn assemble(values: Vec<i8>, scale: f32) -> Self {
        let norm_sq = values.iter().map(|v| i64::from(*v) * i64::from(*v)).sum();
        Self {
            values: values.into(),
            scale,
            norm_sq,
        }
    }

    /// Raw 8-bit components.
    pub fn as_slice(&self) -> &[i8] {
        &self.values
    }

    /// Multiplier that maps a component back to its float value.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean norm of the dequantized vector, computed from the integer
    /// components.
    pub fn norm(&self) -> f32 {
        ((self.norm_sq as f64).sqrt() * f64::from(self.scale)) as f32
    }

    /// Whether the embedding is the degenerate zero vector.
    pub fn is_zero(&self) -> bool {
        self.scale == 0.0 || self.norm_sq == 0
    }

    /// Convert back to full precision. See [`dequantize`].
    pub fn dequantize(&self) -> FloatEmbedding {
        dequantize(self)
    }
}

impl TryFrom<QuantizedParts> for QuantizedEmbedding {
    type Error = EmbeddingError;

    fn try_from(parts: QuantizedParts) -> Result<Self> {
        Self::from_parts(parts.values, parts.scale)
    }
}

impl From<QuantizedEmbedding> for QuantizedParts {
    fn from(embedding: QuantizedEmbedding) -> Self {
        Self {
            values: embedding.values.to_vec(),
            scale: embedding.scale,
        }
    }
}

/// Quantize a float embedding to 8 bits.
///
/// The largest-magnitude component maps to ±127. An all-zero input, or one so
/// small that its scale is not representable, yields the degenerate
/// zero-scale embedding.
pub fn quantize(embedding: &FloatEmbedding) -> QuantizedEmbedding {
    let max_abs = embedding
        .as_slice()
        .iter()
        .fold(0.0f32, |max, v| max.max(v.abs()));

    if max_abs == 0.0 {
        return QuantizedEmbedding::zeros(embedding.dimension());
    }

    let scale = max_abs / f32::from(QUANTIZED_MAX);
    if scale == 0.0 {
        // Subnormal inputs underflow the scale.
        return QuantizedEmbedding::zeros(embedding.dimension());
    }

    let limit = f32::from(QUANTIZED_MAX);
    let values = embedding
        .as_slice()
        .iter()
        .map(|v| (v / scale).round().clamp(-limit, limit) as i8)
        .collect();

    QuantizedEmbedding::assemble(values, scale)
}

/// Expand a quantized embedding back to floats. Lossy: each component is
/// within half a quantization step of the original.
pub fn dequantize(embedding: &QuantizedEmbedding) -> FloatEmbedding {
    let scale = embedding.scale;
    FloatEmbedding::new(
        embedding
            .as_slice()
            .iter()
            .map(|q| f32::from(*q) * scale)
            .collect(),
    )
}

/// Borrowed view of either embedding form.
#[derive(Debug, Clone, Copy)]
pub enum EmbeddingRef<'a> {
    Float(&'a FloatEmbedding),
    Quantized(&'a QuantizedEmbedding),
}

/// Common interface of the embedding forms, used by similarity scoring and
/// search.
pub trait Embedding {
    /// Number of components.
    fn dimension(&self) -> usize;

    /// Borrow as an [`EmbeddingRef`].
    fn as_embedding_ref(&self) -> EmbeddingRef<'_>;
}

impl Embedding for FloatEmbedding {
    fn dimension(&self) -> usize {
        self.values.len()
    }

    fn as_embedding_ref(&self) -> EmbeddingRef<'_> {
        EmbeddingRef::Float(self)
    }
}

impl Embedding for QuantizedEmbedding {
    fn dimension(&self) -> usize {
        self.values.len()
    }

    fn as_embedding_ref(&self) -> EmbeddingRef<'_> {
        EmbeddingRef::Quantized(self)
    }
}

impl Embedding for EmbeddingRef<'_> {
    fn dimension(&self) -> usize {
        match self {
            Self::Float(e) => e.dimension(),
            Self::Quantized(e) => e.dimension(),
        }
    }

    fn as_embedding_ref(&self) -> EmbeddingRef<'_> {
        *self
    }
}

/// An owned embedding in either form, for collections whose storage form is
/// chosen at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", content = "embedding", rename_all = "snake_case")]
pub enum AnyEmbedding {
    Float(FloatEmbedding),
    Quantized(QuantizedEmbedding),
}

impl Embedding for AnyEmbedding {
    fn dimension(&self) -> usize {
        match self {
            Self::Float(e) => e.dimension(),
            Self::Quantized(e) => e.dimension(),
        }
    }

    fn as_embedding_ref(&self) -> EmbeddingRef<'_> {
        match self {
            Self::Float(e) => EmbeddingRef::Float(e),
            Self::Quantized(e) => EmbeddingRef::Quantized(e),
        }
    }
}

impl From<FloatEmbedding> for AnyEmbedding {
    fn from(embedding: FloatEmbedding) -> Self {
        Self::Float(embedding)
    }
}

impl From<QuantizedEmbedding> for AnyEmbedding {
    fn from(embedding: QuantizedEmbedding) -> Self {
        Self::Quantized(embedding)
    }
}

/// Cosine similarity between two embeddings of any form.
///
/// Returns a value in `[-1.0, 1.0]`. If either side is the zero vector the
/// result is exactly `0.0`. Quantized pairs are scored with an integer dot
/// product; mixed pairs dequantize the 8-bit side.
///
/// Fails with [`EmbeddingError::DimensionMismatch`] if the dimensions differ.
pub fn similarity<A, B>(a: &A, b: &B) -> Result<f32>
where
    A: Embedding + ?Sized,
    B: Embedding + ?Sized,
{
    EmbeddingError::check_dimension(a.dimension(), b.dimension())?;

    let score = match (a.as_embedding_ref(), b.as_embedding_ref()) {
        (EmbeddingRef::Float(a), EmbeddingRef::Float(b)) => float_similarity(a, b),
        (EmbeddingRef::Quantized(a), EmbeddingRef::Quantized(b)) => quantized_similarity(a, b),
        (EmbeddingRef::Float(f), EmbeddingRef::Quantized(q))
        | (EmbeddingRef::Quantized(q), EmbeddingRef::Float(f)) => mixed_similarity(f, q),
    };

    Ok(score)
}

fn cosine(dot: f64, norm_a: f64, norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    ((dot / (norm_a * norm_b)) as f32).clamp(-1.0, 1.0)
}

fn float_similarity(a: &FloatEmbedding, b: &FloatEmbedding) -> f32 {
    let dot: f64 = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    cosine(dot, a.norm, b.norm)
}

fn quantized_similarity(a: &QuantizedEmbedding, b: &QuantizedEmbedding) -> f32 {
    if a.is_zero() || b.is_zero() {
        return 0.0;
    }

    let dot: i64 = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| i64::from(*x) * i64::from(*y))
        .sum();

    let scales = f64::from(a.scale) * f64::from(b.scale);
    let norm_a = (a.norm_sq as f64).sqrt() * f64::from(a.scale);
    let norm_b = (b.norm_sq as f64).sqrt() * f64::from(b.scale);

    cosine(dot as f64 * scales, norm_a, norm_b)
}

fn mixed_similarity(f: &FloatEmbedding, q: &QuantizedEmbedding) -> f32 {
    let scale = f64::from(q.scale);
    let (dot, norm_sq) = f
        .as_slice()
        .iter()
        .zip(q.as_slice())
        .fold((0.0f64, 0.0f64), |(dot, norm_sq), (x, v)| {
            let y = f64::from(*v) * scale;
            (dot + f64::from(*x) * y, norm_sq + y * y)
        });
    cosine(dot, f.norm, norm_sq.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = FloatEmbedding::new(vec![1.0, 0.0, 0.0]);
        let sim = similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = FloatEmbedding::new(vec![1.0, 0.0, 0.0]);
        let b = FloatEmbedding::new(vec![0.0, 1.0, 0.0]);
        let sim = similarity(&a, &b).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = FloatEmbedding::new(vec![1.0, 2.0, -3.0]);
        let b = FloatEmbedding::new(vec![-2.0, -4.0, 6.0]);
        let sim = similarity(&a, &b).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_magnitude_is_irrelevant() {
        let a = FloatEmbedding::new(vec![0.3, -0.1, 0.7]);
        let b = FloatEmbedding::new(vec![3.0, -1.0, 7.0]);
        assert!((similarity(&a, &b).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = FloatEmbedding::new(vec![1.0, 0.0]);
        let b = FloatEmbedding::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(
            similarity(&a, &b).unwrap_err(),
            EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
        assert!(similarity(&a.quantize(), &b).is_err());
    }

    #[test]
    fn test_quantize_maps_max_to_127() {
        let q = quantize(&FloatEmbedding::new(vec![0.5, -2.54, 1.2, 0.0]));
        assert_eq!(q.as_slice(), &[25, -127, 60, 0]);
        assert!((q.scale() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_zero_vector() {
        let q = quantize(&FloatEmbedding::zeros(4));
        assert_eq!(q.scale(), 0.0);
        assert_eq!(q.as_slice(), &[0, 0, 0, 0]);
        assert!(q.is_zero());
    }

    #[test]
    fn test_quantize_subnormal_input_is_zero() {
        let q = quantize(&FloatEmbedding::new(vec![1e-44, -5e-45, 0.0]));
        assert_eq!(q.scale(), 0.0);
        assert_eq!(q.as_slice(), &[0, 0, 0]);
        assert_eq!(QuantizedEmbedding::from_bytes(&q.to_bytes()).unwrap(), q);
    }

    #[test]
    fn test_extreme_magnitudes_score_finite() {
        let huge = FloatEmbedding::new(vec![3e19, 1.0, -2.0]);
        let tiny = FloatEmbedding::new(vec![1e-44, -5e-45, 0.0]);

        for v in [&huge, &tiny] {
            assert!(!v.is_zero());
            assert!((similarity(v, v).unwrap() - 1.0).abs() < 1e-6);
        }
        let mixed = similarity(&huge, &huge.quantize()).unwrap();
        assert!((mixed - 1.0).abs() < 1e-6);
        assert!(similarity(&huge, &tiny).unwrap().is_finite());
    }

    #[test]
    fn test_dequantize() {
        let q = QuantizedEmbedding::from_parts(vec![127, -64, 0], 0.5).unwrap();
        assert_eq!(q.dequantize().as_slice(), &[63.5, -32.0, 0.0]);
    }

    #[test]
    fn test_zero_similarity_is_zero_for_all_pairings() {
        let zero = FloatEmbedding::zeros(3);
        let qzero = zero.quantize();
        let v = FloatEmbedding::new(vec![0.2, -0.4, 0.9]);
        let qv = v.quantize();

        for score in [
            similarity(&zero, &zero).unwrap(),
            similarity(&zero, &v).unwrap(),
            similarity(&v, &zero).unwrap(),
            similarity(&qzero, &qzero).unwrap(),
            similarity(&qzero, &qv).unwrap(),
            similarity(&qv, &qzero).unwrap(),
            similarity(&zero, &qv).unwrap(),
            similarity(&qzero, &v).unwrap(),
        ] {
            assert_eq!(score, 0.0);
        }
    }

    #[test]
    fn test_mixed_matches_dequantized_float() {
        let a = FloatEmbedding::new(vec![0.9, -0.3, 0.1, 0.4]);
        let q = FloatEmbedding::new(vec![0.2, 0.8, -0.5, 0.3]).quantize();

        let mixed = similarity(&a, &q).unwrap();
        let float = similarity(&a, &q.dequantize()).unwrap();
        assert!((mixed - float).abs() < 1e-6);
        assert_eq!(mixed, similarity(&q, &a).unwrap());
    }

    #[test]
    fn test_from_parts_validation() {
        assert!(QuantizedEmbedding::from_parts(vec![1, 2], -1.0).is_err());
        assert!(QuantizedEmbedding::from_parts(vec![1, 2], f32::NAN).is_err());
        assert!(QuantizedEmbedding::from_parts(vec![-128, 2], 1.0).is_err());
        assert!(QuantizedEmbedding::from_parts(vec![1, 0], 0.0).is_err());
        assert!(QuantizedEmbedding::from_parts(vec![0, 0], 0.0).is_ok());
    }

    #[test]
    fn test_serde_validates_quantized() {
        let json = r#"{"values":[1,2,3],"scale":-0.5}"#;
        assert!(serde_json::from_str::<QuantizedEmbedding>(json).is_err());

        let q = FloatEmbedding::new(vec![0.1, 0.2, -0.3]).quantize();
        let json = serde_json::to_string(&q).unwrap();
        let back: QuantizedEmbedding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn test_any_embedding_dispatch() {
        let f = FloatEmbedding::new(vec![1.0, 1.0]);
        let any: AnyEmbedding = f.quantize().into();
        assert_eq!(any.dimension(), 2);
        assert!((similarity(&any, &f).unwrap() - 1.0).abs() < 1e-6);
    }
}
