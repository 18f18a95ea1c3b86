//! Distance metric implementations for HNSW search.
//!
//! Supports three distance functions: cosine, squared euclidean (L2²), and
//! negative inner product. All of them return a value where **lower is
//! better**, so the graph code orders candidates the same way for every
//! metric.

use crate::config::Space;
use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};

/// Distance metric used for vector similarity computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Cosine distance: `1 - cosine_similarity`. Range: \[0, 2\].
    Cosine,
    /// Squared Euclidean distance (L2²). Range: \[0, ∞).
    Euclidean,
    /// Negative dot product: `-dot(a, b)`. Lower = higher similarity.
    InnerProduct,
}

impl From<Space> for DistanceMetric {
    fn from(space: Space) -> Self {
        match space {
            Space::Cosine => DistanceMetric::Cosine,
            Space::L2 => DistanceMetric::Euclidean,
            Space::InnerProduct => DistanceMetric::InnerProduct,
        }
    }
}

impl DistanceMetric {
    /// Checked distance between two embeddings.
    ///
    /// Fails with `DimensionMismatch` on unequal lengths and with
    /// `DegenerateVector` when either operand is unusable under this metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(IndexError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        self.validate(a)?;
        self.validate(b)?;
        Ok(self.distance_unchecked(a, b))
    }

    /// Distance for operands already known to be valid and of equal length.
    #[inline]
    pub fn distance_unchecked(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::Cosine => (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0),
            DistanceMetric::Euclidean => euclidean_sq(a, b),
            DistanceMetric::InnerProduct => -dot_product(a, b),
        }
    }

    /// Rejects vectors this metric cannot score: non-finite components for
    /// every metric, zero norm for cosine.
    pub fn validate(&self, v: &[f32]) -> Result<()> {
        if v.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::DegenerateVector("non-finite component"));
        }
        if *self == DistanceMetric::Cosine && dot_product(v, v) <= f32::MIN_POSITIVE {
            return Err(IndexError::DegenerateVector("zero norm under cosine metric"));
        }
        Ok(())
    }
}

// Four independent accumulators let the compiler vectorize the loops.

#[inline]
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0.0f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let rem_a = chunks_a.remainder();
    let rem_b = chunks_b.remainder();
    for (ca, cb) in chunks_a.zip(chunks_b) {
        for i in 0..4 {
            acc[i] += ca[i] * cb[i];
        }
    }
    let mut sum = acc[0] + acc[1] + acc[2] + acc[3];
    for (x, y) in rem_a.iter().zip(rem_b) {
        sum += x * y;
    }
    sum
}

#[inline]
fn euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0.0f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let rem_a = chunks_a.remainder();
    let rem_b = chunks_b.remainder();
    for (ca, cb) in chunks_a.zip(chunks_b) {
        for i in 0..4 {
            let d = ca[i] - cb[i];
            acc[i] += d * d;
        }
    }
    let mut sum = acc[0] + acc[1] + acc[2] + acc[3];
    for (x, y) in rem_a.iter().zip(rem_b) {
        let d = x - y;
        sum += d * d;
    }
    sum
}

#[inline]
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = dot_product(a, a);
    let norm_b = dot_product(b, b);
    let denom = (norm_a * norm_b).sqrt();
    if denom < 1e-30 {
        return 0.0;
    }
    dot / denom
}
