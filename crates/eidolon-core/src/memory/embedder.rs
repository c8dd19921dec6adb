//! Embedder trait for text-to-vector conversion.
//!
//! Defines the interface for embedding text into vectors for semantic
//! search, plus the cosine-similarity primitive used for ranking.
//! Implementations (e.g., the HTTP embedding client) live in eidolon-infra.

use eidolon_types::error::EmbeddingError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in eidolon-infra.
///
/// Contract: deterministic for a fixed `(text, model_name)` pair, and
/// cached by that key. On backend failure `embed` returns an error --
/// retrieval-path callers must treat that as a failure, never substitute a
/// zero vector, because zero vectors corrupt similarity ranking.
pub trait Embedder: Send + Sync {
    /// Embed a single text into a vector of `dimension()` length.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;

    /// Embed a batch of texts, one vector per input.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;

    /// The model name used for embeddings (e.g., "multilingual-e5-large").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}

/// Cosine similarity mapped into [0, 1].
///
/// Standard cosine lands in [-1, 1]; this maps it via `(cos + 1) / 2` and
/// clamps against floating-point drift. A zero vector on either side yields
/// 0. Vectors of different lengths are a programmer/config error and fail
/// with `DimensionMismatch` -- never silently coerced.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let cos = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok((((cos + 1.0) / 2.0).clamp(0.0, 1.0)) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_similarity_is_maximal() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6, "self-similarity was {sim}");
    }

    #[test]
    fn test_opposite_vectors_score_zero() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!(sim.abs() < 1e-6, "opposite similarity was {sim}");
    }

    #[test]
    fn test_orthogonal_vectors_score_half() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        let err = cosine_similarity(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch { left: 2, right: 3 }
        ));
    }

    #[test]
    fn test_result_is_clamped() {
        // Nearly-parallel vectors can drift past 1.0 in f32; ensure clamping
        let a = vec![1e-3f32; 512];
        let b = vec![1e-3f32; 512];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((0.0..=1.0).contains(&sim));
    }
}
