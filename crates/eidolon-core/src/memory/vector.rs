//! Vector index trait.
//!
//! Defines the per-persona collection contract for semantic vector search.
//! Implementations (e.g., the LanceDB store) live in eidolon-infra.

use eidolon_types::error::IndexError;
use eidolon_types::memory::{MemoryChunk, ScoredChunk};
use uuid::Uuid;

/// Trait for per-persona vector collections with similarity search.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in eidolon-infra.
///
/// Contract:
/// - A collection is implicitly created on first write.
/// - `search` on a non-existent collection returns an empty result, not an
///   error -- a persona with no memories yet is a valid state.
/// - Results are ordered by descending similarity; ties keep insertion
///   order (stable sort).
/// - `upsert` with an existing id replaces that entry, which is what makes
///   index rebuilds idempotent.
pub trait VectorIndex: Send + Sync {
    /// Insert or replace chunks with their embedding vectors.
    ///
    /// `chunks` and `vectors` are parallel slices of equal length.
    fn upsert(
        &self,
        persona_id: &Uuid,
        chunks: &[MemoryChunk],
        vectors: &[Vec<f32>],
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Search the persona's collection for the `top_k` most similar chunks.
    fn search(
        &self,
        persona_id: &Uuid,
        query: &[f32],
        top_k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ScoredChunk>, IndexError>> + Send;

    /// Delete chunks by id. Unknown ids are ignored.
    fn delete(
        &self,
        persona_id: &Uuid,
        ids: &[String],
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Count vectors in the persona's collection (0 if it does not exist).
    fn count(
        &self,
        persona_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, IndexError>> + Send;

    /// Ensure the persona's collection exists, creating it empty if needed.
    fn ensure_collection(
        &self,
        persona_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Drop the persona's collection and all its vectors, irrecoverably.
    ///
    /// Dropping a non-existent collection is a no-op.
    fn drop_collection(
        &self,
        persona_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;
}
