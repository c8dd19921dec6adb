//! BoxVectorIndex -- object-safe dynamic dispatch wrapper for VectorIndex.
//!
//! Same blanket-impl pattern as BoxEmbedder: an object-safe mirror trait
//! with boxed futures, a blanket impl, and a delegating wrapper struct.

use std::future::Future;
use std::pin::Pin;

use eidolon_types::error::IndexError;
use eidolon_types::memory::{MemoryChunk, ScoredChunk};
use uuid::Uuid;

use super::vector::VectorIndex;

/// Object-safe version of [`VectorIndex`] with boxed futures.
pub trait VectorIndexDyn: Send + Sync {
    fn upsert_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
        chunks: &'a [MemoryChunk],
        vectors: &'a [Vec<f32>],
    ) -> Pin<Box<dyn Future<Output = Result<(), IndexError>> + Send + 'a>>;

    fn search_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
        query: &'a [f32],
        top_k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredChunk>, IndexError>> + Send + 'a>>;

    fn delete_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
        ids: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<(), IndexError>> + Send + 'a>>;

    fn count_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<u64, IndexError>> + Send + 'a>>;

    fn ensure_collection_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), IndexError>> + Send + 'a>>;

    fn drop_collection_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), IndexError>> + Send + 'a>>;
}

/// Blanket implementation: any `VectorIndex` automatically implements
/// `VectorIndexDyn`.
impl<T: VectorIndex> VectorIndexDyn for T {
    fn upsert_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
        chunks: &'a [MemoryChunk],
        vectors: &'a [Vec<f32>],
    ) -> Pin<Box<dyn Future<Output = Result<(), IndexError>> + Send + 'a>> {
        Box::pin(self.upsert(persona_id, chunks, vectors))
    }

    fn search_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
        query: &'a [f32],
        top_k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredChunk>, IndexError>> + Send + 'a>> {
        Box::pin(self.search(persona_id, query, top_k))
    }

    fn delete_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
        ids: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<(), IndexError>> + Send + 'a>> {
        Box::pin(self.delete(persona_id, ids))
    }

    fn count_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<u64, IndexError>> + Send + 'a>> {
        Box::pin(self.count(persona_id))
    }

    fn ensure_collection_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), IndexError>> + Send + 'a>> {
        Box::pin(self.ensure_collection(persona_id))
    }

    fn drop_collection_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), IndexError>> + Send + 'a>> {
        Box::pin(self.drop_collection(persona_id))
    }
}

/// Type-erased vector index for runtime store selection.
pub struct BoxVectorIndex {
    inner: Box<dyn VectorIndexDyn + Send + Sync>,
}

impl BoxVectorIndex {
    /// Wrap a concrete `VectorIndex` in a type-erased box.
    pub fn new<T: VectorIndex + 'static>(index: T) -> Self {
        Self {
            inner: Box::new(index),
        }
    }

    /// Insert or replace chunks with their embedding vectors.
    pub async fn upsert(
        &self,
        persona_id: &Uuid,
        chunks: &[MemoryChunk],
        vectors: &[Vec<f32>],
    ) -> Result<(), IndexError> {
        self.inner.upsert_boxed(persona_id, chunks, vectors).await
    }

    /// Search the persona's collection for the `top_k` most similar chunks.
    pub async fn search(
        &self,
        persona_id: &Uuid,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        self.inner.search_boxed(persona_id, query, top_k).await
    }

    /// Delete chunks by id. Unknown ids are ignored.
    pub async fn delete(&self, persona_id: &Uuid, ids: &[String]) -> Result<(), IndexError> {
        self.inner.delete_boxed(persona_id, ids).await
    }

    /// Count vectors in the persona's collection.
    pub async fn count(&self, persona_id: &Uuid) -> Result<u64, IndexError> {
        self.inner.count_boxed(persona_id).await
    }

    /// Ensure the persona's collection exists.
    pub async fn ensure_collection(&self, persona_id: &Uuid) -> Result<(), IndexError> {
        self.inner.ensure_collection_boxed(persona_id).await
    }

    /// Drop the persona's collection and all its vectors.
    pub async fn drop_collection(&self, persona_id: &Uuid) -> Result<(), IndexError> {
        self.inner.drop_collection_boxed(persona_id).await
    }
}
