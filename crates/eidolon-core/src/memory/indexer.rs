//! Index manager: bulk and incremental maintenance of persona memory
//! collections.
//!
//! Rebuilds upsert rather than clear-and-reload: chunk ids are stable per
//! source record, so rebuilding twice with the same corpus converges to the
//! same collection state. Writes to one persona's collection are serialized
//! through a per-persona mutex; different personas index fully in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use eidolon_types::error::IndexError;
use eidolon_types::memory::{IndexStats, IndexStatus, MemoryChunk};

use super::box_embedder::BoxEmbedder;
use super::box_vector::BoxVectorIndex;
use super::chunker::Chunker;

/// Outcome of one rebuild pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Chunks embedded and upserted.
    pub indexed: usize,
    /// Chunks rejected by validation (logged, not fatal).
    pub rejected: usize,
}

/// Maintains persona memory collections: bulk rebuild, single-chunk
/// update/delete, and cross-persona rebuilds with failure isolation.
pub struct IndexManager {
    index: Arc<BoxVectorIndex>,
    embedder: Arc<BoxEmbedder>,
    collection_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl IndexManager {
    pub fn new(index: Arc<BoxVectorIndex>, embedder: Arc<BoxEmbedder>) -> Self {
        Self {
            index,
            embedder,
            collection_locks: DashMap::new(),
        }
    }

    /// The write lock for one persona's collection.
    ///
    /// Shared with any other writer to that collection so that bulk rebuilds
    /// and live incremental updates never interleave inconsistently.
    fn collection_lock(&self, persona_id: &Uuid) -> Arc<Mutex<()>> {
        self.collection_locks
            .entry(*persona_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Rebuild a persona's index from its memory corpus.
    ///
    /// Upserts every valid chunk (idempotent: stable ids mean a repeated
    /// rebuild with the same corpus yields the same collection state).
    /// Invalid chunks are rejected and logged individually; they never abort
    /// the batch. An empty corpus still ensures the collection exists so a
    /// later `search` does not error.
    pub async fn rebuild_index(
        &self,
        persona_id: &Uuid,
        corpus: &[MemoryChunk],
    ) -> Result<RebuildReport, IndexError> {
        let mut valid = Vec::with_capacity(corpus.len());
        let mut rejected = 0usize;

        for chunk in corpus {
            match Chunker::validate(chunk) {
                Ok(()) => valid.push(chunk.clone()),
                Err(err) => {
                    rejected += 1;
                    tracing::warn!(
                        persona_id = %persona_id,
                        chunk_id = %chunk.id,
                        error = %err,
                        "Rejected invalid chunk during rebuild"
                    );
                }
            }
        }

        if valid.is_empty() {
            let lock = self.collection_lock(persona_id);
            let _guard = lock.lock().await;
            self.index.ensure_collection(persona_id).await?;
            return Ok(RebuildReport { indexed: 0, rejected });
        }

        // Embed outside the collection lock -- embedding is the slow part
        // and must not serialize other personas' writes.
        let texts: Vec<String> = valid.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let lock = self.collection_lock(persona_id);
        let _guard = lock.lock().await;
        self.index.upsert(persona_id, &valid, &vectors).await?;

        tracing::info!(
            persona_id = %persona_id,
            indexed = valid.len(),
            rejected,
            "Index rebuild complete"
        );

        Ok(RebuildReport {
            indexed: valid.len(),
            rejected,
        })
    }

    /// Incrementally index one changed chunk, avoiding a full rebuild.
    pub async fn update_chunk(
        &self,
        persona_id: &Uuid,
        chunk: &MemoryChunk,
    ) -> Result<(), IndexError> {
        Chunker::validate(chunk)?;

        let vector = self.embedder.embed(&chunk.text).await?;

        let lock = self.collection_lock(persona_id);
        let _guard = lock.lock().await;
        self.index
            .upsert(
                persona_id,
                std::slice::from_ref(chunk),
                std::slice::from_ref(&vector),
            )
            .await
    }

    /// Remove one chunk from a persona's collection.
    pub async fn delete_chunk(
        &self,
        persona_id: &Uuid,
        chunk_id: &str,
    ) -> Result<(), IndexError> {
        let lock = self.collection_lock(persona_id);
        let _guard = lock.lock().await;
        self.index
            .delete(persona_id, std::slice::from_ref(&chunk_id.to_string()))
            .await
    }

    /// Rebuild every persona's index from the given corpora.
    ///
    /// Rebuilds run concurrently across personas; a failure for one persona
    /// never aborts the others. Returns each persona's individual result.
    pub async fn rebuild_all(
        &self,
        corpora: HashMap<Uuid, Vec<MemoryChunk>>,
    ) -> HashMap<Uuid, Result<RebuildReport, IndexError>> {
        let futures = corpora.into_iter().map(|(persona_id, corpus)| async move {
            let result = self.rebuild_index(&persona_id, &corpus).await;
            if let Err(ref err) = result {
                tracing::error!(
                    persona_id = %persona_id,
                    error = %err,
                    "Rebuild failed for persona"
                );
            }
            (persona_id, result)
        });

        futures_util::future::join_all(futures)
            .await
            .into_iter()
            .collect()
    }

    /// Vector count and status for one persona's collection.
    pub async fn stats(&self, persona_id: &Uuid) -> Result<IndexStats, IndexError> {
        let vector_count = self.index.count(persona_id).await?;
        let status = if vector_count > 0 {
            IndexStatus::Ready
        } else {
            IndexStatus::Empty
        };
        Ok(IndexStats {
            vector_count,
            status,
        })
    }
}
