//! LanceDB-backed implementation of the `VectorIndex` trait.
//!
//! Each persona gets an isolated table (`persona_memory_{persona_id}`).
//! Upserts delete-then-add by id, which keeps rebuilds idempotent; search
//! uses cosine distance and maps it to the similarity contract
//! (`1 - distance`, clamped to [0, 1], descending order with stable ties).
//! Searching a persona that has no table yet returns an empty result, not
//! an error.

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use uuid::Uuid;

use eidolon_core::memory::vector::VectorIndex;
use eidolon_types::error::IndexError;
use eidolon_types::memory::{MemoryChunk, ScoredChunk};

use super::lance::LanceStore;
use super::schema::memory_chunk_schema;

/// LanceDB-backed per-persona vector index.
pub struct LanceVectorIndex {
    store: LanceStore,
    dimension: i32,
}

impl LanceVectorIndex {
    pub fn new(store: LanceStore, dimension: usize) -> Self {
        Self {
            store,
            dimension: dimension as i32,
        }
    }

    async fn ensure_persona_table(
        &self,
        persona_id: &Uuid,
    ) -> Result<lancedb::Table, IndexError> {
        let table_name = LanceStore::persona_table_name(persona_id);
        let schema = Arc::new(memory_chunk_schema(self.dimension));
        self.store
            .ensure_table(&table_name, schema)
            .await
            .map_err(|e| IndexError::Store(format!("Failed to ensure persona table: {e}")))
    }

    /// Build an Arrow RecordBatch from chunks and their embeddings.
    fn build_record_batch(
        &self,
        chunks: &[MemoryChunk],
        vectors: &[Vec<f32>],
    ) -> Result<RecordBatch, IndexError> {
        let schema = Arc::new(memory_chunk_schema(self.dimension));

        let id_array =
            StringArray::from(chunks.iter().map(|c| c.id.clone()).collect::<Vec<_>>());
        let text_array =
            StringArray::from(chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>());
        let metadata_array = StringArray::from(
            chunks
                .iter()
                .map(|c| serde_json::to_string(&c.metadata).unwrap_or_else(|_| "{}".to_string()))
                .collect::<Vec<_>>(),
        );
        let kind_array = StringArray::from(
            chunks
                .iter()
                .map(|c| c.kind.to_string())
                .collect::<Vec<_>>(),
        );

        let mut values = Vec::with_capacity(chunks.len() * self.dimension as usize);
        for vector in vectors {
            if vector.len() != self.dimension as usize {
                return Err(IndexError::Store(format!(
                    "embedding has {} dimensions, table expects {}",
                    vector.len(),
                    self.dimension
                )));
            }
            values.extend_from_slice(vector);
        }
        let value_array = Float32Array::from(values);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array =
            FixedSizeListArray::new(field, self.dimension, Arc::new(value_array), None);

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(id_array),
                Arc::new(text_array),
                Arc::new(metadata_array),
                Arc::new(kind_array),
                Arc::new(vector_array),
            ],
        )
        .map_err(|e| IndexError::Store(format!("Failed to build record batch: {e}")))
    }

    /// SQL predicate matching any of the given ids.
    fn id_predicate(ids: &[String]) -> String {
        let quoted: Vec<String> = ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "''")))
            .collect();
        format!("id IN ({})", quoted.join(", "))
    }

    /// Parse one search result batch into scored chunks.
    fn batch_to_scored(batch: &RecordBatch) -> Vec<ScoredChunk> {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            return vec![];
        }

        let id_col = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>());
        let text_col = batch
            .column_by_name("text")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>());
        let metadata_col = batch
            .column_by_name("metadata")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>());
        let distance_col = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

        let (Some(id_col), Some(text_col), Some(metadata_col)) =
            (id_col, text_col, metadata_col)
        else {
            return vec![];
        };

        let mut scored = Vec::with_capacity(num_rows);
        for i in 0..num_rows {
            let metadata: HashMap<String, serde_json::Value> =
                serde_json::from_str(metadata_col.value(i)).unwrap_or_default();
            let distance = distance_col.map_or(0.0, |d| d.value(i));
            scored.push(ScoredChunk {
                id: id_col.value(i).to_string(),
                text: text_col.value(i).to_string(),
                metadata,
                similarity: (1.0 - distance).clamp(0.0, 1.0),
            });
        }
        scored
    }
}

impl VectorIndex for LanceVectorIndex {
    async fn upsert(
        &self,
        persona_id: &Uuid,
        chunks: &[MemoryChunk],
        vectors: &[Vec<f32>],
    ) -> Result<(), IndexError> {
        if chunks.is_empty() {
            return Ok(());
        }
        if chunks.len() != vectors.len() {
            return Err(IndexError::Store(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let table = self.ensure_persona_table(persona_id).await?;

        // Replace-by-id: drop any existing rows with these ids, then add.
        let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        table
            .delete(&Self::id_predicate(&ids))
            .await
            .map_err(|e| IndexError::Store(format!("Failed to delete old rows: {e}")))?;

        let batch = self.build_record_batch(chunks, vectors)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| IndexError::Store(format!("Failed to add chunks: {e}")))?;

        Ok(())
    }

    async fn search(
        &self,
        persona_id: &Uuid,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        let table_name = LanceStore::persona_table_name(persona_id);
        if !self.store.table_exists(&table_name).await {
            return Ok(vec![]);
        }

        let table = self.ensure_persona_table(persona_id).await?;
        let results = table
            .vector_search(query)
            .map_err(|e| IndexError::Store(format!("Vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| IndexError::Store(format!("Vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| IndexError::Store(format!("Failed to collect results: {e}")))?;

        let mut scored: Vec<ScoredChunk> = batches
            .iter()
            .flat_map(Self::batch_to_scored)
            .collect();

        // Descending similarity; the sort is stable so equal scores keep
        // their insertion order.
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn delete(&self, persona_id: &Uuid, ids: &[String]) -> Result<(), IndexError> {
        if ids.is_empty() {
            return Ok(());
        }
        let table_name = LanceStore::persona_table_name(persona_id);
        if !self.store.table_exists(&table_name).await {
            return Ok(());
        }

        let table = self.ensure_persona_table(persona_id).await?;
        table
            .delete(&Self::id_predicate(ids))
            .await
            .map_err(|e| IndexError::Store(format!("Failed to delete chunks: {e}")))?;
        Ok(())
    }

    async fn count(&self, persona_id: &Uuid) -> Result<u64, IndexError> {
        let table_name = LanceStore::persona_table_name(persona_id);
        if !self.store.table_exists(&table_name).await {
            return Ok(0);
        }

        let table = self.ensure_persona_table(persona_id).await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| IndexError::Store(format!("Failed to count rows: {e}")))?;
        Ok(count as u64)
    }

    async fn ensure_collection(&self, persona_id: &Uuid) -> Result<(), IndexError> {
        self.ensure_persona_table(persona_id).await?;
        Ok(())
    }

    async fn drop_collection(&self, persona_id: &Uuid) -> Result<(), IndexError> {
        let table_name = LanceStore::persona_table_name(persona_id);
        self.store
            .drop_table(&table_name)
            .await
            .map_err(|e| IndexError::Store(format!("Failed to drop persona table: {e}")))
    }
}
