//! Memory retriever node: embeds the input and pulls the closest memories.
//!
//! A retrieval failure is non-fatal: the pipeline continues with an empty
//! memory set and a recorded soft error, since the persona can still
//! respond from its role description alone. What must NOT happen here is
//! falling back to a zero vector -- that would silently corrupt ranking,
//! so an embedding failure skips retrieval entirely.

use std::sync::Arc;

use eidolon_types::chat::ConversationState;

use crate::memory::box_embedder::BoxEmbedder;
use crate::memory::box_vector::BoxVectorIndex;

pub(crate) async fn run(
    state: &mut ConversationState,
    embedder: &Arc<BoxEmbedder>,
    index: &Arc<BoxVectorIndex>,
    top_k: usize,
) {
    let query = match embedder.embed(&state.current_input).await {
        Ok(vector) => vector,
        Err(err) => {
            tracing::warn!(error = %err, "Embedding failed, continuing without memories");
            state.record_error(format!("memory retrieval failed: {err}"));
            state.retrieved_memories = Vec::new();
            return;
        }
    };

    match index.search(&state.persona_id, &query, top_k).await {
        Ok(memories) => {
            tracing::debug!(
                persona_id = %state.persona_id,
                retrieved = memories.len(),
                "Memory retrieval complete"
            );
            state.retrieved_memories = memories;
        }
        Err(err) => {
            tracing::warn!(error = %err, "Vector search failed, continuing without memories");
            state.record_error(format!("memory retrieval failed: {err}"));
            state.retrieved_memories = Vec::new();
        }
    }
}
