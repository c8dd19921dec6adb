//! Conversation pipeline: a fixed ordered sequence of nodes transforming a
//! `ConversationState` from raw input to a generated reply.
//!
//! Node order: input processor -> memory retriever -> affinity reader ->
//! role composer -> generator -> affinity writer. Each node mutates only
//! the shared state object and appends failures to `state.errors` instead
//! of throwing past the pipeline boundary: `process` always returns a
//! state object, with `errors` as the place to check for partial failure.

pub mod affinity_reader;
pub mod affinity_writer;
pub mod generator;
pub mod input_processor;
pub mod memory_retriever;
pub mod role_composer;

use std::sync::Arc;

use eidolon_types::chat::ConversationState;

use crate::affinity::model::AffinityModel;
use crate::affinity::sentiment::BoxSentimentClassifier;
use crate::llm::fallback::MultiBackendClient;
use crate::memory::box_embedder::BoxEmbedder;
use crate::memory::box_vector::BoxVectorIndex;

/// Whether the pipeline continues past a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    Continue,
    Halt,
}

impl NodeOutcome {
    pub fn is_halt(self) -> bool {
        self == NodeOutcome::Halt
    }
}

/// The fixed node sequence with its injected dependencies.
pub struct ConversationPipeline {
    embedder: Arc<BoxEmbedder>,
    index: Arc<BoxVectorIndex>,
    affinity: Arc<AffinityModel>,
    client: Arc<MultiBackendClient>,
    sentiment: Arc<BoxSentimentClassifier>,
    top_k: usize,
}

impl ConversationPipeline {
    pub fn new(
        embedder: Arc<BoxEmbedder>,
        index: Arc<BoxVectorIndex>,
        affinity: Arc<AffinityModel>,
        client: Arc<MultiBackendClient>,
        sentiment: Arc<BoxSentimentClassifier>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            affinity,
            client,
            sentiment,
            top_k,
        }
    }

    /// The affinity model shared with the session layer.
    pub fn affinity(&self) -> &Arc<AffinityModel> {
        &self.affinity
    }

    /// Run one turn through the node sequence.
    ///
    /// Always returns the state object; a halting failure (empty input)
    /// short-circuits the remaining nodes.
    pub async fn process(&self, mut state: ConversationState) -> ConversationState {
        if input_processor::run(&mut state).is_halt() {
            return state;
        }

        memory_retriever::run(&mut state, &self.embedder, &self.index, self.top_k).await;
        affinity_reader::run(&mut state, &self.affinity).await;
        role_composer::run(&mut state);
        generator::run(&mut state, &self.client).await;
        affinity_writer::run(&mut state, &self.affinity, &self.sentiment).await;

        state
    }
}
