//! Generator node: produces the reply through the multi-backend client.
//!
//! On total failure the node sets a fallback apology response and records
//! the error -- the pipeline never propagates a raw backend error to the
//! caller.

use std::sync::Arc;

use eidolon_types::chat::ConversationState;
use eidolon_types::llm::GenerationOptions;

use crate::llm::fallback::MultiBackendClient;

/// Reply served when every backend failed.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having trouble finding my words right now. Could you say that again in a little while?";

pub(crate) async fn run(state: &mut ConversationState, client: &Arc<MultiBackendClient>) {
    let prompt = state
        .prompt
        .clone()
        .unwrap_or_else(|| state.current_input.clone());

    match client.generate(&prompt, GenerationOptions::default()).await {
        Ok(outcome) => {
            state
                .metadata
                .insert("backend_used".to_string(), outcome.backend_name.into());
            if !outcome.failures.is_empty() {
                state.metadata.insert(
                    "backend_failovers".to_string(),
                    outcome.failures.len().into(),
                );
            }
            if let Some(tokens) = outcome.response.tokens_used {
                state
                    .metadata
                    .insert("generation_tokens".to_string(), tokens.into());
            }
            state.generated_response = Some(outcome.response.content);
        }
        Err(err) => {
            tracing::error!(error = %err, "Generation failed on every backend");
            state.record_error(format!("generation failed: {err}"));
            state.generated_response = Some(FALLBACK_REPLY.to_string());
        }
    }
}
