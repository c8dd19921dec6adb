//! Affinity reader node: loads the pair's current score for prompt
//! construction.
//!
//! Failure is soft -- the composer falls back to neutral tone when no
//! score is available.

use std::sync::Arc;

use eidolon_types::chat::ConversationState;

use crate::affinity::model::AffinityModel;

pub(crate) async fn run(state: &mut ConversationState, affinity: &Arc<AffinityModel>) {
    match affinity
        .get_score(
            &state.persona_id,
            &state.interlocutor_id,
            state.affinity_baseline,
        )
        .await
    {
        Ok(record) => {
            state.affinity_score = Some(record.current_score);
            state.affinity_tier = Some(record.tier());
        }
        Err(err) => {
            tracing::warn!(error = %err, "Affinity read failed, composing with neutral tone");
            state.record_error(format!("affinity read failed: {err}"));
        }
    }
}
