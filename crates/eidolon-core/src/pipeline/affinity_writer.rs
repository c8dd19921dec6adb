//! Affinity writer node: classifies the turn's sentiment and applies the
//! weighted affinity update, storing the result into state metadata.
//!
//! Failure is soft: a missed update never blocks the reply that was
//! already generated.

use std::sync::Arc;

use chrono::Utc;

use eidolon_types::affinity::AffinitySignals;
use eidolon_types::chat::ConversationState;

use crate::affinity::model::AffinityModel;
use crate::affinity::sentiment::BoxSentimentClassifier;
use crate::affinity::signals::{decay_penalty, frequency_bonus, quality_bonus};

pub(crate) async fn run(
    state: &mut ConversationState,
    affinity: &Arc<AffinityModel>,
    sentiment: &Arc<BoxSentimentClassifier>,
) {
    let message_sentiment = sentiment.classify(&state.current_input).await;

    let record = match affinity
        .get_score(
            &state.persona_id,
            &state.interlocutor_id,
            state.affinity_baseline,
        )
        .await
    {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(error = %err, "Affinity write skipped: record unavailable");
            state.record_error(format!("affinity update failed: {err}"));
            return;
        }
    };

    // Mid-conversation turn: the frequency bonus is only granted when a
    // conversation ends (the session layer applies that final update).
    let signals = AffinitySignals {
        message_sentiment,
        frequency: frequency_bonus(record.total_conversations, false),
        quality_signal: quality_bonus(&state.messages),
        decay_signal: decay_penalty(Some(record.last_updated_at), Utc::now()),
    };

    match affinity
        .update(
            &state.persona_id,
            &state.interlocutor_id,
            state.affinity_baseline,
            signals,
        )
        .await
    {
        Ok(update) => {
            state
                .metadata
                .insert("sentiment_signal".to_string(), message_sentiment.into());
            state
                .metadata
                .insert("affinity_new_score".to_string(), update.new_score.into());
            state
                .metadata
                .insert("affinity_delta".to_string(), update.delta.into());
            state
                .metadata
                .insert("affinity_reason".to_string(), update.reason.into());
        }
        Err(err) => {
            tracing::warn!(error = %err, "Affinity update failed");
            state.record_error(format!("affinity update failed: {err}"));
        }
    }
}
