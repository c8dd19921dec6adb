//! Affinity model: bounded score per (persona, interlocutor) pair.
//!
//! Scores move through a fixed weighted linear combination of the per-turn
//! signals. The weight set is a policy constant, not derived per call, so
//! behavior stays reproducible. Updates for one pair are serialized through
//! a per-pair mutex (read-modify-write must not race across concurrent
//! turns); independent pairs update fully in parallel.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use eidolon_types::affinity::{
    AffinityRecord, AffinitySignals, AffinityStats, AffinityTier, AffinityUpdate, AFFINITY_MAX,
    AFFINITY_MIN,
};
use eidolon_types::error::AffinityError;

use super::store::BoxAffinityStore;

/// Fixed weights of the affinity update policy.
#[derive(Debug, Clone, Copy)]
pub struct AffinityWeights {
    pub sentiment: f64,
    pub frequency: f64,
    pub quality: f64,
    pub decay: f64,
}

/// The policy constant: sentiment dominates, frequency matters, quality and
/// decay trim the edges.
pub const AFFINITY_WEIGHTS: AffinityWeights = AffinityWeights {
    sentiment: 0.6,
    frequency: 0.2,
    quality: 0.1,
    decay: 0.1,
};

/// Documented signal ranges, enforced at the model boundary.
const SENTIMENT_RANGE: (f64, f64) = (-10.0, 10.0);
const FREQUENCY_RANGE: (f64, f64) = (0.0, 1.0);
const QUALITY_RANGE: (f64, f64) = (0.0, 2.0);
const DECAY_RANGE: (f64, f64) = (-10.0, 0.0);

/// Maintains affinity records and applies the weighted-update algorithm.
pub struct AffinityModel {
    store: BoxAffinityStore,
    pair_locks: DashMap<(Uuid, Uuid), Arc<Mutex<()>>>,
}

impl AffinityModel {
    pub fn new(store: BoxAffinityStore) -> Self {
        Self {
            store,
            pair_locks: DashMap::new(),
        }
    }

    fn pair_lock(&self, persona_id: &Uuid, interlocutor_id: &Uuid) -> Arc<Mutex<()>> {
        self.pair_locks
            .entry((*persona_id, *interlocutor_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load the pair's record, creating it at `baseline` on first access.
    pub async fn get_score(
        &self,
        persona_id: &Uuid,
        interlocutor_id: &Uuid,
        baseline: f64,
    ) -> Result<AffinityRecord, AffinityError> {
        let lock = self.pair_lock(persona_id, interlocutor_id);
        let _guard = lock.lock().await;
        self.get_or_create(persona_id, interlocutor_id, baseline).await
    }

    async fn get_or_create(
        &self,
        persona_id: &Uuid,
        interlocutor_id: &Uuid,
        baseline: f64,
    ) -> Result<AffinityRecord, AffinityError> {
        if let Some(record) = self.store.get(persona_id, interlocutor_id).await? {
            return Ok(record);
        }

        let record = AffinityRecord::new(*persona_id, *interlocutor_id, baseline);
        self.store.put(&record).await?;
        tracing::info!(
            persona_id = %persona_id,
            interlocutor_id = %interlocutor_id,
            baseline = record.current_score,
            "Created affinity record at baseline"
        );
        Ok(record)
    }

    /// Apply one weighted update to the pair's score.
    ///
    /// `delta = 0.6*sentiment + 0.2*frequency + 0.1*quality + 0.1*decay`,
    /// then `new_score = clamp(current + delta, 0, 100)`. Signals are
    /// clamped into their documented ranges at this boundary, so even
    /// extreme inputs cannot push the score out of bounds; non-finite
    /// values are rejected outright. A positive frequency signal marks a
    /// finished conversation and bumps the conversation counter.
    pub async fn update(
        &self,
        persona_id: &Uuid,
        interlocutor_id: &Uuid,
        baseline: f64,
        signals: AffinitySignals,
    ) -> Result<AffinityUpdate, AffinityError> {
        let signals = validate_signals(signals)?;

        let lock = self.pair_lock(persona_id, interlocutor_id);
        let _guard = lock.lock().await;

        let mut record = self
            .get_or_create(persona_id, interlocutor_id, baseline)
            .await?;

        let weighted = AFFINITY_WEIGHTS.sentiment * signals.message_sentiment
            + AFFINITY_WEIGHTS.frequency * signals.frequency
            + AFFINITY_WEIGHTS.quality * signals.quality_signal
            + AFFINITY_WEIGHTS.decay * signals.decay_signal;

        let new_score = (record.current_score + weighted).clamp(AFFINITY_MIN, AFFINITY_MAX);
        let delta = new_score - record.current_score;
        let reason = describe_update(delta, &signals);

        record.current_score = new_score;
        record.total_messages += 1;
        if signals.frequency > 0.0 {
            record.total_conversations += 1;
        }
        record.last_updated_at = Utc::now();

        self.store.put(&record).await?;

        tracing::debug!(
            persona_id = %persona_id,
            interlocutor_id = %interlocutor_id,
            new_score,
            delta,
            "Affinity updated"
        );

        Ok(AffinityUpdate {
            new_score,
            delta,
            reason,
        })
    }

    /// Aggregate stats for one persona across all interlocutors.
    pub async fn stats(&self, persona_id: &Uuid) -> Result<AffinityStats, AffinityError> {
        let records = self.store.list_for_persona(persona_id).await?;
        if records.is_empty() {
            return Ok(AffinityStats::default());
        }

        let total = records.len() as u64;
        let sum: f64 = records.iter().map(|r| r.current_score).sum();
        let mut stats = AffinityStats {
            total_interlocutors: total,
            average_score: sum / total as f64,
            ..AffinityStats::default()
        };
        for record in &records {
            match record.tier() {
                AffinityTier::High => stats.high_count += 1,
                AffinityTier::Medium => stats.medium_count += 1,
                AffinityTier::Low => stats.low_count += 1,
            }
        }
        Ok(stats)
    }
}

/// Clamp signals into their documented ranges; reject non-finite values.
fn validate_signals(signals: AffinitySignals) -> Result<AffinitySignals, AffinityError> {
    check_finite("message_sentiment", signals.message_sentiment, SENTIMENT_RANGE)?;
    check_finite("frequency", signals.frequency, FREQUENCY_RANGE)?;
    check_finite("quality_signal", signals.quality_signal, QUALITY_RANGE)?;
    check_finite("decay_signal", signals.decay_signal, DECAY_RANGE)?;

    Ok(AffinitySignals {
        message_sentiment: signals
            .message_sentiment
            .clamp(SENTIMENT_RANGE.0, SENTIMENT_RANGE.1),
        frequency: signals.frequency.clamp(FREQUENCY_RANGE.0, FREQUENCY_RANGE.1),
        quality_signal: signals
            .quality_signal
            .clamp(QUALITY_RANGE.0, QUALITY_RANGE.1),
        decay_signal: signals.decay_signal.clamp(DECAY_RANGE.0, DECAY_RANGE.1),
    })
}

fn check_finite(
    field: &'static str,
    value: f64,
    range: (f64, f64),
) -> Result<(), AffinityError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AffinityError::SignalOutOfRange {
            field,
            value,
            min: range.0,
            max: range.1,
        })
    }
}

/// Human-readable explanation of what moved the score.
fn describe_update(delta: f64, signals: &AffinitySignals) -> String {
    let mut reasons = Vec::new();
    if signals.message_sentiment > 0.1 {
        reasons.push("positive sentiment");
    } else if signals.message_sentiment < -0.1 {
        reasons.push("negative sentiment");
    }
    if signals.frequency > 0.0 {
        reasons.push("conversation frequency");
    }
    if signals.quality_signal > 0.0 {
        reasons.push("conversation quality");
    }
    if signals.decay_signal < 0.0 {
        reasons.push("time decay");
    }
    if reasons.is_empty() {
        reasons.push("no notable change");
    }

    let trend = if delta > 0.0 {
        "up"
    } else if delta < 0.0 {
        "down"
    } else {
        "steady"
    };
    format!("affinity {trend} ({:+.1}): {}", delta, reasons.join(", "))
}
