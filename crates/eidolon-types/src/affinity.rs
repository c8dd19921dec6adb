//! Affinity types for Eidolon.
//!
//! Affinity is a bounded [0, 100] relationship-quality score tracked per
//! (persona, interlocutor) pair. It starts at the persona's baseline, moves
//! through a fixed weighted combination of per-turn signals, and bands into
//! a tier that shapes the generation prompt's tone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Lower bound of the affinity score range.
pub const AFFINITY_MIN: f64 = 0.0;
/// Upper bound of the affinity score range.
pub const AFFINITY_MAX: f64 = 100.0;

/// The affinity record for one (persona, interlocutor) pair.
///
/// Created at the persona's baseline on first contact; mutated only through
/// the weighted-update algorithm; never deleted while the relationship
/// exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityRecord {
    pub persona_id: Uuid,
    pub interlocutor_id: Uuid,
    /// Current score, always within [0, 100].
    pub current_score: f64,
    pub total_conversations: u32,
    pub total_messages: u32,
    pub last_updated_at: DateTime<Utc>,
}

impl AffinityRecord {
    /// Create a fresh record at the given baseline score (clamped).
    pub fn new(persona_id: Uuid, interlocutor_id: Uuid, baseline: f64) -> Self {
        Self {
            persona_id,
            interlocutor_id,
            current_score: baseline.clamp(AFFINITY_MIN, AFFINITY_MAX),
            total_conversations: 0,
            total_messages: 0,
            last_updated_at: Utc::now(),
        }
    }

    /// The tier this record's score currently falls in.
    pub fn tier(&self) -> AffinityTier {
        AffinityTier::from_score(self.current_score)
    }
}

/// Per-turn signals feeding the weighted affinity update.
///
/// Ranges (enforced at the model boundary):
/// - `message_sentiment`: -10.0 to 10.0 (negative = hostile, 0 = neutral)
/// - `frequency`: 0.0 to 1.0 (conversation-frequency bonus)
/// - `quality_signal`: 0.0 to 2.0 (exchange-depth bonus)
/// - `decay_signal`: -10.0 to 0.0 (staleness penalty)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AffinitySignals {
    pub message_sentiment: f64,
    pub frequency: f64,
    pub quality_signal: f64,
    pub decay_signal: f64,
}

/// Result of one affinity update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityUpdate {
    /// Score after the update, clamped to [0, 100].
    pub new_score: f64,
    /// Actual applied change (may be smaller than the raw weighted delta
    /// when the clamp engaged).
    pub delta: f64,
    /// Human-readable explanation of what moved the score.
    pub reason: String,
}

/// Score band used when composing the generation prompt.
///
/// Bands follow the original relationship-stats split: below 30 is distant,
/// 30 to below 70 is familiar, 70 and above is close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffinityTier {
    Low,
    Medium,
    High,
}

impl AffinityTier {
    /// Band a score into its tier.
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            AffinityTier::Low
        } else if score < 70.0 {
            AffinityTier::Medium
        } else {
            AffinityTier::High
        }
    }
}

impl fmt::Display for AffinityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffinityTier::Low => write!(f, "low"),
            AffinityTier::Medium => write!(f, "medium"),
            AffinityTier::High => write!(f, "high"),
        }
    }
}

/// Aggregate affinity statistics for one persona across all interlocutors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffinityStats {
    pub total_interlocutors: u64,
    pub average_score: f64,
    pub high_count: u64,
    pub medium_count: u64,
    pub low_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_clamps_baseline() {
        let record = AffinityRecord::new(Uuid::now_v7(), Uuid::now_v7(), 150.0);
        assert!((record.current_score - 100.0).abs() < f64::EPSILON);

        let record = AffinityRecord::new(Uuid::now_v7(), Uuid::now_v7(), -5.0);
        assert!(record.current_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_tier_banding() {
        assert_eq!(AffinityTier::from_score(0.0), AffinityTier::Low);
        assert_eq!(AffinityTier::from_score(29.9), AffinityTier::Low);
        assert_eq!(AffinityTier::from_score(30.0), AffinityTier::Medium);
        assert_eq!(AffinityTier::from_score(69.9), AffinityTier::Medium);
        assert_eq!(AffinityTier::from_score(70.0), AffinityTier::High);
        assert_eq!(AffinityTier::from_score(100.0), AffinityTier::High);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(AffinityTier::Low.to_string(), "low");
        assert_eq!(AffinityTier::Medium.to_string(), "medium");
        assert_eq!(AffinityTier::High.to_string(), "high");
    }

    #[test]
    fn test_record_tier_uses_current_score() {
        let mut record = AffinityRecord::new(Uuid::now_v7(), Uuid::now_v7(), 50.0);
        assert_eq!(record.tier(), AffinityTier::Medium);
        record.current_score = 85.0;
        assert_eq!(record.tier(), AffinityTier::High);
    }

    #[test]
    fn test_signals_default_is_neutral() {
        let signals = AffinitySignals::default();
        assert!(signals.message_sentiment.abs() < f64::EPSILON);
        assert!(signals.frequency.abs() < f64::EPSILON);
        assert!(signals.quality_signal.abs() < f64::EPSILON);
        assert!(signals.decay_signal.abs() < f64::EPSILON);
    }

    #[test]
    fn test_affinity_update_serialize() {
        let update = AffinityUpdate {
            new_score: 52.4,
            delta: 2.4,
            reason: "affinity up (2.4): positive sentiment".to_string(),
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"new_score\":52.4"));
    }
}
