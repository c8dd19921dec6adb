//! Persona identity and recorded-answer types for Eidolon.
//!
//! A persona is the digital identity being chatted with. It owns one vector
//! collection of memory chunks and one affinity baseline. The recorded
//! answers that feed the memory corpus are authored by an external
//! questionnaire layer and handed to the engine as [`AnswerRecord`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Relationship of a contributor (or interlocutor) to the persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Family,
    Friend,
    Colleague,
    Stranger,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationType::Family => write!(f, "family"),
            RelationType::Friend => write!(f, "friend"),
            RelationType::Colleague => write!(f, "colleague"),
            RelationType::Stranger => write!(f, "stranger"),
        }
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "family" => Ok(RelationType::Family),
            "friend" => Ok(RelationType::Friend),
            "colleague" => Ok(RelationType::Colleague),
            "stranger" => Ok(RelationType::Stranger),
            other => Err(format!("invalid relation type: '{other}'")),
        }
    }
}

impl Default for RelationType {
    fn default() -> Self {
        RelationType::Stranger
    }
}

/// The digital identity being chatted with.
///
/// Owns one vector collection (keyed by `id`) and one affinity baseline
/// applied when a new interlocutor first makes contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: Uuid,
    pub display_name: String,
    /// Free-text description of how the persona speaks and behaves,
    /// merged into every generation prompt.
    pub role_description: String,
    /// Initial affinity score for unseen interlocutors (0-100).
    pub baseline_affinity: f64,
}

impl Persona {
    /// Default affinity baseline when a persona has not configured one.
    pub const DEFAULT_BASELINE: f64 = 50.0;

    pub fn new(display_name: impl Into<String>, role_description: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            display_name: display_name.into(),
            role_description: role_description.into(),
            baseline_affinity: Self::DEFAULT_BASELINE,
        }
    }
}

/// A persisted questionnaire answer, supplied by the external CRUD layer.
///
/// The engine never authors these; it only turns them into memory chunks.
/// `id` is optional because imported/legacy answers may lack one, in which
/// case the chunker derives a stable content hash instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: Option<Uuid>,
    pub question_id: String,
    pub question_text: String,
    pub answer_text: String,
    /// Questionnaire depth layer the question belongs to.
    pub layer: u8,
    /// Relationship of the person who contributed this answer.
    pub contributor_relation: RelationType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_type_roundtrip() {
        for rel in [
            RelationType::Family,
            RelationType::Friend,
            RelationType::Colleague,
            RelationType::Stranger,
        ] {
            let s = rel.to_string();
            let parsed: RelationType = s.parse().unwrap();
            assert_eq!(rel, parsed);
        }
    }

    #[test]
    fn test_relation_type_serde() {
        let rel = RelationType::Friend;
        let json = serde_json::to_string(&rel).unwrap();
        assert_eq!(json, "\"friend\"");
        let parsed: RelationType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RelationType::Friend);
    }

    #[test]
    fn test_relation_type_default_is_stranger() {
        assert_eq!(RelationType::default(), RelationType::Stranger);
    }

    #[test]
    fn test_persona_new_uses_default_baseline() {
        let persona = Persona::new("Grandma Wen", "Warm, talkative, loves gardening");
        assert_eq!(persona.display_name, "Grandma Wen");
        assert!((persona.baseline_affinity - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_answer_record_serialize() {
        let answer = AnswerRecord {
            id: Some(Uuid::now_v7()),
            question_id: "q-042".to_string(),
            question_text: "What was your first job?".to_string(),
            answer_text: "I taught primary school for eleven years.".to_string(),
            layer: 1,
            contributor_relation: RelationType::Family,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&answer).unwrap();
        assert!(json.contains("\"contributor_relation\":\"family\""));
        assert!(json.contains("\"layer\":1"));
    }
}
