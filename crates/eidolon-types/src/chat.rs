//! Conversation state and session types for Eidolon.
//!
//! [`ConversationState`] is the shared object threaded through the pipeline
//! nodes for one turn. [`ChatSession`] tracks cumulative token consumption
//! against a budget and carries the lifecycle state machine that drives
//! fatigue warnings, forced offline indexing, and resumption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::affinity::AffinityTier;
use crate::memory::ScoredChunk;
use crate::persona::RelationType;

/// Role of a message in a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// One message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TurnMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A failure recorded by a pipeline node.
///
/// Nodes never throw past the pipeline boundary; they append here instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineError {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl PipelineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Shared state mutated node-by-node during one conversation turn.
///
/// Created per turn, discarded after the reply is returned. Persistence of
/// `messages` across turns is the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub persona_id: Uuid,
    pub interlocutor_id: Uuid,
    pub relation_type: RelationType,
    pub messages: Vec<TurnMessage>,
    pub retrieved_memories: Vec<ScoredChunk>,
    pub role_description: String,
    /// Affinity baseline of the persona, used when the pair has no record yet.
    pub affinity_baseline: f64,
    /// Affinity score loaded by the affinity-reader node.
    pub affinity_score: Option<f64>,
    /// Affinity tier banded from the score, used by the role composer.
    pub affinity_tier: Option<AffinityTier>,
    pub current_input: String,
    /// Structured prompt assembled by the role composer.
    pub prompt: Option<String>,
    pub generated_response: Option<String>,
    pub errors: Vec<PipelineError>,
    pub metadata: HashMap<String, Value>,
}

impl ConversationState {
    pub fn new(
        persona_id: Uuid,
        interlocutor_id: Uuid,
        relation_type: RelationType,
        role_description: impl Into<String>,
        current_input: impl Into<String>,
    ) -> Self {
        Self {
            persona_id,
            interlocutor_id,
            relation_type,
            messages: Vec::new(),
            retrieved_memories: Vec::new(),
            role_description: role_description.into(),
            affinity_baseline: 50.0,
            affinity_score: None,
            affinity_tier: None,
            current_input: current_input.into(),
            prompt: None,
            generated_response: None,
            errors: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Append a node failure without unwinding.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(PipelineError::new(message));
    }

    /// Whether any node recorded a failure this turn.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Lifecycle state of a chat session.
///
/// `Active -> FatigueWarned -> OfflineIndexing -> OfflineIdle -> Active`
/// is the normal cycle; `Closed` is terminal (session ended explicitly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Active,
    FatigueWarned,
    OfflineIndexing,
    OfflineIdle,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Active => write!(f, "active"),
            LifecycleState::FatigueWarned => write!(f, "fatigue_warned"),
            LifecycleState::OfflineIndexing => write!(f, "offline_indexing"),
            LifecycleState::OfflineIdle => write!(f, "offline_idle"),
            LifecycleState::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(LifecycleState::Active),
            "fatigue_warned" => Ok(LifecycleState::FatigueWarned),
            "offline_indexing" => Ok(LifecycleState::OfflineIndexing),
            "offline_idle" => Ok(LifecycleState::OfflineIdle),
            "closed" => Ok(LifecycleState::Closed),
            other => Err(format!("invalid lifecycle state: '{other}'")),
        }
    }
}

impl LifecycleState {
    /// Whether the session accepts new chat input in this state.
    ///
    /// Offline states queue input instead of serving it; closed rejects it.
    pub fn accepts_input(&self) -> bool {
        matches!(self, LifecycleState::Active | LifecycleState::FatigueWarned)
    }
}

/// A chat session between one interlocutor and one persona.
///
/// Created when a conversation starts; closed (not deleted) when ended
/// explicitly or when the interlocutor disconnects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: Uuid,
    pub persona_id: Uuid,
    pub interlocutor_id: Uuid,
    /// Cumulative estimated tokens consumed by this session.
    pub tokens_used: u64,
    /// Per-session cap driving the fatigue/offline lifecycle.
    pub token_budget: u64,
    pub lifecycle_state: LifecycleState,
    /// Messages queued while the session is offline.
    pub pending_message_count: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    pub fn new(persona_id: Uuid, interlocutor_id: Uuid, token_budget: u64) -> Self {
        Self {
            session_id: Uuid::now_v7(),
            persona_id,
            interlocutor_id,
            tokens_used: 0,
            token_budget,
            lifecycle_state: LifecycleState::Active,
            pending_message_count: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Fraction of the token budget consumed so far.
    pub fn usage_ratio(&self) -> f64 {
        if self.token_budget == 0 {
            return 1.0;
        }
        self.tokens_used as f64 / self.token_budget as f64
    }
}
