//! Typed session events pushed to the external UI layer.
//!
//! The session lifecycle emits these through the broadcast event bus; the
//! calling application forwards them to connected clients (e.g., over a
//! websocket). The serde representation matches the push-event wire
//! contract: `token_threshold`, `indexing_status`, `role_card_online`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Phase of a background indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingPhase {
    Started,
    Completed,
}

impl fmt::Display for IndexingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexingPhase::Started => write!(f, "started"),
            IndexingPhase::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for IndexingPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "started" => Ok(IndexingPhase::Started),
            "completed" => Ok(IndexingPhase::Completed),
            other => Err(format!("invalid indexing phase: '{other}'")),
        }
    }
}

/// An event emitted by the session lifecycle for external observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Token-budget threshold crossed (60 = fatigue warning, 70 = forced
    /// offline). `message` carries the persona-flavored tired message for
    /// the 60% warning; `persona_name` lets the UI label the role card.
    TokenThreshold {
        session_id: Uuid,
        threshold: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        persona_name: String,
    },

    /// Background transcript indexing started or completed.
    IndexingStatus {
        session_id: Uuid,
        status: IndexingPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        pending_message_count: Option<u32>,
    },

    /// The persona is back online and ready to chat.
    RoleCardOnline {
        session_id: Uuid,
        ready_to_chat: bool,
    },
}

impl SessionEvent {
    /// The session this event belongs to.
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::TokenThreshold { session_id, .. }
            | SessionEvent::IndexingStatus { session_id, .. }
            | SessionEvent::RoleCardOnline { session_id, .. } => *session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_phase_roundtrip() {
        for phase in [IndexingPhase::Started, IndexingPhase::Completed] {
            let s = phase.to_string();
            let parsed: IndexingPhase = s.parse().unwrap();
            assert_eq!(phase, parsed);
        }
    }

    #[test]
    fn test_token_threshold_serde_tag() {
        let event = SessionEvent::TokenThreshold {
            session_id: Uuid::now_v7(),
            threshold: 60,
            message: Some("I'm getting a little tired...".to_string()),
            persona_name: "Grandma Wen".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"token_threshold\""));
        assert!(json.contains("\"threshold\":60"));
        assert!(json.contains("\"persona_name\":\"Grandma Wen\""));
    }

    #[test]
    fn test_token_threshold_omits_empty_message() {
        let event = SessionEvent::TokenThreshold {
            session_id: Uuid::now_v7(),
            threshold: 70,
            message: None,
            persona_name: "Grandma Wen".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("\"message\""));
    }

    #[test]
    fn test_indexing_status_serde() {
        let event = SessionEvent::IndexingStatus {
            session_id: Uuid::now_v7(),
            status: IndexingPhase::Completed,
            pending_message_count: Some(3),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"indexing_status\""));
        assert!(json.contains("\"status\":\"completed\""));
        assert!(json.contains("\"pending_message_count\":3"));
    }

    #[test]
    fn test_role_card_online_serde() {
        let event = SessionEvent::RoleCardOnline {
            session_id: Uuid::now_v7(),
            ready_to_chat: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"role_card_online\""));
        assert!(json.contains("\"ready_to_chat\":true"));
    }

    #[test]
    fn test_session_id_accessor() {
        let id = Uuid::now_v7();
        let event = SessionEvent::RoleCardOnline {
            session_id: id,
            ready_to_chat: true,
        };
        assert_eq!(event.session_id(), id);
    }
}
