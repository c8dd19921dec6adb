//! Session lifecycle state machine.
//!
//! `Active -> FatigueWarned -> OfflineIndexing -> OfflineIdle -> Active`.
//! On every turn the cumulative token count is compared against the budget:
//! crossing the warn ratio fires a one-shot fatigue warning, crossing the
//! offline ratio forces the session offline and hands the transcript to the
//! background indexer. Each threshold event fires exactly once per cycle;
//! typed events go out through the injected event bus.

use chrono::Utc;
use uuid::Uuid;

use eidolon_types::chat::{ChatSession, LifecycleState};
use eidolon_types::event::{IndexingPhase, SessionEvent};

use crate::event::bus::EventBus;

/// Transition triggered by one turn's token accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTransition {
    /// No threshold crossed.
    None,
    /// Crossed the warn ratio; the turn's reply is still served.
    FatigueWarned,
    /// Crossed the offline ratio; new input must now be queued.
    WentOffline,
}

/// Drives one session's lifecycle and emits its typed events.
pub struct SessionLifecycle {
    session: ChatSession,
    warn_ratio: f64,
    offline_ratio: f64,
    persona_name: String,
    bus: EventBus,
}

impl SessionLifecycle {
    pub fn new(
        session: ChatSession,
        warn_ratio: f64,
        offline_ratio: f64,
        persona_name: impl Into<String>,
        bus: EventBus,
    ) -> Self {
        Self {
            session,
            warn_ratio,
            offline_ratio,
            persona_name: persona_name.into(),
            bus,
        }
    }

    /// Snapshot of the underlying session.
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_id(&self) -> Uuid {
        self.session.session_id
    }

    pub fn state(&self) -> LifecycleState {
        self.session.lifecycle_state
    }

    /// Add one turn's token cost and apply threshold transitions.
    ///
    /// The warn threshold fires only from `Active`; the offline threshold
    /// fires from `Active` or `FatigueWarned`. Each therefore fires exactly
    /// once per cycle. A turn that jumps straight past the offline ratio
    /// emits only the 70 event.
    pub fn accumulate(&mut self, turn_cost: u64) -> TurnTransition {
        self.session.tokens_used += turn_cost;
        let ratio = self.session.usage_ratio();

        tracing::debug!(
            session_id = %self.session.session_id,
            tokens_used = self.session.tokens_used,
            token_budget = self.session.token_budget,
            ratio,
            "Turn cost accumulated"
        );

        match self.session.lifecycle_state {
            LifecycleState::Active | LifecycleState::FatigueWarned
                if ratio >= self.offline_ratio =>
            {
                self.session.lifecycle_state = LifecycleState::OfflineIndexing;
                self.bus.publish(SessionEvent::TokenThreshold {
                    session_id: self.session.session_id,
                    threshold: 70,
                    message: None,
                    persona_name: self.persona_name.clone(),
                });
                tracing::info!(
                    session_id = %self.session.session_id,
                    "Session forced offline for indexing"
                );
                TurnTransition::WentOffline
            }
            LifecycleState::Active if ratio >= self.warn_ratio => {
                self.session.lifecycle_state = LifecycleState::FatigueWarned;
                self.bus.publish(SessionEvent::TokenThreshold {
                    session_id: self.session.session_id,
                    threshold: 60,
                    message: Some(self.tired_message(ratio)),
                    persona_name: self.persona_name.clone(),
                });
                TurnTransition::FatigueWarned
            }
            _ => TurnTransition::None,
        }
    }

    /// Queue one message while offline; returns the new pending count.
    pub fn queue_message(&mut self) -> u32 {
        self.session.pending_message_count += 1;
        self.session.pending_message_count
    }

    /// Announce that background indexing has started.
    pub fn notify_indexing_started(&self) {
        self.bus.publish(SessionEvent::IndexingStatus {
            session_id: self.session.session_id,
            status: IndexingPhase::Started,
            pending_message_count: None,
        });
    }

    /// Background indexing finished: move to idle and report the final
    /// pending count.
    pub fn complete_indexing(&mut self) {
        if self.session.lifecycle_state != LifecycleState::OfflineIndexing {
            return;
        }
        self.session.lifecycle_state = LifecycleState::OfflineIdle;
        self.bus.publish(SessionEvent::IndexingStatus {
            session_id: self.session.session_id,
            status: IndexingPhase::Completed,
            pending_message_count: Some(self.session.pending_message_count),
        });
    }

    /// Resume to `Active`, resetting the budget and the pending counter.
    ///
    /// Returns the pending count that was cleared. Resumption implies a
    /// budget reset -- without it the very next turn would trip the offline
    /// threshold again.
    pub fn resume(&mut self) -> u32 {
        let pending = self.session.pending_message_count;
        self.session.lifecycle_state = LifecycleState::Active;
        self.session.pending_message_count = 0;
        self.session.tokens_used = 0;
        self.bus.publish(SessionEvent::RoleCardOnline {
            session_id: self.session.session_id,
            ready_to_chat: true,
        });
        tracing::info!(
            session_id = %self.session.session_id,
            cleared_pending = pending,
            "Session resumed"
        );
        pending
    }

    /// Close the session permanently (never deleted, only closed).
    pub fn close(&mut self) {
        self.session.lifecycle_state = LifecycleState::Closed;
        self.session.ended_at = Some(Utc::now());
    }

    /// Persona-flavored fatigue message for the 60% warning.
    fn tired_message(&self, ratio: f64) -> String {
        let percent = (ratio * 100.0).round() as u32;
        format!(
            "{} is getting a little tired -- we've used about {percent}% of \
             our time together. Say what matters most; we may need to pause soon.",
            self.persona_name
        )
    }
}
