//! Session service: the Session API consumed by the external application
//! layer.
//!
//! Owns the per-session lifecycle state machines, runs turns through the
//! conversation pipeline, and spawns the background reindex task when a
//! session is forced offline. Turns within one session are serialized
//! through the session's mutex, which is also what lets `end_session` wait
//! for an in-flight generation instead of hard-cancelling it.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use eidolon_types::affinity::AffinitySignals;
use eidolon_types::chat::{ChatSession, ConversationState, LifecycleState, TurnMessage, TurnRole};
use eidolon_types::config::EngineConfig;
use eidolon_types::error::SessionError;
use eidolon_types::event::SessionEvent;
use eidolon_types::memory::MemoryChunk;
use eidolon_types::persona::{Persona, RelationType};

use crate::affinity::signals::{frequency_bonus, quality_bonus};
use crate::event::bus::EventBus;
use crate::memory::chunker::Chunker;
use crate::memory::indexer::IndexManager;
use crate::pipeline::ConversationPipeline;
use crate::session::cost::TurnCostEstimator;
use crate::session::lifecycle::{SessionLifecycle, TurnTransition};

/// Result of a `send_message` call.
#[derive(Debug)]
pub enum SendOutcome {
    /// The turn was served; `state.errors` carries any partial failures.
    Reply {
        content: String,
        state: ConversationState,
    },
    /// The session is offline; the message was queued, never dropped.
    Queued { pending: u32 },
}

/// Per-session mutable state guarded by the session mutex.
struct SessionEntry {
    lifecycle: SessionLifecycle,
    relation_type: RelationType,
    transcript: Vec<TurnMessage>,
    queued: Vec<String>,
    /// Chunks from a failed background reindex, retried on the next
    /// offline transition.
    pending_reindex: Vec<MemoryChunk>,
}

/// The engine's session-facing surface: create, send, end, resume.
pub struct SessionService {
    pipeline: Arc<ConversationPipeline>,
    indexer: Arc<IndexManager>,
    chunker: Chunker,
    cost: Arc<dyn TurnCostEstimator>,
    bus: EventBus,
    config: EngineConfig,
    personas: DashMap<Uuid, Persona>,
    sessions: DashMap<Uuid, Arc<Mutex<SessionEntry>>>,
}

impl SessionService {
    pub fn new(
        pipeline: Arc<ConversationPipeline>,
        indexer: Arc<IndexManager>,
        cost: Arc<dyn TurnCostEstimator>,
        config: EngineConfig,
    ) -> Self {
        let chunker = Chunker::new(config.max_chunk_size);
        Self {
            pipeline,
            indexer,
            chunker,
            cost,
            bus: EventBus::new(256),
            config,
            personas: DashMap::new(),
            sessions: DashMap::new(),
        }
    }

    /// Make a persona known to the service.
    ///
    /// Sessions can only be created for registered personas.
    pub fn register_persona(&self, persona: Persona) {
        self.personas.insert(persona.id, persona);
    }

    /// Subscribe to lifecycle events (token thresholds, indexing status,
    /// role-card-online).
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// The index manager, for corpus-change callers (answer edits).
    pub fn indexer(&self) -> &Arc<IndexManager> {
        &self.indexer
    }

    /// Start a session between a persona and an interlocutor.
    pub fn create_session(
        &self,
        persona_id: &Uuid,
        interlocutor_id: &Uuid,
    ) -> Result<Uuid, SessionError> {
        self.create_session_with_relation(persona_id, interlocutor_id, RelationType::Stranger)
    }

    /// Start a session with a known relationship between the parties.
    pub fn create_session_with_relation(
        &self,
        persona_id: &Uuid,
        interlocutor_id: &Uuid,
        relation_type: RelationType,
    ) -> Result<Uuid, SessionError> {
        let persona = self
            .personas
            .get(persona_id)
            .ok_or(SessionError::NotFound)?;

        let session = ChatSession::new(*persona_id, *interlocutor_id, self.config.token_budget);
        let session_id = session.session_id;
        let lifecycle = SessionLifecycle::new(
            session,
            self.config.warn_ratio,
            self.config.offline_ratio,
            persona.display_name.clone(),
            self.bus.clone(),
        );

        self.sessions.insert(
            session_id,
            Arc::new(Mutex::new(SessionEntry {
                lifecycle,
                relation_type,
                transcript: Vec::new(),
                queued: Vec::new(),
                pending_reindex: Vec::new(),
            })),
        );

        tracing::info!(
            session_id = %session_id,
            persona_id = %persona_id,
            interlocutor_id = %interlocutor_id,
            "Session created"
        );
        Ok(session_id)
    }

    /// Look up a session's entry handle.
    fn entry(&self, session_id: &Uuid) -> Result<Arc<Mutex<SessionEntry>>, SessionError> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::NotFound)
    }

    /// Serve one turn, or queue the message when the session is offline.
    ///
    /// The entry mutex serializes turns within a session; the reply comes
    /// with the full conversation state so the caller can inspect partial
    /// failures in `state.errors`.
    pub async fn send_message(
        &self,
        session_id: &Uuid,
        text: &str,
    ) -> Result<SendOutcome, SessionError> {
        let entry_arc = self.entry(session_id)?;
        let mut entry = entry_arc.lock().await;

        match entry.lifecycle.state() {
            LifecycleState::Closed => return Err(SessionError::Closed),
            state if !state.accepts_input() => {
                let pending = entry.lifecycle.queue_message();
                entry.queued.push(text.to_string());
                tracing::debug!(
                    session_id = %session_id,
                    pending,
                    "Session offline, message queued"
                );
                return Ok(SendOutcome::Queued { pending });
            }
            _ => {}
        }

        let session = entry.lifecycle.session();
        let persona_id = session.persona_id;
        let interlocutor_id = session.interlocutor_id;
        let persona = self
            .personas
            .get(&persona_id)
            .map(|p| p.value().clone())
            .ok_or(SessionError::NotFound)?;

        let mut state = ConversationState::new(
            persona_id,
            interlocutor_id,
            entry.relation_type,
            persona.role_description.clone(),
            text,
        );
        state.affinity_baseline = persona.baseline_affinity;
        state.messages = entry.transcript.clone();

        let state = self.pipeline.process(state).await;

        let Some(reply) = state.generated_response.clone() else {
            // The pipeline halted before generation (empty input). Nothing
            // to add to the transcript or the budget.
            return Ok(SendOutcome::Reply {
                content: String::new(),
                state,
            });
        };

        entry
            .transcript
            .push(TurnMessage::user(state.current_input.clone()));
        entry.transcript.push(TurnMessage::assistant(reply.clone()));

        let turn_cost = self.cost.estimate(&state);
        if entry.lifecycle.accumulate(turn_cost) == TurnTransition::WentOffline {
            self.spawn_reindex(session_id, &persona_id, &entry_arc, &mut entry);
        }

        Ok(SendOutcome::Reply {
            content: reply,
            state,
        })
    }

    /// Close the session: apply the end-of-conversation affinity bonus and
    /// stop accepting turns. An in-flight turn finishes first because it
    /// holds the same session mutex -- the generation is never
    /// hard-cancelled.
    pub async fn end_session(&self, session_id: &Uuid) -> Result<(), SessionError> {
        let entry_arc = self.entry(session_id)?;
        let mut entry = entry_arc.lock().await;

        if entry.lifecycle.state() == LifecycleState::Closed {
            return Ok(());
        }

        let session = entry.lifecycle.session();
        let persona_id = session.persona_id;
        let interlocutor_id = session.interlocutor_id;
        let baseline = self
            .personas
            .get(&persona_id)
            .map_or(Persona::DEFAULT_BASELINE, |p| p.baseline_affinity);

        // Conversation-end affinity update: this is where the frequency
        // bonus is granted.
        let affinity = self.pipeline.affinity();
        match affinity
            .get_score(&persona_id, &interlocutor_id, baseline)
            .await
        {
            Ok(record) => {
                let signals = AffinitySignals {
                    message_sentiment: 0.0,
                    frequency: frequency_bonus(record.total_conversations, true),
                    quality_signal: quality_bonus(&entry.transcript),
                    decay_signal: 0.0,
                };
                if let Err(err) = affinity
                    .update(&persona_id, &interlocutor_id, baseline, signals)
                    .await
                {
                    tracing::warn!(error = %err, "End-of-conversation affinity update failed");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "End-of-conversation affinity read failed");
            }
        }

        entry.lifecycle.close();
        tracing::info!(session_id = %session_id, "Session ended");
        Ok(())
    }

    /// Bring an offline session back online.
    ///
    /// Returns the messages that were queued while offline, in arrival
    /// order, so the caller can replay or display them. The pending counter
    /// resets to zero and a `role_card_online` event is emitted.
    pub async fn resume_session(&self, session_id: &Uuid) -> Result<Vec<String>, SessionError> {
        let entry_arc = self.entry(session_id)?;
        let mut entry = entry_arc.lock().await;

        if entry.lifecycle.state() == LifecycleState::Closed {
            return Err(SessionError::Closed);
        }

        let queued = std::mem::take(&mut entry.queued);
        entry.lifecycle.resume();
        Ok(queued)
    }

    /// Snapshot of a session's current state.
    pub async fn session(&self, session_id: &Uuid) -> Result<ChatSession, SessionError> {
        let entry_arc = self.entry(session_id)?;
        let entry = entry_arc.lock().await;
        Ok(entry.lifecycle.session().clone())
    }

    /// Fold the session transcript into the persona's corpus in the
    /// background. Chunks carry content-hash ids, so a retried run upserts
    /// idempotently. On failure the chunks are kept and retried on the next
    /// offline transition -- never silently discarded.
    fn spawn_reindex(
        &self,
        session_id: &Uuid,
        persona_id: &Uuid,
        entry_arc: &Arc<Mutex<SessionEntry>>,
        entry: &mut SessionEntry,
    ) {
        let mut chunks = self.transcript_chunks(session_id, &entry.transcript);
        chunks.extend(entry.pending_reindex.drain(..));

        entry.lifecycle.notify_indexing_started();

        let indexer = self.indexer.clone();
        let entry_arc = entry_arc.clone();
        let session_id = *session_id;
        let persona_id = *persona_id;

        tokio::spawn(async move {
            let result = indexer.rebuild_index(&persona_id, &chunks).await;
            let mut entry = entry_arc.lock().await;
            match result {
                Ok(report) => {
                    tracing::info!(
                        session_id = %session_id,
                        indexed = report.indexed,
                        rejected = report.rejected,
                        "Background transcript indexing complete"
                    );
                    entry.lifecycle.complete_indexing();
                }
                Err(err) => {
                    tracing::error!(
                        session_id = %session_id,
                        error = %err,
                        "Background transcript indexing failed; will retry on next offline transition"
                    );
                    entry.pending_reindex = chunks;
                }
            }
        });
    }

    /// Pair up user/assistant turns into question/answer chunks.
    fn transcript_chunks(
        &self,
        session_id: &Uuid,
        transcript: &[TurnMessage],
    ) -> Vec<MemoryChunk> {
        let mut chunks = Vec::new();
        let mut pending_user: Option<&TurnMessage> = None;

        for message in transcript {
            match message.role {
                TurnRole::User => pending_user = Some(message),
                TurnRole::Assistant => {
                    if let Some(user) = pending_user.take() {
                        let mut metadata = HashMap::new();
                        metadata.insert("source".to_string(), "session".into());
                        metadata
                            .insert("session_id".to_string(), session_id.to_string().into());
                        chunks.push(self.chunker.chunk_from_qa_pair(
                            &user.content,
                            &message.content,
                            metadata,
                        ));
                    }
                }
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::model::AffinityModel;
    use crate::affinity::sentiment::{BoxSentimentClassifier, SentimentClassifier};
    use crate::affinity::store::{AffinityStore, BoxAffinityStore};
    use crate::llm::backend::InferenceBackend;
    use crate::llm::box_backend::BoxInferenceBackend;
    use crate::llm::fallback::MultiBackendClient;
    use crate::memory::box_embedder::BoxEmbedder;
    use crate::memory::box_vector::BoxVectorIndex;
    use crate::memory::embedder::Embedder;
    use crate::memory::vector::VectorIndex;
    use eidolon_types::affinity::AffinityRecord;
    use eidolon_types::error::{AffinityError, EmbeddingError, IndexError, InferenceError};
    use eidolon_types::event::IndexingPhase;
    use eidolon_types::llm::{
        BackendKind, BackendSettings, GenerationChunk, GenerationRequest, GenerationResponse,
        InferenceSettings,
    };
    use eidolon_types::memory::ScoredChunk;
    use futures_util::Stream;
    use std::pin::Pin;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::sync::broadcast::error::TryRecvError;

    // --- Test doubles ---

    struct MockEmbedder;

    impl Embedder for MockEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let mut v = vec![0.0f32; 4];
            for (i, b) in text.bytes().enumerate() {
                v[i % 4] += f32::from(b) / 255.0;
            }
            Ok(v)
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let mut out = Vec::with_capacity(texts.len());
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }
        fn model_name(&self) -> &str {
            "mock"
        }
        fn dimension(&self) -> usize {
            4
        }
    }

    /// In-memory index whose upserts wait for a gate, so tests control
    /// exactly when the background reindex completes.
    struct GatedIndex {
        collections: DashMap<Uuid, Vec<MemoryChunk>>,
        gate: Arc<Notify>,
        gated: bool,
    }

    impl GatedIndex {
        fn open() -> Self {
            Self {
                collections: DashMap::new(),
                gate: Arc::new(Notify::new()),
                gated: false,
            }
        }

        fn gated() -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            (
                Self {
                    collections: DashMap::new(),
                    gate: gate.clone(),
                    gated: true,
                },
                gate,
            )
        }
    }

    impl VectorIndex for GatedIndex {
        async fn upsert(
            &self,
            persona_id: &Uuid,
            chunks: &[MemoryChunk],
            _vectors: &[Vec<f32>],
        ) -> Result<(), IndexError> {
            if self.gated {
                self.gate.notified().await;
            }
            let mut collection = self.collections.entry(*persona_id).or_default();
            for chunk in chunks {
                if !collection.iter().any(|c| c.id == chunk.id) {
                    collection.push(chunk.clone());
                }
            }
            Ok(())
        }
        async fn search(
            &self,
            _persona_id: &Uuid,
            _query: &[f32],
            _top_k: usize,
        ) -> Result<Vec<ScoredChunk>, IndexError> {
            Ok(vec![])
        }
        async fn delete(&self, _persona_id: &Uuid, _ids: &[String]) -> Result<(), IndexError> {
            Ok(())
        }
        async fn count(&self, persona_id: &Uuid) -> Result<u64, IndexError> {
            Ok(self
                .collections
                .get(persona_id)
                .map_or(0, |c| c.len() as u64))
        }
        async fn ensure_collection(&self, persona_id: &Uuid) -> Result<(), IndexError> {
            self.collections.entry(*persona_id).or_default();
            Ok(())
        }
        async fn drop_collection(&self, persona_id: &Uuid) -> Result<(), IndexError> {
            self.collections.remove(persona_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockAffinityStore {
        records: DashMap<(Uuid, Uuid), AffinityRecord>,
    }

    impl AffinityStore for MockAffinityStore {
        async fn get(
            &self,
            persona_id: &Uuid,
            interlocutor_id: &Uuid,
        ) -> Result<Option<AffinityRecord>, AffinityError> {
            Ok(self
                .records
                .get(&(*persona_id, *interlocutor_id))
                .map(|r| r.clone()))
        }
        async fn put(&self, record: &AffinityRecord) -> Result<(), AffinityError> {
            self.records
                .insert((record.persona_id, record.interlocutor_id), record.clone());
            Ok(())
        }
        async fn list_for_persona(
            &self,
            persona_id: &Uuid,
        ) -> Result<Vec<AffinityRecord>, AffinityError> {
            Ok(self
                .records
                .iter()
                .filter(|e| e.key().0 == *persona_id)
                .map(|e| e.value().clone())
                .collect())
        }
    }

    struct EchoBackend;

    impl InferenceBackend for EchoBackend {
        fn name(&self) -> &str {
            "local"
        }
        fn kind(&self) -> BackendKind {
            BackendKind::Local
        }
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationResponse, InferenceError> {
            Ok(GenerationResponse {
                content: "How nice of you to visit.".to_string(),
                tokens_used: Some(10),
            })
        }
        fn stream(
            &self,
            _request: GenerationRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<GenerationChunk, InferenceError>> + Send + 'static>>
        {
            Box::pin(futures_util::stream::empty())
        }
    }

    struct NeutralSentiment;

    impl SentimentClassifier for NeutralSentiment {
        async fn classify(&self, _text: &str) -> f64 {
            0.0
        }
    }

    /// Cost estimator that replays a scripted sequence of per-turn costs.
    struct ScriptedCost {
        costs: StdMutex<Vec<u64>>,
    }

    impl ScriptedCost {
        fn new(costs: Vec<u64>) -> Self {
            Self {
                costs: StdMutex::new(costs),
            }
        }
    }

    impl TurnCostEstimator for ScriptedCost {
        fn estimate(&self, _state: &ConversationState) -> u64 {
            let mut costs = self.costs.lock().unwrap();
            if costs.is_empty() { 10 } else { costs.remove(0) }
        }
    }

    fn make_service(index: GatedIndex, costs: Vec<u64>, token_budget: u64) -> (SessionService, Persona) {
        let embedder = Arc::new(BoxEmbedder::new(MockEmbedder));
        let index = Arc::new(BoxVectorIndex::new(index));
        let affinity = Arc::new(AffinityModel::new(BoxAffinityStore::new(
            MockAffinityStore::default(),
        )));
        let settings = InferenceSettings {
            fallback_order: vec!["local".to_string()],
            backends: vec![BackendSettings {
                name: "local".to_string(),
                kind: BackendKind::Local,
                base_url: "http://localhost:11434".to_string(),
                model: "test".to_string(),
                timeout_ms: 1_000,
                max_retries: 1,
                temperature: 0.7,
                api_key_env: None,
            }],
        };
        let client = Arc::new(
            MultiBackendClient::new(&settings, vec![BoxInferenceBackend::new(EchoBackend)])
                .unwrap(),
        );
        let sentiment = Arc::new(BoxSentimentClassifier::new(NeutralSentiment));

        let pipeline = Arc::new(ConversationPipeline::new(
            embedder.clone(),
            index.clone(),
            affinity,
            client,
            sentiment,
            3,
        ));
        let indexer = Arc::new(IndexManager::new(index, embedder));

        let config = EngineConfig {
            token_budget,
            ..EngineConfig::default()
        };
        let service = SessionService::new(
            pipeline,
            indexer,
            Arc::new(ScriptedCost::new(costs)),
            config,
        );

        let persona = Persona::new("Grandma Wen", "A warm retired teacher.");
        service.register_persona(persona.clone());
        (service, persona)
    }

    fn drain(
        rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return events,
                Err(other) => panic!("unexpected recv error: {other:?}"),
            }
        }
    }

    async fn wait_for_state(
        service: &SessionService,
        session_id: &Uuid,
        expected: LifecycleState,
    ) {
        for _ in 0..100 {
            if service.session(session_id).await.unwrap().lifecycle_state == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session never reached {expected}");
    }

    // --- Tests ---

    #[tokio::test]
    async fn test_send_message_returns_reply() {
        let (service, persona) = make_service(GatedIndex::open(), vec![10], 1000);
        let interlocutor = Uuid::now_v7();
        let session_id = service.create_session(&persona.id, &interlocutor).unwrap();

        let outcome = service.send_message(&session_id, "Hello!").await.unwrap();
        match outcome {
            SendOutcome::Reply { content, state } => {
                assert_eq!(content, "How nice of you to visit.");
                assert!(!state.has_errors(), "errors: {:?}", state.errors);
            }
            other => panic!("expected reply, got {other:?}"),
        }

        let session = service.session(&session_id).await.unwrap();
        assert_eq!(session.tokens_used, 10);
        assert_eq!(session.lifecycle_state, LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (service, _persona) = make_service(GatedIndex::open(), vec![], 1000);
        let result = service.send_message(&Uuid::now_v7(), "hi").await;
        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_unregistered_persona_cannot_create_session() {
        let (service, _persona) = make_service(GatedIndex::open(), vec![], 1000);
        let result = service.create_session(&Uuid::now_v7(), &Uuid::now_v7());
        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_closed_session_rejects_input() {
        let (service, persona) = make_service(GatedIndex::open(), vec![10], 1000);
        let session_id = service
            .create_session(&persona.id, &Uuid::now_v7())
            .unwrap();

        service.end_session(&session_id).await.unwrap();
        let result = service.send_message(&session_id, "hello?").await;
        assert!(matches!(result, Err(SessionError::Closed)));

        // Ending again is a no-op
        service.end_session(&session_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_full_budget_lifecycle_scenario() {
        // Budget 1000; first turn lands at 650 (one 60% warning), second
        // at 720 (one 70% event, session goes offline and indexes).
        let (index, gate) = GatedIndex::gated();
        let (service, persona) = make_service(index, vec![650, 70], 1000);
        let interlocutor = Uuid::now_v7();
        let session_id = service.create_session(&persona.id, &interlocutor).unwrap();
        let mut rx = service.subscribe();

        // Turn 1: 0 -> 650 crosses 60%
        let outcome = service.send_message(&session_id, "Hello!").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Reply { .. }));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1, "events: {events:?}");
        assert!(matches!(
            events[0],
            SessionEvent::TokenThreshold { threshold: 60, message: Some(_), .. }
        ));

        // Turn 2: 650 -> 720 crosses 70%
        let outcome = service
            .send_message(&session_id, "Tell me more")
            .await
            .unwrap();
        assert!(matches!(outcome, SendOutcome::Reply { .. }));

        let events = drain(&mut rx);
        assert!(matches!(
            events[0],
            SessionEvent::TokenThreshold { threshold: 70, message: None, .. }
        ));
        assert!(matches!(
            events[1],
            SessionEvent::IndexingStatus { status: IndexingPhase::Started, .. }
        ));

        // Messages sent while offline are queued with incrementing counts
        let outcome = service.send_message(&session_id, "anyone home?").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Queued { pending: 1 }));
        let outcome = service.send_message(&session_id, "hello?").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Queued { pending: 2 }));

        // Let the background reindex finish (notify_one stores a permit in
        // case the task has not reached the gate yet)
        gate.notify_one();
        wait_for_state(&service, &session_id, LifecycleState::OfflineIdle).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::IndexingStatus {
                status,
                pending_message_count,
                ..
            } => {
                assert_eq!(*status, IndexingPhase::Completed);
                assert_eq!(*pending_message_count, Some(2));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Transcript got folded into the persona's corpus (2 exchanges)
        let stats = service.indexer().stats(&persona.id).await.unwrap();
        assert_eq!(stats.vector_count, 2);

        // Resume: queued messages come back, counter resets, session active
        let queued = service.resume_session(&session_id).await.unwrap();
        assert_eq!(queued, vec!["anyone home?", "hello?"]);

        let session = service.session(&session_id).await.unwrap();
        assert_eq!(session.lifecycle_state, LifecycleState::Active);
        assert_eq!(session.pending_message_count, 0);

        let events = drain(&mut rx);
        assert!(matches!(
            events[0],
            SessionEvent::RoleCardOnline { ready_to_chat: true, .. }
        ));

        // And the session serves turns again
        let outcome = service.send_message(&session_id, "I'm back").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Reply { .. }));
    }

    #[tokio::test]
    async fn test_end_session_grants_frequency_bonus() {
        let (service, persona) = make_service(GatedIndex::open(), vec![10, 10], 1000);
        let interlocutor = Uuid::now_v7();
        let session_id = service.create_session(&persona.id, &interlocutor).unwrap();

        service.send_message(&session_id, "Hello!").await.unwrap();
        service.end_session(&session_id).await.unwrap();

        let record = service
            .pipeline
            .affinity()
            .get_score(&persona.id, &interlocutor, persona.baseline_affinity)
            .await
            .unwrap();
        // First finished conversation counted
        assert_eq!(record.total_conversations, 1);
        // Frequency bonus 1.0 * 0.2 weight moved the score up
        assert!(record.current_score > persona.baseline_affinity);
    }

    #[tokio::test]
    async fn test_empty_input_returns_errors_without_charging_budget() {
        let (service, persona) = make_service(GatedIndex::open(), vec![650], 1000);
        let session_id = service
            .create_session(&persona.id, &Uuid::now_v7())
            .unwrap();

        let outcome = service.send_message(&session_id, "   ").await.unwrap();
        match outcome {
            SendOutcome::Reply { content, state } => {
                assert!(content.is_empty());
                assert!(state.has_errors());
            }
            other => panic!("expected reply, got {other:?}"),
        }

        let session = service.session(&session_id).await.unwrap();
        assert_eq!(session.tokens_used, 0);
    }
}
