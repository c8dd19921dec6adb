//! Business logic and port trait definitions for Eidolon.
//!
//! This crate defines the "ports" (embedder, vector index, affinity store,
//! inference backend) that the infrastructure layer implements, plus the
//! engine logic built on top of them: chunking, index management, the
//! affinity model, the multi-backend fallback client, the conversation
//! pipeline, and the session lifecycle. It depends only on `eidolon-types`
//! -- never on `eidolon-infra` or any database/IO crate.

pub mod affinity;
pub mod event;
pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod session;
