//! Shared domain types for Eidolon.
//!
//! This crate contains the core domain types used across the Eidolon engine:
//! personas and their recorded answers, memory chunks, affinity records,
//! conversation state, session lifecycle, typed session events, and the
//! engine configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod affinity;
pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod llm;
pub mod memory;
pub mod persona;
