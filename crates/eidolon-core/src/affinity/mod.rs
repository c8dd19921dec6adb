//! Affinity subsystem for Eidolon.
//!
//! Tracks a bounded relationship-quality score per (persona, interlocutor)
//! pair and moves it through a fixed weighted combination of per-turn
//! signals: message sentiment, conversation frequency, exchange quality,
//! and time decay.

pub mod model;
pub mod sentiment;
pub mod signals;
pub mod store;
