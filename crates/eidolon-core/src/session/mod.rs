//! Session layer for Eidolon.
//!
//! Tracks cumulative token consumption per session, drives the
//! fatigue/offline/resume state machine, and exposes the Session API
//! consumed by the external application layer.

pub mod cost;
pub mod lifecycle;
pub mod service;
