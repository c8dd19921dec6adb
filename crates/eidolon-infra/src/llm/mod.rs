//! Inference backend implementations.
//!
//! Two backends cover the configured fallback pair: a hosted
//! OpenAI-compatible API and a local Ollama server. Both implement the
//! `InferenceBackend` trait from `eidolon-core`.

pub mod hosted;
pub mod local;
