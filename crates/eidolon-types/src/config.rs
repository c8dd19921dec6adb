//! Engine configuration for Eidolon.
//!
//! Deserialized from `eidolon.toml` by the infrastructure loader. Every
//! field carries a serde default so a partial (or missing) file still
//! produces a usable configuration.

use serde::{Deserialize, Serialize};

use crate::llm::InferenceSettings;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-session token budget driving the fatigue/offline lifecycle.
    #[serde(default = "default_token_budget")]
    pub token_budget: u64,

    /// Budget ratio at which the fatigue warning fires.
    #[serde(default = "default_warn_ratio")]
    pub warn_ratio: f64,

    /// Budget ratio at which the session is forced offline.
    #[serde(default = "default_offline_ratio")]
    pub offline_ratio: f64,

    /// Memory chunks retrieved per turn.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Maximum chunk text size before sentence splitting kicks in.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub inference: InferenceSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            warn_ratio: default_warn_ratio(),
            offline_ratio: default_offline_ratio(),
            top_k: default_top_k(),
            max_chunk_size: default_max_chunk_size(),
            embedding: EmbeddingSettings::default(),
            inference: InferenceSettings::default(),
        }
    }
}

fn default_token_budget() -> u64 {
    65_536
}

fn default_warn_ratio() -> f64 {
    0.6
}

fn default_offline_ratio() -> f64 {
    0.7
}

fn default_top_k() -> usize {
    5
}

fn default_max_chunk_size() -> usize {
    1_000
}

/// Embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Base URL of the embedding server (`POST {base_url}/embeddings`).
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model identifier; part of the cache key.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector dimension; responses of any other length are
    /// rejected rather than silently stored.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Capacity of the query-result LRU cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_embedding_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_embedding_model() -> String {
    "multilingual-e5-large".to_string()
}

fn default_embedding_dimension() -> usize {
    768
}

fn default_cache_capacity() -> usize {
    1_024
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            fallback_order: Vec::new(),
            backends: Vec::new(),
        }
    }
}
