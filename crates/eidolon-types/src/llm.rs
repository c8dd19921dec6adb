//! Inference backend request/response types for Eidolon.
//!
//! These types model the data shapes for generation backends: requests,
//! streamed fragments, and the per-backend configuration that determines
//! the fallback order of the multi-backend client.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Kind of inference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote hosted API (requires credentials).
    Api,
    /// Local inference server (e.g., an Ollama instance).
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Api => write!(f, "api"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" => Ok(BackendKind::Api),
            "local" => Ok(BackendKind::Local),
            other => Err(format!("invalid backend kind: '{other}'")),
        }
    }
}

/// A fully-resolved generation request sent to one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Caller-side generation options; unset fields fall back to the backend's
/// configured values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Response from a backend for a non-streaming generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub content: String,
    /// Tokens reported by the backend, when it reports them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

/// One fragment of a streaming generation; fragments are concatenated by
/// the caller for the final text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationChunk {
    pub content: String,
}

/// Configuration for a single inference backend in the fallback order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Name referenced by `InferenceSettings::fallback_order`.
    pub name: String,
    pub kind: BackendKind,
    pub base_url: String,
    /// Model identifier to request from this backend.
    pub model: String,
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Attempts on this backend before switching to the next one.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Environment variable holding the API key (hosted backends only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_temperature() -> f64 {
    0.7
}

/// Configuration for the multi-backend fallback client.
///
/// `fallback_order` lists backend names in try order; every name must
/// resolve to an entry in `backends`. Validation happens when the client
/// is constructed, never at call time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceSettings {
    pub fallback_order: Vec<String>,
    pub backends: Vec<BackendSettings>,
}

impl InferenceSettings {
    /// Look up a backend definition by name.
    pub fn backend(&self, name: &str) -> Option<&BackendSettings> {
        self.backends.iter().find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_roundtrip() {
        for kind in [BackendKind::Api, BackendKind::Local] {
            let s = kind.to_string();
            let parsed: BackendKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_backend_kind_rejects_unknown() {
        let result: Result<BackendKind, _> = "cloud".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_settings_defaults() {
        let json = r#"{
            "name": "local",
            "kind": "local",
            "base_url": "http://localhost:11434",
            "model": "deepseek-r1:14b"
        }"#;
        let settings: BackendSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.timeout_ms, 30_000);
        assert_eq!(settings.max_retries, 2);
        assert!((settings.temperature - 0.7).abs() < f64::EPSILON);
        assert!(settings.api_key_env.is_none());
    }

    #[test]
    fn test_inference_settings_backend_lookup() {
        let settings = InferenceSettings {
            fallback_order: vec!["api".to_string(), "local".to_string()],
            backends: vec![BackendSettings {
                name: "local".to_string(),
                kind: BackendKind::Local,
                base_url: "http://localhost:11434".to_string(),
                model: "qwen2.5".to_string(),
                timeout_ms: 10_000,
                max_retries: 1,
                temperature: 0.5,
                api_key_env: None,
            }],
        };
        assert!(settings.backend("local").is_some());
        assert!(settings.backend("api").is_none());
    }

    #[test]
    fn test_generation_options_default_is_unset() {
        let options = GenerationOptions::default();
        assert!(options.temperature.is_none());
        assert!(options.max_tokens.is_none());
    }
}
