//! Multi-backend fallback client.
//!
//! Routes generation requests through an ordered list of backends. Each
//! backend gets up to its configured number of attempts, each under its own
//! timeout; when a backend is exhausted the client switches to the next
//! one. Only when every backend in the fallback order has failed does the
//! call fail, with the full per-attempt error list attached.
//!
//! Configuration is validated at construction, never at call time: unknown
//! fallback-order names, out-of-range timeouts/retries/temperatures, and
//! hosted backends without credentials all fail fast with a `ConfigError`.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;

use eidolon_types::error::{BackendFailure, ConfigError, InferenceError};
use eidolon_types::llm::{
    BackendKind, BackendSettings, GenerationChunk, GenerationOptions, GenerationRequest,
    GenerationResponse, InferenceSettings,
};

use super::box_backend::BoxInferenceBackend;

/// Default completion cap when the caller does not set one.
const DEFAULT_MAX_TOKENS: u32 = 1_024;

/// Valid range for per-attempt timeouts, in milliseconds.
const TIMEOUT_RANGE_MS: (u64, u64) = (100, 600_000);
/// Valid range for per-backend attempt counts.
const RETRY_RANGE: (u32, u32) = (1, 10);
/// Valid range for sampling temperature.
const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);

/// Result of a successful generation through the fallback order.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// The generated text.
    pub response: GenerationResponse,
    /// Name of the backend that produced it.
    pub backend_name: String,
    /// Failed attempts observed before this backend succeeded.
    pub failures: Vec<BackendFailure>,
}

/// Result of selecting a backend for streaming.
pub struct StreamSelection {
    /// The stream of fragments from the selected backend.
    pub stream:
        Pin<Box<dyn Stream<Item = Result<GenerationChunk, InferenceError>> + Send + 'static>>,
    /// Name of the backend that is streaming.
    pub backend_name: String,
}

impl std::fmt::Debug for StreamSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSelection")
            .field("backend_name", &self.backend_name)
            .field("stream", &"<stream>")
            .finish()
    }
}

/// One backend in try order, paired with its resolved settings.
struct BackendEntry {
    settings: BackendSettings,
    backend: BoxInferenceBackend,
}

/// Routes generation requests through an ordered backend list with
/// deterministic fallback.
pub struct MultiBackendClient {
    entries: Vec<BackendEntry>,
}

impl MultiBackendClient {
    /// Build a client from settings and backend instances.
    ///
    /// `backends` are matched to settings entries by name; the resulting
    /// try order follows `settings.fallback_order` exactly. All validation
    /// happens here -- a constructed client never fails for config reasons.
    pub fn new(
        settings: &InferenceSettings,
        mut backends: Vec<BoxInferenceBackend>,
    ) -> Result<Self, ConfigError> {
        if settings.fallback_order.is_empty() {
            return Err(ConfigError::EmptyFallbackOrder);
        }

        let mut entries = Vec::with_capacity(settings.fallback_order.len());

        for name in &settings.fallback_order {
            let backend_settings = settings
                .backend(name)
                .ok_or_else(|| ConfigError::UnknownBackend(name.clone()))?
                .clone();

            validate_backend_settings(&backend_settings)?;

            let position = backends
                .iter()
                .position(|b| b.name() == *name)
                .ok_or_else(|| ConfigError::UnknownBackend(name.clone()))?;
            let backend = backends.swap_remove(position);

            entries.push(BackendEntry {
                settings: backend_settings,
                backend,
            });
        }

        Ok(Self { entries })
    }

    /// Names of the configured backends, in try order.
    pub fn backend_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.settings.name.as_str()).collect()
    }

    /// Build the per-backend request, letting caller options override the
    /// backend's configured temperature.
    fn request_for(
        entry: &BackendEntry,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            temperature: options.temperature.unwrap_or(entry.settings.temperature),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    /// Generate a completion, falling through the backend order.
    ///
    /// Each backend gets `max_retries` attempts, each bounded by the
    /// backend's own timeout. Exhausting a backend switches backend -- the
    /// request shape never changes. If every backend fails, returns
    /// `AllBackendsExhausted` with one recorded failure per attempt.
    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<GenerationOutcome, InferenceError> {
        let mut failures: Vec<BackendFailure> = Vec::new();

        for entry in &self.entries {
            let name = entry.settings.name.clone();
            let request = Self::request_for(entry, prompt, &options);
            let timeout = Duration::from_millis(entry.settings.timeout_ms);
            let attempts = entry.settings.max_retries.max(1);

            for attempt in 1..=attempts {
                let result =
                    tokio::time::timeout(timeout, entry.backend.generate(&request)).await;

                let error = match result {
                    Ok(Ok(response)) => {
                        if !failures.is_empty() {
                            tracing::warn!(
                                backend = %name,
                                prior_failures = failures.len(),
                                "Generation succeeded after failover"
                            );
                        }
                        return Ok(GenerationOutcome {
                            response,
                            backend_name: name,
                            failures,
                        });
                    }
                    Ok(Err(err)) => err,
                    Err(_) => InferenceError::Timeout {
                        name: name.clone(),
                        elapsed_ms: entry.settings.timeout_ms,
                    },
                };

                tracing::warn!(
                    backend = %name,
                    attempt,
                    max_attempts = attempts,
                    error = %error,
                    "Backend attempt failed"
                );
                failures.push(BackendFailure {
                    backend: name.clone(),
                    error: error.to_string(),
                });
            }

            tracing::warn!(backend = %name, "Backend exhausted, switching to next in order");
        }

        Err(InferenceError::AllBackendsExhausted { attempts: failures })
    }

    /// Select a backend for streaming and return its stream.
    ///
    /// Streams start from the first backend in the fallback order;
    /// mid-stream failover is not possible, so an error after the stream
    /// starts is propagated to the caller.
    pub fn select_stream(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<StreamSelection, InferenceError> {
        let entry = self
            .entries
            .first()
            .expect("validated fallback order is never empty");

        let request = Self::request_for(entry, prompt, &options);
        Ok(StreamSelection {
            stream: entry.backend.stream(request),
            backend_name: entry.settings.name.clone(),
        })
    }
}

/// Range and credential checks for one backend's settings.
fn validate_backend_settings(settings: &BackendSettings) -> Result<(), ConfigError> {
    if settings.timeout_ms < TIMEOUT_RANGE_MS.0 || settings.timeout_ms > TIMEOUT_RANGE_MS.1 {
        return Err(ConfigError::OutOfRange {
            field: "timeout_ms",
            value: settings.timeout_ms as f64,
            min: TIMEOUT_RANGE_MS.0 as f64,
            max: TIMEOUT_RANGE_MS.1 as f64,
        });
    }
    if settings.max_retries < RETRY_RANGE.0 || settings.max_retries > RETRY_RANGE.1 {
        return Err(ConfigError::OutOfRange {
            field: "max_retries",
            value: f64::from(settings.max_retries),
            min: f64::from(RETRY_RANGE.0),
            max: f64::from(RETRY_RANGE.1),
        });
    }
    if !settings.temperature.is_finite()
        || settings.temperature < TEMPERATURE_RANGE.0
        || settings.temperature > TEMPERATURE_RANGE.1
    {
        return Err(ConfigError::OutOfRange {
            field: "temperature",
            value: settings.temperature,
            min: TEMPERATURE_RANGE.0,
            max: TEMPERATURE_RANGE.1,
        });
    }
    if settings.kind == BackendKind::Api && settings.api_key_env.is_none() {
        return Err(ConfigError::MissingCredentials {
            backend: settings.name.clone(),
        });
    }
    Ok(())
}
