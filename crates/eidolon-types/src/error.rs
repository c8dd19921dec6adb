use thiserror::Error;

/// Errors detected when constructing engine components from configuration.
///
/// These are fatal and surface at construction, never at call time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fallback order is empty")]
    EmptyFallbackOrder,

    #[error("fallback order references unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("backend '{backend}' requires credentials but none are configured")]
    MissingCredentials { backend: String },

    #[error("{field} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Shape violations detected when validating a memory chunk.
///
/// A failed chunk is rejected individually; it never aborts a batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("chunk id is empty")]
    EmptyId,

    #[error("chunk text is empty")]
    EmptyText,

    #[error("chunk kind '{0}' is not a recognized kind")]
    WrongKind(String),
}

/// Errors from the embedding provider.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding backend error: {0}")]
    Backend(String),

    #[error("embedding response could not be decoded: {0}")]
    Decode(String),

    #[error("vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Errors from the vector index and index manager.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector store error: {0}")]
    Store(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    InvalidChunk(#[from] ValidationError),
}

/// A single failed attempt on one backend, recorded for the exhaustion
/// report.
#[derive(Debug, Clone)]
pub struct BackendFailure {
    pub backend: String,
    pub error: String,
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.backend, self.error)
    }
}

/// Errors from inference backends and the fallback client.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("backend '{name}' error: {message}")]
    Backend { name: String, message: String },

    #[error("backend '{name}' timed out after {elapsed_ms}ms")]
    Timeout { name: String, elapsed_ms: u64 },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("all inference backends exhausted ({})", describe_attempts(.attempts))]
    AllBackendsExhausted { attempts: Vec<BackendFailure> },
}

fn describe_attempts(attempts: &[BackendFailure]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from the affinity model and its store.
#[derive(Debug, Error)]
pub enum AffinityError {
    #[error("affinity store error: {0}")]
    Store(String),

    #[error("signal {field} = {value} is out of range [{min}, {max}]")]
    SignalOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Errors from the session service.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("session is closed")]
    Closed,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Affinity(#[from] AffinityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownBackend("cloud".to_string());
        assert_eq!(
            err.to_string(),
            "fallback order references unknown backend 'cloud'"
        );

        let err = ConfigError::OutOfRange {
            field: "temperature",
            value: 3.0,
            min: 0.0,
            max: 2.0,
        };
        assert!(err.to_string().contains("temperature = 3"));
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(ValidationError::EmptyText.to_string(), "chunk text is empty");
        assert!(
            ValidationError::WrongKind("paragraph".to_string())
                .to_string()
                .contains("paragraph")
        );
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = EmbeddingError::DimensionMismatch { left: 768, right: 384 };
        assert!(err.to_string().contains("768"));
        assert!(err.to_string().contains("384"));
    }

    #[test]
    fn test_exhaustion_lists_every_backend() {
        let err = InferenceError::AllBackendsExhausted {
            attempts: vec![
                BackendFailure {
                    backend: "api".to_string(),
                    error: "connection refused".to_string(),
                },
                BackendFailure {
                    backend: "local".to_string(),
                    error: "timed out".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("api: connection refused"));
        assert!(msg.contains("local: timed out"));
    }

    #[test]
    fn test_index_error_wraps_validation() {
        let err: IndexError = ValidationError::EmptyId.into();
        assert_eq!(err.to_string(), "chunk id is empty");
    }
}
