//! InferenceBackend trait definition.
//!
//! This is the abstraction every generation backend implements. Uses RPITIT
//! for `generate`, and `Pin<Box<dyn Stream>>` for `stream` (streams need to
//! be object-safe for the BoxInferenceBackend wrapper).

use std::pin::Pin;

use futures_util::Stream;

use eidolon_types::error::InferenceError;
use eidolon_types::llm::{BackendKind, GenerationChunk, GenerationRequest, GenerationResponse};

/// Trait for inference backends (hosted API, local Ollama, etc.).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition) for
/// `generate`. The `stream` method returns a boxed stream because streams
/// need to be object-safe for `BoxInferenceBackend`.
///
/// Implementations live in eidolon-infra.
pub trait InferenceBackend: Send + Sync {
    /// Name of this backend instance, matching its configuration entry.
    fn name(&self) -> &str;

    /// Whether this is a hosted API or a local inference server.
    fn kind(&self) -> BackendKind;

    /// Generate a full completion for the request.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<GenerationResponse, InferenceError>> + Send;

    /// Generate a streaming completion. Fragments are concatenated by the
    /// caller for the final text.
    fn stream(
        &self,
        request: GenerationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<GenerationChunk, InferenceError>> + Send + 'static>>;
}
