//! BoxInferenceBackend -- object-safe dynamic dispatch wrapper for
//! InferenceBackend.
//!
//! Same blanket-impl pattern as BoxEmbedder:
//! 1. Define an object-safe `InferenceBackendDyn` trait with boxed futures
//! 2. Blanket-impl it for all `T: InferenceBackend`
//! 3. `BoxInferenceBackend` wraps the trait object and delegates

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use eidolon_types::error::InferenceError;
use eidolon_types::llm::{BackendKind, GenerationChunk, GenerationRequest, GenerationResponse};

use super::backend::InferenceBackend;

/// Object-safe version of [`InferenceBackend`] with boxed futures.
pub trait InferenceBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GenerationResponse, InferenceError>> + Send + 'a>>;

    fn stream_boxed(
        &self,
        request: GenerationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<GenerationChunk, InferenceError>> + Send + 'static>>;
}

/// Blanket implementation: any `InferenceBackend` automatically implements
/// `InferenceBackendDyn`.
impl<T: InferenceBackend> InferenceBackendDyn for T {
    fn name(&self) -> &str {
        InferenceBackend::name(self)
    }

    fn kind(&self) -> BackendKind {
        InferenceBackend::kind(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GenerationResponse, InferenceError>> + Send + 'a>> {
        Box::pin(self.generate(request))
    }

    fn stream_boxed(
        &self,
        request: GenerationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<GenerationChunk, InferenceError>> + Send + 'static>> {
        self.stream(request)
    }
}

/// Type-erased inference backend for runtime selection.
pub struct BoxInferenceBackend {
    inner: Box<dyn InferenceBackendDyn + Send + Sync>,
}

impl BoxInferenceBackend {
    /// Wrap a concrete `InferenceBackend` in a type-erased box.
    pub fn new<T: InferenceBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    /// Name of this backend instance.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Whether this is a hosted API or a local inference server.
    pub fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    /// Generate a full completion for the request.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, InferenceError> {
        self.inner.generate_boxed(request).await
    }

    /// Generate a streaming completion.
    pub fn stream(
        &self,
        request: GenerationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<GenerationChunk, InferenceError>> + Send + 'static>> {
        self.inner.stream_boxed(request)
    }
}
