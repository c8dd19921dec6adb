//! HTTP embedding client.
//!
//! Implements the `Embedder` trait from `eidolon-core` against the
//! embedding server's wire contract: `POST {base}/embeddings
//! {input, model} -> {embedding: [f32]}`. Responses of the wrong dimension
//! are rejected rather than stored.
//!
//! The zero-vector degraded fallback exists ONLY as the explicitly named
//! [`HttpEmbedder::embed_or_zero`] for non-critical paths such as
//! background warm-up. Retrieval-path callers use `embed`, which returns an
//! error on failure -- a silently substituted zero vector would corrupt
//! similarity ranking.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use eidolon_core::memory::embedder::Embedder;
use eidolon_types::config::EmbeddingSettings;
use eidolon_types::error::EmbeddingError;

use super::cache::EmbeddingCache;

/// HTTP client for the embedding server, with an LRU query-result cache.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    cache: EmbeddingCache,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            dimension: settings.dimension,
            cache: EmbeddingCache::new(settings.cache_capacity),
        }
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    async fn fetch_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Backend(format!(
                "embedding server returned {status}"
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Decode(e.to_string()))?;

        if body.embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                left: self.dimension,
                right: body.embedding.len(),
            });
        }

        Ok(body.embedding)
    }

    /// Degraded-fallback embedding for non-critical paths (e.g., cache
    /// warm-up): on any failure, logs and returns a zero vector of the
    /// configured dimension instead of erroring.
    pub async fn embed_or_zero(&self, text: &str) -> Vec<f32> {
        match self.embed(text).await {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!(error = %err, "Embedding failed on non-critical path, using zero vector");
                vec![0.0; self.dimension]
            }
        }
    }
}

impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(hit) = self.cache.get(text, &self.model) {
            return Ok(hit);
        }

        let vector = self.fetch_embedding(text).await?;
        self.cache.insert(text, &self.model, vector.clone());
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        // The wire contract is single-input; batch requests go out
        // sequentially and share the cache.
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
