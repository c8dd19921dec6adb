//! Local Ollama inference backend.
//!
//! Sends requests to an Ollama server's `/api/generate` endpoint. The
//! non-streaming mode reads a single JSON body; the streaming mode reads
//! newline-delimited JSON objects and yields their `response` fragments.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use eidolon_core::llm::backend::InferenceBackend;
use eidolon_types::error::InferenceError;
use eidolon_types::llm::{
    BackendKind, BackendSettings, GenerationChunk, GenerationRequest, GenerationResponse,
};

/// Local-inference backend speaking the Ollama generate API.
pub struct OllamaBackend {
    client: reqwest::Client,
    name: String,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaStreamLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

impl OllamaBackend {
    /// Build a backend from its configuration entry.
    pub fn from_settings(settings: &BackendSettings) -> Self {
        Self::new(
            settings.name.clone(),
            settings.base_url.clone(),
            settings.model.clone(),
        )
    }

    pub fn new(name: String, base_url: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn body(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": stream,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        })
    }

    fn backend_error(&self, message: impl Into<String>) -> InferenceError {
        InferenceError::Backend {
            name: self.name.clone(),
            message: message.into(),
        }
    }
}

impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, InferenceError> {
        let response = self
            .client
            .post(self.url())
            .json(&self.body(request, false))
            .send()
            .await
            .map_err(|e| self.backend_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.backend_error(format!("HTTP {status}: {body}")));
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| self.backend_error(format!("invalid response body: {e}")))?;

        Ok(GenerationResponse {
            content: body.response,
            tokens_used: body.eval_count,
        })
    }

    fn stream(
        &self,
        request: GenerationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<GenerationChunk, InferenceError>> + Send + 'static>>
    {
        let request_builder = self.client.post(self.url()).json(&self.body(&request, true));
        let name = self.name.clone();

        Box::pin(async_stream::stream! {
            let response = match request_builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(InferenceError::Stream(format!("{name}: {e}")));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                yield Err(InferenceError::Stream(format!("{name}: HTTP {status}")));
                return;
            }

            // Ollama streams newline-delimited JSON objects.
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(part) = bytes.next().await {
                let part = match part {
                    Ok(part) => part,
                    Err(e) => {
                        yield Err(InferenceError::Stream(format!("{name}: {e}")));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&part));

                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<OllamaStreamLine>(line) {
                        Ok(parsed) => {
                            if !parsed.response.is_empty() {
                                yield Ok(GenerationChunk {
                                    content: parsed.response,
                                });
                            }
                            if parsed.done {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(InferenceError::Stream(format!(
                                "{name}: invalid stream line: {e}"
                            )));
                            return;
                        }
                    }
                }
            }
        })
    }
}
