//! Hosted OpenAI-compatible inference backend.
//!
//! Sends requests to `/v1/chat/completions` with bearer authentication.
//! Supports non-streaming (`generate`) and SSE streaming (`stream`) modes.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::pin::Pin;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use eidolon_core::llm::backend::InferenceBackend;
use eidolon_types::error::{ConfigError, InferenceError};
use eidolon_types::llm::{
    BackendKind, BackendSettings, GenerationChunk, GenerationRequest, GenerationResponse,
};

/// Hosted-API inference backend (OpenAI-compatible wire format).
pub struct HostedApiBackend {
    client: reqwest::Client,
    name: String,
    base_url: String,
    model: String,
    api_key: SecretString,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageBody,
}

#[derive(Deserialize)]
struct ChatMessageBody {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[derive(Deserialize)]
struct StreamChunkBody {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl HostedApiBackend {
    /// Build a backend from its configuration entry, resolving the API key
    /// from the configured environment variable. Missing or empty
    /// credentials fail fast with a `ConfigError`.
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, ConfigError> {
        let env_name =
            settings
                .api_key_env
                .as_deref()
                .ok_or_else(|| ConfigError::MissingCredentials {
                    backend: settings.name.clone(),
                })?;
        let key = std::env::var(env_name).ok().filter(|k| !k.is_empty()).ok_or_else(|| {
            ConfigError::MissingCredentials {
                backend: settings.name.clone(),
            }
        })?;

        Ok(Self::new(
            settings.name.clone(),
            settings.base_url.clone(),
            settings.model.clone(),
            SecretString::from(key),
        ))
    }

    pub fn new(name: String, base_url: String, model: String, api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn body(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": stream,
        })
    }

    fn backend_error(&self, message: impl Into<String>) -> InferenceError {
        InferenceError::Backend {
            name: self.name.clone(),
            message: message.into(),
        }
    }
}

impl InferenceBackend for HostedApiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Api
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, InferenceError> {
        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.body(request, false))
            .send()
            .await
            .map_err(|e| self.backend_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.backend_error(format!("HTTP {status}: {body}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.backend_error(format!("invalid response body: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| self.backend_error("response contained no choices"))?;

        Ok(GenerationResponse {
            content,
            tokens_used: body.usage.map(|u| u.total_tokens),
        })
    }

    fn stream(
        &self,
        request: GenerationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<GenerationChunk, InferenceError>> + Send + 'static>>
    {
        // Build the request up front so the stream owns everything it
        // needs and the key is exposed only here.
        let request_builder = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.body(&request, true));
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

            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => {
                        if event.data == "[DONE]" {
                            break;
                        }
                        match serde_json::from_str::<StreamChunkBody>(&event.data) {
                            Ok(chunk) => {
                                let content = chunk
                                    .choices
                                    .into_iter()
                                    .next()
                                    .and_then(|c| c.delta.content)
                                    .unwrap_or_default();
                                if !content.is_empty() {
                                    yield Ok(GenerationChunk { content });
                                }
                            }
                            Err(e) => {
                                yield Err(InferenceError::Stream(format!(
                                    "{name}: invalid stream chunk: {e}"
                                )));
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(InferenceError::Stream(format!("{name}: {e}")));
                        return;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_backend(server: &MockServer) -> HostedApiBackend {
        HostedApiBackend::new(
            "api".to_string(),
            server.uri(),
            "sonnet".to_string(),
            SecretString::from("test-key".to_string()),
        )
    }

    fn make_request() -> GenerationRequest {
        GenerationRequest {
            prompt: "Say hello".to_string(),
            temperature: 0.7,
            max_tokens: 64,
        }
    }

    #[tokio::test]
    async fn test_generate_parses_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "Hello!" } }],
                "usage": { "total_tokens": 17 }
            })))
            .mount(&server)
            .await;

        let backend = make_backend(&server);
        let response = backend.generate(&make_request()).await.unwrap();
        assert_eq!(response.content, "Hello!");
        assert_eq!(response.tokens_used, Some(17));
    }

    #[tokio::test]
    async fn test_generate_http_error_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let backend = make_backend(&server);
        let err = backend.generate(&make_request()).await.unwrap_err();
        match err {
            InferenceError::Backend { name, message } => {
                assert_eq!(name, "api");
                assert!(message.contains("503"));
            }
            other => panic!("expected backend error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_generate_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let backend = make_backend(&server);
        let err = backend.generate(&make_request()).await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn test_stream_concatenates_sse_fragments() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo!\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body),
            )
            .mount(&server)
            .await;

        let backend = make_backend(&server);
        let fragments: Vec<String> = backend
            .stream(make_request())
            .map(|r| r.unwrap().content)
            .collect()
            .await;
        assert_eq!(fragments.concat(), "Hello!");
    }

    #[tokio::test]
    async fn test_from_settings_requires_credentials() {
        let settings = BackendSettings {
            name: "api".to_string(),
            kind: BackendKind::Api,
            base_url: "https://llm.example.com".to_string(),
            model: "sonnet".to_string(),
            timeout_ms: 30_000,
            max_retries: 2,
            temperature: 0.7,
            api_key_env: None,
        };
        let result = HostedApiBackend::from_settings(&settings);
        assert!(matches!(
            result,
            Err(ConfigError::MissingCredentials { backend }) if backend == "api"
        ));
    }
}
