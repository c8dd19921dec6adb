//! Pluggable message-sentiment classification.
//!
//! Maps free text to the numeric sentiment signal (-10.0 to 10.0) fed into
//! the affinity model. The mapping is deliberately a trait seam: the
//! default implementation asks the inference client for a rating, and any
//! failure -- backend down, unparsable reply -- degrades to the neutral
//! signal 0 rather than blocking the turn.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use eidolon_types::llm::GenerationOptions;

use crate::llm::fallback::MultiBackendClient;

/// Trait for turning a message into a sentiment signal in [-10, 10].
///
/// Empty or whitespace-only text must map to 0. Implementations never
/// error; uncertainty is expressed as the neutral signal.
pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> impl Future<Output = f64> + Send;
}

/// Object-safe version of [`SentimentClassifier`] with boxed futures.
pub trait SentimentClassifierDyn: Send + Sync {
    fn classify_boxed<'a>(&'a self, text: &'a str)
        -> Pin<Box<dyn Future<Output = f64> + Send + 'a>>;
}

/// Blanket implementation: any `SentimentClassifier` automatically
/// implements `SentimentClassifierDyn`.
impl<T: SentimentClassifier> SentimentClassifierDyn for T {
    fn classify_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = f64> + Send + 'a>> {
        Box::pin(self.classify(text))
    }
}

/// Type-erased sentiment classifier.
pub struct BoxSentimentClassifier {
    inner: Box<dyn SentimentClassifierDyn + Send + Sync>,
}

impl BoxSentimentClassifier {
    /// Wrap a concrete `SentimentClassifier` in a type-erased box.
    pub fn new<T: SentimentClassifier + 'static>(classifier: T) -> Self {
        Self {
            inner: Box::new(classifier),
        }
    }

    /// Classify a message into a sentiment signal in [-10, 10].
    pub async fn classify(&self, text: &str) -> f64 {
        self.inner.classify_boxed(text).await
    }
}

/// LLM-backed sentiment classifier.
///
/// Prompts the inference client for a bare number between -10 and 10.
/// Low temperature, tiny token cap: this is a classification call, not a
/// generation call.
pub struct LlmSentimentClassifier {
    client: Arc<MultiBackendClient>,
}

impl LlmSentimentClassifier {
    pub fn new(client: Arc<MultiBackendClient>) -> Self {
        Self { client }
    }

    fn prompt_for(text: &str) -> String {
        format!(
            "Rate the emotional tone of the following message as a single \
             number between -10 and 10, where negative numbers mean hostile \
             or unhappy, 0 means neutral, and positive numbers mean warm or \
             happy.\n\nMessage: \"{text}\"\n\nReply with the number only:"
        )
    }
}

impl SentimentClassifier for LlmSentimentClassifier {
    async fn classify(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let options = GenerationOptions {
            temperature: Some(0.1),
            max_tokens: Some(8),
        };

        match self.client.generate(&Self::prompt_for(text), options).await {
            Ok(outcome) => parse_rating(&outcome.response.content),
            Err(err) => {
                tracing::warn!(error = %err, "Sentiment classification failed, using neutral");
                0.0
            }
        }
    }
}

/// Parse the model's reply into a clamped rating; anything unparsable is
/// neutral.
fn parse_rating(reply: &str) -> f64 {
    let trimmed = reply.trim();
    // Models occasionally wrap the number in prose; take the first token
    // that parses.
    for token in trimmed.split_whitespace() {
        let cleaned = token.trim_matches(|c: char| !c.is_ascii_digit() && c != '-' && c != '.');
        if let Ok(value) = cleaned.parse::<f64>() {
            if value.is_finite() {
                return value.clamp(-10.0, 10.0);
            }
        }
    }
    tracing::warn!(reply = %trimmed, "Unparsable sentiment rating, using neutral");
    0.0
}
