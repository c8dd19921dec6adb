//! Turn token-cost estimation.
//!
//! The exact cost function is deliberately a trait seam: the default is a
//! character-class estimator (CJK-aware, no tokenizer dependency), and a
//! tokenizer-backed estimator can replace it without touching the
//! lifecycle.

use eidolon_types::chat::ConversationState;

/// Estimates the token cost of one completed turn.
///
/// Object-safe (sync) so callers can hold it as `Arc<dyn TurnCostEstimator>`.
pub trait TurnCostEstimator: Send + Sync {
    fn estimate(&self, state: &ConversationState) -> u64;
}

/// Character-class token estimator.
///
/// Approximate per-character costs:
/// - CJK ideographs: 1.5 tokens
/// - CJK symbols/punctuation: 1.0 token
/// - ASCII: 0.25 tokens (roughly four characters per token)
/// - everything else: 0.5 tokens
///
/// A fixed response buffer is added per turn to account for the next
/// generation's headroom.
#[derive(Debug, Clone)]
pub struct CharacterCostEstimator {
    response_buffer: u64,
}

impl Default for CharacterCostEstimator {
    fn default() -> Self {
        Self {
            response_buffer: 1_000,
        }
    }
}

impl CharacterCostEstimator {
    pub fn new(response_buffer: u64) -> Self {
        Self { response_buffer }
    }
}

impl TurnCostEstimator for CharacterCostEstimator {
    fn estimate(&self, state: &ConversationState) -> u64 {
        let mut total = 0u64;

        total += estimate_tokens(state.prompt.as_deref().unwrap_or(&state.role_description));
        for message in &state.messages {
            total += estimate_tokens(&message.content);
        }
        for memory in &state.retrieved_memories {
            total += estimate_tokens(&memory.text);
        }
        total += estimate_tokens(&state.current_input);
        if let Some(response) = &state.generated_response {
            total += estimate_tokens(response);
        }

        total + self.response_buffer
    }
}

/// Estimate the token count of a text by character class.
pub fn estimate_tokens(text: &str) -> u64 {
    let mut tokens = 0.0f64;

    for ch in text.chars() {
        let code = ch as u32;
        tokens += match code {
            // CJK Unified Ideographs + Extension A + Extension B
            0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0x20000..=0x2A6DF => 1.5,
            // CJK symbols and punctuation
            0x3000..=0x303F => 1.0,
            // ASCII
            0x00..=0x7F => 0.25,
            // Other scripts, symbols, emoji
            _ => 0.5,
        };
    }

    tokens.ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use eidolon_types::chat::TurnMessage;
    use eidolon_types::persona::RelationType;
    use uuid::Uuid;

    #[test]
    fn test_estimate_tokens_ascii() {
        // 8 ASCII chars * 0.25 = 2
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn test_estimate_tokens_cjk() {
        // 4 ideographs * 1.5 = 6
        assert_eq!(estimate_tokens("你好世界"), 6);
    }

    #[test]
    fn test_estimate_tokens_mixed_rounds_up() {
        // "hi" = 0.5, "。" = 1.0 -> 1.5 -> ceil 2
        assert_eq!(estimate_tokens("hi。"), 2);
    }

    #[test]
    fn test_estimate_tokens_empty() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_estimator_sums_all_components() {
        let mut state = ConversationState::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            RelationType::Friend,
            "role",
            "aaaa",
        );
        state.prompt = Some("aaaaaaaa".to_string()); // 2 tokens
        state.messages.push(TurnMessage::user("bbbb")); // 1 token
        state.generated_response = Some("cccc".to_string()); // 1 token
        // current_input "aaaa" -> 1 token

        let estimator = CharacterCostEstimator::new(100);
        assert_eq!(estimator.estimate(&state), 100 + 2 + 1 + 1 + 1);
    }

    #[test]
    fn test_estimator_falls_back_to_role_description() {
        let state = ConversationState::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            RelationType::Friend,
            "rrrrrrrr", // 2 tokens
            "aaaa",     // 1 token
        );
        let estimator = CharacterCostEstimator::new(0);
        assert_eq!(estimator.estimate(&state), 3);
    }
}
