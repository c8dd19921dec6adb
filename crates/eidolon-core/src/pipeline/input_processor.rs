//! Input processor node: trims the raw input and derives basic metadata.
//!
//! Empty input after trimming is the one hard failure in the pipeline --
//! it appends an error and halts, since every later node needs something
//! to work with.

use eidolon_types::chat::ConversationState;

use super::NodeOutcome;

pub(crate) fn run(state: &mut ConversationState) -> NodeOutcome {
    let trimmed = state.current_input.trim().to_string();

    if trimmed.is_empty() {
        state.record_error("empty input after trimming");
        tracing::debug!("Input processor halted on empty input");
        return NodeOutcome::Halt;
    }

    let word_count = trimmed.split_whitespace().count();
    let char_count = trimmed.chars().count();

    state.current_input = trimmed;
    state
        .metadata
        .insert("input_word_count".to_string(), word_count.into());
    state
        .metadata
        .insert("input_char_count".to_string(), char_count.into());

    NodeOutcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use eidolon_types::persona::RelationType;
    use uuid::Uuid;

    fn state_with_input(input: &str) -> ConversationState {
        ConversationState::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            RelationType::Friend,
            "role",
            input,
        )
    }

    #[test]
    fn test_trims_and_counts() {
        let mut state = state_with_input("  hello wide world \n");
        assert_eq!(run(&mut state), NodeOutcome::Continue);
        assert_eq!(state.current_input, "hello wide world");
        assert_eq!(state.metadata["input_word_count"], 3);
        assert_eq!(state.metadata["input_char_count"], 16);
    }

    #[test]
    fn test_empty_input_halts() {
        let mut state = state_with_input(" \t ");
        assert_eq!(run(&mut state), NodeOutcome::Halt);
        assert!(state.has_errors());
    }

    #[test]
    fn test_cjk_char_count() {
        let mut state = state_with_input("你好");
        assert_eq!(run(&mut state), NodeOutcome::Continue);
        assert_eq!(state.metadata["input_char_count"], 2);
        assert_eq!(state.metadata["input_word_count"], 1);
    }
}
