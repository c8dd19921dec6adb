//! Role composer node: merges role description, retrieved memories, and
//! the affinity tier into one structured generation prompt.

use eidolon_types::affinity::AffinityTier;
use eidolon_types::chat::ConversationState;

/// Most recent history turns included verbatim in the prompt.
const HISTORY_WINDOW: usize = 10;

pub(crate) fn run(state: &mut ConversationState) {
    let mut prompt = String::new();

    prompt.push_str("## Who you are\n");
    prompt.push_str(&state.role_description);
    prompt.push('\n');

    prompt.push_str("\n## Relationship\n");
    prompt.push_str(&format!(
        "You are talking with a {}.",
        state.relation_type
    ));
    if let Some(score) = state.affinity_score {
        prompt.push_str(&format!(" Your affinity with them is {score:.0}/100. "));
    } else {
        prompt.push(' ');
    }
    prompt.push_str(tone_guidance(state.affinity_tier));
    prompt.push('\n');

    if !state.retrieved_memories.is_empty() {
        prompt.push_str("\n## Things you remember\n");
        for memory in &state.retrieved_memories {
            prompt.push_str("- ");
            prompt.push_str(&memory.text.replace('\n', " "));
            prompt.push('\n');
        }
    }

    if !state.messages.is_empty() {
        prompt.push_str("\n## Recent conversation\n");
        let start = state.messages.len().saturating_sub(HISTORY_WINDOW);
        for message in &state.messages[start..] {
            prompt.push_str(&format!("{}: {}\n", message.role, message.content));
        }
    }

    prompt.push_str(&format!(
        "\n## Current message\n{}\n\nAnswer in character, consistent with your memories and the relationship.",
        state.current_input
    ));

    state.prompt = Some(prompt);
}

/// Tone instruction per affinity tier; neutral when no score was loaded.
fn tone_guidance(tier: Option<AffinityTier>) -> &'static str {
    match tier {
        Some(AffinityTier::Low) => "Stay polite but reserved, as with someone you barely know.",
        Some(AffinityTier::Medium) => "Be friendly and open, as with a familiar acquaintance.",
        Some(AffinityTier::High) => {
            "Speak warmly and freely, as with a close friend you trust."
        }
        None => "Keep a neutral, courteous tone.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eidolon_types::chat::TurnMessage;
    use eidolon_types::memory::ScoredChunk;
    use eidolon_types::persona::RelationType;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn base_state() -> ConversationState {
        ConversationState::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            RelationType::Friend,
            "A sailor who has seen every port on the Baltic.",
            "Where did you sail last?",
        )
    }

    #[test]
    fn test_prompt_contains_all_sections() {
        let mut state = base_state();
        state.affinity_score = Some(75.0);
        state.affinity_tier = Some(AffinityTier::High);
        state.retrieved_memories.push(ScoredChunk {
            id: "m".to_string(),
            text: "Question: Favorite port?\nAnswer: Riga, in autumn.".to_string(),
            metadata: HashMap::new(),
            similarity: 0.9,
        });
        state.messages.push(TurnMessage::user("Hello"));

        run(&mut state);
        let prompt = state.prompt.unwrap();

        assert!(prompt.contains("every port on the Baltic"));
        assert!(prompt.contains("talking with a friend"));
        assert!(prompt.contains("75/100"));
        assert!(prompt.contains("close friend"));
        assert!(prompt.contains("Riga, in autumn"));
        assert!(prompt.contains("user: Hello"));
        assert!(prompt.contains("Where did you sail last?"));
    }

    #[test]
    fn test_prompt_without_memories_or_score() {
        let mut state = base_state();
        run(&mut state);
        let prompt = state.prompt.unwrap();

        assert!(!prompt.contains("Things you remember"));
        assert!(prompt.contains("neutral, courteous tone"));
    }

    #[test]
    fn test_history_window_limits_old_turns() {
        let mut state = base_state();
        for i in 0..30 {
            state.messages.push(TurnMessage::user(format!("msg {i}")));
        }
        run(&mut state);
        let prompt = state.prompt.unwrap();

        assert!(!prompt.contains("msg 0"));
        assert!(prompt.contains("msg 29"));
    }

    #[test]
    fn test_memory_newlines_flattened() {
        let mut state = base_state();
        state.retrieved_memories.push(ScoredChunk {
            id: "m".to_string(),
            text: "Question: A?\nAnswer: B.".to_string(),
            metadata: HashMap::new(),
            similarity: 0.5,
        });
        run(&mut state);
        let prompt = state.prompt.unwrap();
        assert!(prompt.contains("- Question: A? Answer: B."));
    }
}
