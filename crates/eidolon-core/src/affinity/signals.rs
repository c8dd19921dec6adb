//! Per-turn signal computation for the affinity model.
//!
//! These helpers derive the frequency, quality, and decay inputs of
//! [`AffinitySignals`] from observable conversation facts. Documented
//! ranges:
//! - frequency bonus: 0.0 to 1.0, awarded only when a conversation ends
//! - quality bonus: 0.0 to 2.0, from exchange depth and message substance
//! - decay: -10.0 to 0.0, from days since last contact

use chrono::{DateTime, Utc};

use eidolon_types::chat::{TurnMessage, TurnRole};

/// Frequency bonus for a finished conversation.
///
/// Early conversations are rewarded most; the bonus tapers as the
/// relationship accumulates history. Mid-conversation turns earn nothing.
pub fn frequency_bonus(total_conversations: u32, conversation_ended: bool) -> f64 {
    if !conversation_ended {
        return 0.0;
    }
    match total_conversations {
        0 => 1.0,
        1..=4 => 0.5,
        5..=9 => 0.3,
        _ => 0.2,
    }
}

/// Quality bonus from the depth and substance of the exchange so far.
///
/// Each user+assistant pair counts as one round: one round earns 0.2, three
/// rounds add 0.3, five add 0.5. When both sides of the latest exchange are
/// substantial (user > 20 chars, assistant > 50 chars), another 0.3 is
/// added. Capped at 2.0.
pub fn quality_bonus(messages: &[TurnMessage]) -> f64 {
    if messages.len() < 2 {
        return 0.0;
    }

    let rounds = messages.len() / 2;
    let mut bonus: f64 = 0.0;
    if rounds >= 1 {
        bonus += 0.2;
    }
    if rounds >= 3 {
        bonus += 0.3;
    }
    if rounds >= 5 {
        bonus += 0.5;
    }

    if messages.len() >= 4 {
        let user_len = messages
            .iter()
            .rev()
            .find(|m| m.role == TurnRole::User)
            .map_or(0, |m| m.content.chars().count());
        let assistant_len = messages
            .iter()
            .rev()
            .find(|m| m.role == TurnRole::Assistant)
            .map_or(0, |m| m.content.chars().count());
        if user_len > 20 && assistant_len > 50 {
            bonus += 0.3;
        }
    }

    bonus.min(2.0)
}

/// Staleness penalty from the time since the pair last talked.
///
/// Within 24 hours there is no decay; beyond that the penalty deepens in
/// steps down to -10.0 after a month of silence.
pub fn decay_penalty(last_contact: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(last) = last_contact else {
        return 0.0;
    };

    let days = (now - last).num_days();
    match days {
        i64::MIN..=0 => 0.0,
        1..=2 => -0.5,
        3..=6 => -1.0,
        7..=13 => -2.0,
        14..=29 => -5.0,
        _ => -10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn exchange(rounds: usize, user_len: usize, assistant_len: usize) -> Vec<TurnMessage> {
        let mut messages = Vec::new();
        for _ in 0..rounds {
            messages.push(TurnMessage::user("u".repeat(user_len)));
            messages.push(TurnMessage::assistant("a".repeat(assistant_len)));
        }
        messages
    }

    #[test]
    fn test_frequency_bonus_tapers() {
        assert!((frequency_bonus(0, true) - 1.0).abs() < f64::EPSILON);
        assert!((frequency_bonus(3, true) - 0.5).abs() < f64::EPSILON);
        assert!((frequency_bonus(7, true) - 0.3).abs() < f64::EPSILON);
        assert!((frequency_bonus(25, true) - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_frequency_bonus_only_on_conversation_end() {
        assert!(frequency_bonus(0, false).abs() < f64::EPSILON);
        assert!(frequency_bonus(100, false).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quality_bonus_grows_with_rounds() {
        assert!(quality_bonus(&[]).abs() < f64::EPSILON);
        let one = quality_bonus(&exchange(1, 5, 5));
        let three = quality_bonus(&exchange(3, 5, 5));
        let five = quality_bonus(&exchange(5, 5, 5));
        assert!(one < three);
        assert!(three < five);
        assert!((one - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quality_bonus_rewards_substantial_exchange() {
        let thin = quality_bonus(&exchange(3, 5, 5));
        let substantial = quality_bonus(&exchange(3, 30, 80));
        assert!((substantial - thin - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_quality_bonus_is_capped() {
        let bonus = quality_bonus(&exchange(50, 100, 200));
        assert!(bonus <= 2.0);
    }

    #[test]
    fn test_decay_penalty_steps() {
        let now = Utc::now();
        assert!(decay_penalty(None, now).abs() < f64::EPSILON);
        assert!(decay_penalty(Some(now - Duration::hours(3)), now).abs() < f64::EPSILON);
        assert!((decay_penalty(Some(now - Duration::days(1)), now) + 0.5).abs() < f64::EPSILON);
        assert!((decay_penalty(Some(now - Duration::days(4)), now) + 1.0).abs() < f64::EPSILON);
        assert!((decay_penalty(Some(now - Duration::days(8)), now) + 2.0).abs() < f64::EPSILON);
        assert!((decay_penalty(Some(now - Duration::days(20)), now) + 5.0).abs() < f64::EPSILON);
        assert!((decay_penalty(Some(now - Duration::days(45)), now) + 10.0).abs() < f64::EPSILON);
    }
}
