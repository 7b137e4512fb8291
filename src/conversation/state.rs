//! Conversation state owned by the step sequencer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the conversation currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Not started
    #[default]
    Idle,
    /// Current step's prompt is being typed out
    Revealing,
    /// Prompt fully shown, waiting for the user's answer
    AwaitingResponse,
    /// Answer recorded, pausing before the next step
    Resolving,
    /// Step without options shown, pausing before moving on
    AutoAdvancing,
    /// All steps done
    Completed,
}

impl Phase {
    /// Phase name for logs and display
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Revealing => "revealing",
            Self::AwaitingResponse => "awaiting_response",
            Self::Resolving => "resolving",
            Self::AutoAdvancing => "auto_advancing",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's resolved answer to one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChoice {
    pub step_index: usize,
    pub choice_text: String,
    /// Unix epoch for records written without a timestamp
    #[serde(default)]
    pub recorded_at: DateTime<Utc>,
}

impl UserChoice {
    /// Record a choice for a step at the current time
    #[must_use]
    pub fn new(step_index: usize, choice_text: impl Into<String>) -> Self {
        Self {
            step_index,
            choice_text: choice_text.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Mutable state of one conversation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub current_index: usize,
    pub history: Vec<UserChoice>,
    pub phase: Phase,
}

impl ConversationState {
    /// Whether a choice has already been recorded for the given step
    #[must_use]
    pub fn has_choice_for(&self, step_index: usize) -> bool {
        self.history.iter().any(|c| c.step_index == step_index)
    }

    /// Whether the conversation has reached its terminal phase
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_serializes_camel_case() {
        let choice = UserChoice::new(1, "⚡ Anxious energy coursing through me");
        let json = serde_json::to_value(&choice).unwrap();

        assert_eq!(json["stepIndex"], 1);
        assert_eq!(json["choiceText"], "⚡ Anxious energy coursing through me");
        assert!(json.get("recordedAt").is_some());
    }

    #[test]
    fn test_default_state_is_idle() {
        let state = ConversationState::default();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.current_index, 0);
        assert!(state.history.is_empty());
    }
}
