//! Delays that pace the conversation

use std::time::Duration;

use super::reveal::DEFAULT_CADENCE;

/// Pauses between conversation turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Typing indicator shown before a prompt starts revealing
    pub typing_delay: Duration,
    /// Delay between revealed characters
    pub reveal_cadence: Duration,
    /// Pause after a step without options before moving on
    pub auto_advance_delay: Duration,
    /// Pause after an answer is recorded before the next step
    pub choice_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            typing_delay: Duration::from_millis(1500),
            reveal_cadence: DEFAULT_CADENCE,
            auto_advance_delay: Duration::from_millis(2000),
            choice_delay: Duration::from_millis(1000),
        }
    }
}

impl Timing {
    /// All delays zero; turns advance as soon as time is advanced at all
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            typing_delay: Duration::ZERO,
            reveal_cadence: Duration::ZERO,
            auto_advance_delay: Duration::ZERO,
            choice_delay: Duration::ZERO,
        }
    }
}
