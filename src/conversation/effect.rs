//! Side effects requested by the transition function

use std::time::Duration;

use super::event::Timer;
use super::state::UserChoice;

/// Work the sequencer performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Drop pending timers, reveal and voice activity, and persisted history
    ResetSession,
    /// Fire `timer` after `after`
    Schedule { timer: Timer, after: Duration },
    /// Reveal text character by character
    StartReveal { text: String },
    /// Write a choice to the session store
    PersistChoice(UserChoice),
    /// Prompt is fully shown; narrate it if automatic narration is on
    OfferNarration { text: String },
    /// Narrate unconditionally
    Narrate { text: String },
    /// Abandon any voice capture in progress
    StopListening,
    /// Conversation reached its end
    Completed,
}
