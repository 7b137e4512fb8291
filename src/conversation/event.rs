//! Inputs to the conversation transition function

use chrono::{DateTime, Utc};

/// Named delays the sequencer schedules on its clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Typing indicator done; start revealing the current prompt
    BeginReveal,
    /// Step without options has been on screen long enough
    AutoAdvance,
    /// Post-answer pause done
    AdvanceAfterChoice,
}

/// Something that happened to the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin a new conversation run
    Start,
    /// The current prompt is fully visible
    RevealFinished,
    /// User answered, by selection or by voice
    Submit { text: String, at: DateTime<Utc> },
    /// A scheduled delay elapsed
    TimerFired(Timer),
}
