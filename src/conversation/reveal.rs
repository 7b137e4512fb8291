//! Incremental text reveal
//!
//! Shows a message one character at a time. The revealer itself holds no
//! timer; its owner schedules one `tick` per cadence interval and passes back
//! the generation it was given, so ticks belonging to a replaced reveal are
//! recognised and dropped.

use std::time::Duration;

/// Default delay between characters
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(30);

/// Result of advancing a reveal by one character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealTick {
    /// One more character is visible; schedule another tick
    Progress,
    /// The full text is now visible; reported once per reveal
    Finished,
    /// Tick belongs to a cancelled or already finished reveal
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevealState {
    Idle,
    Running,
    Finished,
    Cancelled,
}

/// Cancellable, restartable character-by-character reveal
#[derive(Debug, Clone)]
pub struct TextRevealer {
    cadence: Duration,
    text: String,
    shown_bytes: usize,
    generation: u64,
    state: RevealState,
}

impl TextRevealer {
    /// Create a revealer with the given per-character delay
    #[must_use]
    pub const fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            text: String::new(),
            shown_bytes: 0,
            generation: 0,
            state: RevealState::Idle,
        }
    }

    /// Begin revealing `text` from empty, cancelling any reveal in progress
    ///
    /// Returns the generation to pass to [`tick`](Self::tick).
    pub fn reveal(&mut self, text: &str) -> u64 {
        if self.state == RevealState::Running {
            tracing::trace!(generation = self.generation, "superseding reveal");
        }

        self.generation += 1;
        self.text = text.to_string();
        self.shown_bytes = 0;
        self.state = RevealState::Running;
        self.generation
    }

    /// Show the next character of the reveal with this generation
    pub fn tick(&mut self, generation: u64) -> RevealTick {
        if generation != self.generation || self.state != RevealState::Running {
            return RevealTick::Stale;
        }

        if let Some(c) = self.text[self.shown_bytes..].chars().next() {
            self.shown_bytes += c.len_utf8();
        }

        if self.shown_bytes >= self.text.len() {
            self.state = RevealState::Finished;
            RevealTick::Finished
        } else {
            RevealTick::Progress
        }
    }

    /// Stop the current reveal; its completion will never be reported
    pub fn cancel(&mut self) {
        if self.state == RevealState::Running {
            self.state = RevealState::Cancelled;
            tracing::trace!(generation = self.generation, "reveal cancelled");
        }
    }

    /// Return to the initial empty state
    pub fn clear(&mut self) {
        self.cancel();
        self.text.clear();
        self.shown_bytes = 0;
        self.state = RevealState::Idle;
    }

    /// Currently visible prefix
    #[must_use]
    pub fn visible(&self) -> &str {
        &self.text[..self.shown_bytes]
    }

    /// Whether the current reveal has shown its whole text
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == RevealState::Finished
    }

    /// Generation of the current reveal
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Delay between characters
    #[must_use]
    pub const fn cadence(&self) -> Duration {
        self.cadence
    }
}

impl Default for TextRevealer {
    fn default() -> Self {
        Self::new(DEFAULT_CADENCE)
    }
}

/// Lazy sequence of growing prefixes of `text`, one character longer each step
#[must_use]
pub fn prefixes(text: &str) -> Prefixes<'_> {
    Prefixes { text, end: 0 }
}

/// Iterator returned by [`prefixes`]
#[derive(Debug, Clone)]
pub struct Prefixes<'a> {
    text: &'a str,
    end: usize,
}

impl<'a> Iterator for Prefixes<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.text[self.end..].chars().next()?;
        self.end += c.len_utf8();
        Some(&self.text[..self.end])
    }
}
