//! Step sequencer
//!
//! Owns the conversation state, a simulated clock, and the queue of pending
//! timers. Every change to the state goes through [`transition`]; this type
//! only carries out the resulting effects. Callers drive time explicitly with
//! [`StepSequencer::advance_to`], which lets tests run a whole conversation
//! without sleeping and lets the async runtime map the clock onto real time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::effect::Effect;
use super::event::{Event, Timer};
use super::reveal::{RevealTick, TextRevealer};
use super::state::{ConversationState, Phase, UserChoice};
use super::timing::Timing;
use super::transition::transition;
use crate::script::{Script, Step};
use crate::store::{ChoiceHistory, KeyValueStore};

/// Request for the voice channels, drained by whoever owns them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceRequest {
    /// Narrate text, superseding any narration in progress
    Speak(String),
    /// Stop any voice capture in progress
    StopListening,
    /// Stop all narration and capture
    StopAll,
}

/// Identifies the step an asynchronous answer was requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTicket {
    epoch: u64,
    step_index: usize,
}

impl ResponseTicket {
    /// Step the ticket was issued for
    #[must_use]
    pub const fn step_index(&self) -> usize {
        self.step_index
    }
}

/// Snapshot of everything a front end needs to draw the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    pub phase: Phase,
    pub step_index: usize,
    pub step_count: usize,
    /// Full prompt of the current step
    pub prompt: Option<String>,
    /// Part of the current prompt (or closing line) visible so far
    pub revealed: String,
    /// Typing indicator is showing
    pub typing: bool,
    /// Suggested answers for the current step
    pub options: Vec<String>,
    /// Answers are currently accepted
    pub accepting_response: bool,
    pub history: Vec<UserChoice>,
    /// Closing line, once the conversation is complete
    pub closing: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Transition(Timer),
    RevealTick(u64),
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due: Duration,
    seq: u64,
    pending: Pending,
}

/// Drives a scripted conversation from the first step to completion
pub struct StepSequencer {
    script: Script,
    timing: Timing,
    store: Arc<dyn KeyValueStore>,
    state: ConversationState,
    revealer: TextRevealer,
    typing: bool,
    auto_narrate: bool,
    clock: Duration,
    timers: Vec<Scheduled>,
    next_seq: u64,
    epoch: u64,
    voice_requests: Vec<VoiceRequest>,
}

impl StepSequencer {
    /// Create an idle sequencer
    #[must_use]
    pub fn new(script: Script, store: Arc<dyn KeyValueStore>, timing: Timing) -> Self {
        Self {
            script,
            revealer: TextRevealer::new(timing.reveal_cadence),
            timing,
            store,
            state: ConversationState::default(),
            typing: false,
            auto_narrate: false,
            clock: Duration::ZERO,
            timers: Vec::new(),
            next_seq: 0,
            epoch: 0,
            voice_requests: Vec::new(),
        }
    }

    /// Narrate each prompt as soon as it is fully revealed
    #[must_use]
    pub const fn with_auto_narration(mut self, enabled: bool) -> Self {
        self.auto_narrate = enabled;
        self
    }

    /// Start a fresh conversation at the first step
    ///
    /// Does nothing if the conversation is already at its first step.
    pub fn start(&mut self) {
        self.dispatch(Event::Start);
    }

    /// Answer the current step
    ///
    /// Returns whether the answer was recorded. Answers outside the
    /// awaiting-response phase are ignored.
    pub fn submit_choice(&mut self, text: &str) -> bool {
        let before = self.state.history.len();
        self.dispatch(Event::Submit {
            text: text.to_string(),
            at: Utc::now(),
        });
        self.state.history.len() > before
    }

    /// Answer a step that was current when `ticket` was issued
    ///
    /// Late answers for a step the conversation has moved past, or from a
    /// previous run, are dropped.
    pub fn submit_for(&mut self, ticket: ResponseTicket, text: &str) -> bool {
        if self.response_ticket() != Some(ticket) {
            tracing::debug!(
                step = ticket.step_index,
                "dropping answer for a step that is no longer current"
            );
            return false;
        }
        self.submit_choice(text)
    }

    /// Ticket for the step currently awaiting an answer
    #[must_use]
    pub fn response_ticket(&self) -> Option<ResponseTicket> {
        (self.state.phase == Phase::AwaitingResponse).then_some(ResponseTicket {
            epoch: self.epoch,
            step_index: self.state.current_index,
        })
    }

    /// Read-only snapshot for rendering
    #[must_use]
    pub fn current_view(&self) -> ConversationView {
        let completed = self.state.is_completed();
        let step = if completed {
            None
        } else {
            self.current_step()
        };

        ConversationView {
            phase: self.state.phase,
            step_index: self.state.current_index,
            step_count: self.script.len(),
            prompt: step.map(|s| s.prompt_text().to_string()),
            revealed: self.revealer.visible().to_string(),
            typing: self.typing,
            options: step.map(|s| s.options().to_vec()).unwrap_or_default(),
            accepting_response: self.state.phase == Phase::AwaitingResponse,
            history: self.state.history.clone(),
            closing: if completed {
                self.script.closing().map(ToString::to_string)
            } else {
                None
            },
        }
    }

    /// Text a manual "read this aloud" request should narrate
    #[must_use]
    pub fn narration_text(&self) -> Option<String> {
        match self.state.phase {
            Phase::Idle => None,
            Phase::Completed => self.script.closing().map(ToString::to_string),
            _ if self.revealer.visible().is_empty() => None,
            _ => self.current_step().map(|s| s.prompt_text().to_string()),
        }
    }

    /// Take the voice requests produced since the last call
    pub fn take_voice_requests(&mut self) -> Vec<VoiceRequest> {
        std::mem::take(&mut self.voice_requests)
    }

    /// Current conversation state
    #[must_use]
    pub const fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Choices recorded in this run
    #[must_use]
    pub fn history(&self) -> &[UserChoice] {
        &self.state.history
    }

    /// Script being played
    #[must_use]
    pub const fn script(&self) -> &Script {
        &self.script
    }

    /// Time elapsed on the sequencer clock
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock
    }

    /// When the earliest pending timer is due, if any
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Whether any timer is pending
    #[must_use]
    pub fn has_pending_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    /// Move the clock forward by `delta`, firing due timers in order
    pub fn advance_by(&mut self, delta: Duration) {
        self.advance_to(self.clock + delta);
    }

    /// Move the clock to `target`, firing due timers in order
    pub fn advance_to(&mut self, target: Duration) {
        while let Some(timer) = self.pop_due(target) {
            self.clock = self.clock.max(timer.due);
            self.fire(timer.pending);
        }
        self.clock = self.clock.max(target);
    }

    /// Fire timers until none are pending
    ///
    /// Stops when the conversation waits for an answer or has completed and
    /// finished revealing its closing line.
    pub fn settle(&mut self) {
        while let Some(due) = self.next_deadline() {
            self.advance_to(due);
        }
    }

    fn current_step(&self) -> Option<&Step> {
        self.script.step(self.state.current_index)
    }

    fn pop_due(&mut self, target: Duration) -> Option<Scheduled> {
        let position = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= target)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        Some(self.timers.swap_remove(position))
    }

    fn schedule(&mut self, after: Duration, pending: Pending) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Scheduled {
            due: self.clock + after,
            seq,
            pending,
        });
    }

    fn fire(&mut self, pending: Pending) {
        match pending {
            Pending::Transition(timer) => self.dispatch(Event::TimerFired(timer)),
            Pending::RevealTick(generation) => match self.revealer.tick(generation) {
                RevealTick::Progress => {
                    self.schedule(self.revealer.cadence(), Pending::RevealTick(generation));
                }
                RevealTick::Finished => self.dispatch(Event::RevealFinished),
                RevealTick::Stale => {}
            },
        }
    }

    fn dispatch(&mut self, event: Event) {
        let (next, effects) = transition(&self.state, event, &self.script, &self.timing);

        if next.phase != self.state.phase || next.current_index != self.state.current_index {
            tracing::debug!(
                from = %self.state.phase,
                to = %next.phase,
                step = next.current_index,
                "conversation transition"
            );
        }

        self.state = next;
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::ResetSession => {
                self.timers.clear();
                self.revealer.clear();
                self.typing = false;
                self.epoch += 1;
                self.voice_requests.clear();
                self.voice_requests.push(VoiceRequest::StopAll);

                if let Err(e) = ChoiceHistory::new(self.store.as_ref()).clear() {
                    tracing::warn!(error = %e, "failed to clear persisted history");
                }
                tracing::info!(script = self.script.id(), "conversation started");
            }
            Effect::Schedule { timer, after } => {
                if timer == Timer::BeginReveal {
                    self.typing = true;
                    self.revealer.clear();
                }
                self.schedule(after, Pending::Transition(timer));
            }
            Effect::StartReveal { text } => {
                self.typing = false;
                let generation = self.revealer.reveal(&text);
                self.schedule(self.revealer.cadence(), Pending::RevealTick(generation));
            }
            Effect::PersistChoice(choice) => {
                // History in memory stays authoritative if the store fails
                if let Err(e) = ChoiceHistory::new(self.store.as_ref()).append(&choice) {
                    tracing::warn!(
                        step = choice.step_index,
                        error = %e,
                        "failed to persist choice"
                    );
                }
            }
            Effect::OfferNarration { text } => {
                if self.auto_narrate {
                    self.voice_requests.push(VoiceRequest::Speak(text));
                }
            }
            Effect::Narrate { text } => {
                self.voice_requests.push(VoiceRequest::Speak(text));
            }
            Effect::StopListening => {
                self.voice_requests.push(VoiceRequest::StopListening);
            }
            Effect::Completed => {
                self.revealer.clear();
                tracing::info!(
                    choices = self.state.history.len(),
                    "conversation completed"
                );
            }
        }
    }
}
