//! Guided conversation engine
//!
//! A scripted dialogue runs as an explicit state machine: [`transition`] maps
//! `(state, event)` to a new state plus [`Effect`]s, and [`StepSequencer`]
//! carries those effects out against a simulated clock, the text revealer,
//! and the session store.

mod effect;
pub mod event;
pub mod resolver;
pub mod reveal;
mod sequencer;
pub mod state;
mod timing;
mod transition;

pub use effect::Effect;
pub use event::{Event, Timer};
pub use resolver::{Resolution, resolve};
pub use reveal::{RevealTick, TextRevealer, prefixes};
pub use sequencer::{ConversationView, ResponseTicket, StepSequencer, VoiceRequest};
pub use state::{ConversationState, Phase, UserChoice};
pub use timing::Timing;
pub use transition::transition;
