//! Quest Guide - scripted, voice-enabled guided conversations
//!
//! This library provides the core of the guide:
//! - A step sequencer that walks a fixed script, one prompt at a time
//! - Progressive text reveal and timed auto-advance
//! - Optional narration and spoken answers behind pluggable voice providers
//! - Persisted choice history per session
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Front ends                         │
//! │        Terminal chat  │  tests  │  embedders         │
//! └────────────────────┬────────────────────────────────┘
//!                      │ Command / ConversationView
//! ┌────────────────────▼────────────────────────────────┐
//! │                 GuideRuntime                         │
//! │   StepSequencer  │  TextRevealer  │  ChoiceResolver  │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │
//! ┌──────────▼──────────┐       ┌──────────▼────────────┐
//! │  VoiceSynthesizer   │       │    KeyValueStore      │
//! │  VoiceRecognizer    │       │  memory  │  SQLite    │
//! └─────────────────────┘       └───────────────────────┘
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod runtime;
pub mod script;
pub mod setup;
pub mod store;
pub mod terminal;
pub mod voice;

pub use config::Config;
pub use conversation::{
    ConversationState, ConversationView, Phase, Resolution, StepSequencer, TextRevealer, Timing,
    UserChoice, resolve,
};
pub use error::{Error, Result};
pub use runtime::{Command, GuideRuntime, Notice, RuntimeHandle};
pub use script::{Script, Step};
pub use store::{ChoiceHistory, KeyValueStore, MemoryStore, SqliteStore};
pub use voice::{ListenOutcome, SpeakOutcome, VoiceRecognizer, VoiceSynthesizer};
