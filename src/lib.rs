//! Kitchen Voice - voice command interpreter for a kitchen assistant
//!
//! This library provides the core of a hands-free cooking assistant:
//! - Rule-based intent classification of spoken commands
//! - Command execution against a shared kitchen context
//! - Priority speech output queue
//! - Continuous recognition session with auto-restart
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Recognition engine (STT)               │
//! └────────────────────┬────────────────────────────────┘
//!                      │ events
//! ┌────────────────────▼────────────────────────────────┐
//! │               RecognitionSession                    │
//! │   Idle → Starting → Listening → Stopping → Idle     │
//! └────────────────────┬────────────────────────────────┘
//!                      │ final transcripts
//! ┌────────────────────▼────────────────────────────────┐
//! │       IntentClassifier → CommandExecutor            │
//! │           mutates Kitchen, speaks replies           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │         SpeechQueue → Speech engine (TTS)           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod intent;
pub mod kitchen;
pub mod recipes;
pub mod recognition;
pub mod speech;

pub use config::Config;
pub use error::{Error, Result};
pub use executor::{CommandExecutor, CommandOutcome, SpokenResponse};
pub use intent::{Intent, ReadMode, RecipeKey, Section, classify};
pub use kitchen::{
    Kitchen, KitchenState, Notification, NotificationLevel, PantryItem, ShoppingItem, Timer,
    VoiceSessionState, spawn_timer_countdown,
};
pub use recipes::{Recipe, RecipeCatalog};
pub use recognition::{
    RecognitionEngine, RecognitionError, RecognitionEvent, RecognitionSession, SessionControl,
    SessionPhase, StdinRecognitionEngine,
};
pub use speech::{
    CommandSpeechEngine, ConsoleSpeechEngine, Priority, SpeechEngine, SpeechQueue,
    SpeechSettings, SpeechTicket,
};
