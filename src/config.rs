//! Configuration management for the kitchen voice assistant

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Kitchen voice assistant configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Voice output configuration
    pub voice: VoiceConfig,

    /// Session and speech queue timing
    pub timing: TimingConfig,

    /// Optional TOML recipe catalog replacing the built-in recipes
    pub recipes_path: Option<PathBuf>,
}

/// Which text-to-speech engine to drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineKind {
    /// Print utterances to the terminal
    #[default]
    Console,
    /// Run an external TTS program per utterance
    Command,
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "command" => Ok(Self::Command),
            other => Err(Error::Config(format!("unknown speech engine: {other}"))),
        }
    }
}

/// Voice output configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Recognition and synthesis language
    pub language: String,

    /// Speaking rate multiplier
    pub rate: f32,

    /// Pitch multiplier
    pub pitch: f32,

    /// Output volume (0.0 to 1.0)
    pub volume: f32,

    /// Text-to-speech engine
    pub engine: EngineKind,

    /// Program used by [`EngineKind::Command`]
    pub command: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
            engine: EngineKind::Console,
            command: "espeak".to_string(),
        }
    }
}

/// Session and speech queue timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    /// Delay between a start request and starting the recognition engine
    pub start_delay: Duration,

    /// Delay before restarting a recognition stream that ended on its own
    pub restart_delay: Duration,

    /// Pause between consecutive queued utterances
    pub utterance_gap: Duration,

    /// Timer countdown period
    pub tick_interval: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(500),
            restart_delay: Duration::from_millis(100),
            utterance_gap: Duration::from_millis(100),
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if an override names an unknown speech engine
    pub fn load() -> Result<Self> {
        Self::from_file_config(file::load_config_file())
    }

    /// Build configuration from a parsed config file plus env overrides
    ///
    /// # Errors
    ///
    /// Returns error if the configured speech engine is unknown
    pub fn from_file_config(fc: file::KitchenConfigFile) -> Result<Self> {
        let defaults = VoiceConfig::default();

        let engine = match env_var("KITCHEN_TTS_ENGINE").or(fc.voice.engine) {
            Some(name) => name.parse()?,
            None => defaults.engine,
        };

        let voice = VoiceConfig {
            language: env_var("KITCHEN_VOICE_LANGUAGE")
                .or(fc.voice.language)
                .unwrap_or(defaults.language),
            rate: env_parse("KITCHEN_VOICE_RATE")
                .or(fc.voice.rate)
                .unwrap_or(defaults.rate),
            pitch: fc.voice.pitch.unwrap_or(defaults.pitch),
            volume: fc.voice.volume.unwrap_or(defaults.volume).clamp(0.0, 1.0),
            engine,
            command: env_var("KITCHEN_TTS_COMMAND")
                .or(fc.voice.command)
                .unwrap_or(defaults.command),
        };

        let timing = TimingConfig::default();
        let timing = TimingConfig {
            start_delay: millis("KITCHEN_START_DELAY_MS", fc.timing.start_delay_ms)
                .unwrap_or(timing.start_delay),
            restart_delay: millis("KITCHEN_RESTART_DELAY_MS", fc.timing.restart_delay_ms)
                .unwrap_or(timing.restart_delay),
            utterance_gap: millis("KITCHEN_UTTERANCE_GAP_MS", fc.timing.utterance_gap_ms)
                .unwrap_or(timing.utterance_gap),
            tick_interval: millis("KITCHEN_TICK_INTERVAL_MS", fc.timing.tick_interval_ms)
                .filter(|d| !d.is_zero())
                .unwrap_or(timing.tick_interval),
        };

        let recipes_path = env_var("KITCHEN_RECIPES")
            .or(fc.recipes.path)
            .map(PathBuf::from);

        tracing::debug!(
            engine = ?voice.engine,
            language = %voice.language,
            rate = voice.rate,
            "configuration loaded"
        );

        Ok(Self {
            voice,
            timing,
            recipes_path,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_var(key).and_then(|v| v.trim().parse().ok())
}

fn millis(key: &str, file_value: Option<u64>) -> Option<Duration> {
    env_parse(key).or(file_value).map(Duration::from_millis)
}
