//! Error types for the kitchen voice assistant

use thiserror::Error;

/// Result type alias for kitchen voice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the kitchen voice assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Text-to-speech playback error
    #[error("speech error: {0}")]
    Speech(String),

    /// Speech recognition engine error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Microphone access was refused
    #[error("microphone permission denied")]
    PermissionDenied,

    /// Speech recognition is not available in this runtime
    #[error("speech recognition not supported")]
    Unsupported,

    /// No recipe in the catalog matches
    #[error("recipe not found: {0}")]
    RecipeNotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
