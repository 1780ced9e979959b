//! TOML configuration file loading
//!
//! Supports `~/.config/kitchen-voice/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct KitchenConfigFile {
    /// Voice output configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Session and queue timing
    #[serde(default)]
    pub timing: TimingFileConfig,

    /// Recipe catalog configuration
    #[serde(default)]
    pub recipes: RecipesFileConfig,
}

/// Voice output configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Recognition and synthesis language (e.g. "en-US")
    pub language: Option<String>,

    /// Speaking rate multiplier
    pub rate: Option<f32>,

    /// Pitch multiplier
    pub pitch: Option<f32>,

    /// Output volume (0.0 to 1.0)
    pub volume: Option<f32>,

    /// Speech engine ("console" or "command")
    pub engine: Option<String>,

    /// Program used by the command engine (e.g. "espeak")
    pub command: Option<String>,
}

/// Timing configuration, all values in milliseconds
#[derive(Debug, Default, Deserialize)]
pub struct TimingFileConfig {
    pub start_delay_ms: Option<u64>,
    pub restart_delay_ms: Option<u64>,
    pub utterance_gap_ms: Option<u64>,
    pub tick_interval_ms: Option<u64>,
}

/// Recipe catalog configuration
#[derive(Debug, Default, Deserialize)]
pub struct RecipesFileConfig {
    /// Path to a TOML recipe catalog replacing the built-in one
    pub path: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `KitchenConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> KitchenConfigFile {
    config_file_path().map_or_else(KitchenConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_from(path: &Path) -> KitchenConfigFile {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return KitchenConfigFile::default(),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "config file unreadable, using defaults"
            );
            return KitchenConfigFile::default();
        }
    };

    toml::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "invalid config file, using defaults"
        );
        KitchenConfigFile::default()
    })
}

/// Return the config file path: `~/.config/kitchen-voice/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("kitchen-voice").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let fc: KitchenConfigFile = toml::from_str(
            r#"
            [voice]
            rate = 1.2
            engine = "command"

            [timing]
            restart_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(fc.voice.rate, Some(1.2));
        assert_eq!(fc.voice.engine.as_deref(), Some("command"));
        assert_eq!(fc.voice.language, None);
        assert_eq!(fc.timing.restart_delay_ms, Some(250));
        assert!(fc.recipes.path.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let fc = load_config_from(Path::new("/nonexistent/kitchen-voice/config.toml"));
        assert!(fc.voice.engine.is_none());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("kitchen-voice-{}.toml", std::process::id()));
        std::fs::write(&path, "[voice\nrate = ").unwrap();

        let fc = load_config_from(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(fc.voice.rate.is_none());
    }
}
