//! TOML configuration file loading
//!
//! Supports `~/.config/lyra/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::voice::Language;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoiceConfigFile {
    /// Speech synthesis settings
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Language to provider voice id (e.g. `en = "en-GB-SoniaNeural"`)
    #[serde(default)]
    pub voices: HashMap<Language, String>,

    /// Giggle cache settings
    #[serde(default)]
    pub cache: CacheFileConfig,

    /// Echo every utterance to the console as text
    pub console_echo: Option<bool>,

    /// Fixed RNG seed for reproducible embellishment
    pub seed: Option<u64>,
}

/// Speech provider configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// "azure" or "openai"
    pub provider: Option<String>,

    pub azure_key: Option<String>,

    /// Azure region (e.g. "eastus")
    pub azure_region: Option<String>,

    pub openai_key: Option<String>,

    /// `OpenAI` TTS model (e.g. "tts-1")
    pub openai_model: Option<String>,

    /// `OpenAI` voice (e.g. "nova")
    pub openai_voice: Option<String>,
}

/// Giggle cache configuration
#[derive(Debug, Default, Deserialize)]
pub struct CacheFileConfig {
    /// Cache directory
    pub dir: Option<String>,

    /// Prosody variants per phrase
    pub variants: Option<usize>,

    /// Phrases per language
    #[serde(default)]
    pub phrases: HashMap<Language, Vec<String>>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VoiceConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VoiceConfigFile {
    let Some(path) = config_file_path() else {
        return VoiceConfigFile::default();
    };

    load_from(&path)
}

/// Load a config file from an explicit path, falling back to defaults
pub fn load_from(path: &Path) -> VoiceConfigFile {
    if !path.exists() {
        return VoiceConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match parse(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VoiceConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VoiceConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the contents are not valid TOML for this schema
pub fn parse(content: &str) -> Result<VoiceConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/lyra/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("lyra").join("config.toml"))
}
