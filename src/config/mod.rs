//! Configuration management for the Lyra voice pipeline

pub mod file;

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::voice::{
    AzureSpeech, DEFAULT_VARIANTS, GiggleCache, Language, OpenAiSpeech, SpeechProvider, VoiceTable,
};
use crate::{Error, Result};

use file::VoiceConfigFile;

/// Which speech provider synthesizes utterances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    /// Azure neural voices, SSML capable
    #[default]
    Azure,
    /// `OpenAI` speech, plain text only
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::UnknownTag {
                kind: "provider",
                value: other.to_string(),
            }),
        }
    }
}

/// Speech provider credentials and settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub provider: ProviderKind,

    /// Azure subscription key (`AZURE_SPEECH_KEY`)
    pub azure_key: Option<String>,

    /// Azure region (`AZURE_SPEECH_REGION`)
    pub azure_region: String,

    /// `OpenAI` API key (`OPENAI_API_KEY`)
    pub openai_key: Option<String>,

    pub openai_model: String,

    pub openai_voice: String,
}

/// Giggle cache settings
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub variants: usize,
    /// Phrases per language; unlisted languages use the defaults
    pub phrases: HashMap<Language, Vec<String>>,
}

/// Lyra voice configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub tts: TtsConfig,

    /// Language to voice id table
    pub voices: VoiceTable,

    pub cache: CacheConfig,

    /// Echo every utterance as a console line
    pub console_echo: bool,

    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is malformed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if the provider name or seed cannot be parsed
    pub fn from_sources<F>(fc: VoiceConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = env("LYRA_TTS_PROVIDER")
            .or(fc.tts.provider)
            .map(|p| p.parse())
            .transpose()?
            .unwrap_or_default();

        let tts = TtsConfig {
            provider,
            azure_key: env("AZURE_SPEECH_KEY").or(fc.tts.azure_key),
            azure_region: env("AZURE_SPEECH_REGION")
                .or(fc.tts.azure_region)
                .unwrap_or_else(|| "eastus".to_string()),
            openai_key: env("OPENAI_API_KEY").or(fc.tts.openai_key),
            openai_model: fc.tts.openai_model.unwrap_or_else(|| "tts-1".to_string()),
            openai_voice: fc.tts.openai_voice.unwrap_or_else(|| "nova".to_string()),
        };

        let cache_dir = env("LYRA_CACHE_DIR")
            .or(fc.cache.dir)
            .map_or_else(default_cache_dir, PathBuf::from);

        let cache = CacheConfig {
            dir: cache_dir,
            variants: fc.cache.variants.unwrap_or(DEFAULT_VARIANTS),
            phrases: fc.cache.phrases,
        };

        let console_echo = env("LYRA_CONSOLE_ECHO")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
            .or(fc.console_echo)
            .unwrap_or(false);

        let seed = match env("LYRA_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| Error::Config(format!("LYRA_SEED is not a number: {raw}")))?,
            ),
            None => fc.seed,
        };

        Ok(Self {
            tts,
            voices: VoiceTable::with_overrides(fc.voices),
            cache,
            console_echo,
            seed,
        })
    }

    /// Construct the configured speech provider
    ///
    /// # Errors
    ///
    /// Returns error if the provider's credentials are missing
    pub fn speech_provider(&self) -> Result<Arc<dyn SpeechProvider>> {
        match self.tts.provider {
            ProviderKind::Azure => {
                let key = self.tts.azure_key.clone().ok_or_else(|| {
                    Error::Config("AZURE_SPEECH_KEY not set".to_string())
                })?;
                Ok(Arc::new(AzureSpeech::new(key, &self.tts.azure_region)?))
            }
            ProviderKind::OpenAi => {
                let key = self.tts.openai_key.clone().ok_or_else(|| {
                    Error::Config("OPENAI_API_KEY not set".to_string())
                })?;
                Ok(Arc::new(OpenAiSpeech::new(
                    key,
                    self.tts.openai_voice.clone(),
                    self.tts.openai_model.clone(),
                )?))
            }
        }
    }

    /// Construct the giggle cache described by this config
    #[must_use]
    pub fn giggle_cache(&self) -> GiggleCache {
        GiggleCache::new(
            self.cache.dir.clone(),
            self.cache.phrases.clone(),
            self.cache.variants,
        )
    }
}

/// Default cache directory: `<data_dir>/lyra/giggles`
fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/lyra/giggles"),
        |d| d.data_dir().join("lyra").join("giggles"),
    )
}
