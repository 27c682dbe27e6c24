//! Error types for the Lyra voice core

use thiserror::Error;

/// Result type alias for Lyra voice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the speech pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech provider rejected or failed the request (network, auth, unsupported markup)
    #[error("provider error: {0}")]
    Provider(String),

    /// Returned audio could not be decoded into a waveform
    #[error("decode error: {0}")]
    Decode(String),

    /// A post-processing stage failed
    #[error("effect error in {stage}: {reason}")]
    Effect {
        /// Stage that failed
        stage: &'static str,
        /// Failure description
        reason: String,
    },

    /// Persisting a cache entry failed
    #[error("cache write error for {path}: {reason}")]
    CacheWrite {
        /// Target path of the entry
        path: String,
        /// Failure description
        reason: String,
    },

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Unknown tag supplied for a closed set (language, effect)
    #[error("unknown {kind}: {value}")]
    UnknownTag {
        /// Tag family
        kind: &'static str,
        /// Rejected value
        value: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Build an effect error for a named stage
    pub fn effect(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Effect {
            stage,
            reason: reason.into(),
        }
    }

    /// Whether the error came from the synthesis provider (including transport)
    #[must_use]
    pub const fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Http(_))
    }
}
