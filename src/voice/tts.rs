//! Text-to-speech (TTS) provider adapter

use std::sync::Arc;

use async_trait::async_trait;

use super::decode::decode;
use super::embellish::escape_xml;
use super::markup::{Markup, locale_of};
use super::waveform::Waveform;
use crate::{Error, Result};

/// What is sent to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechRequest<'a> {
    /// Full SSML document
    Markup { document: &'a str, voice: &'a str },
    /// Plain text spoken by a voice, no prosody control
    Plain { text: &'a str, voice: &'a str },
}

impl SpeechRequest<'_> {
    #[must_use]
    pub const fn voice(&self) -> &str {
        match self {
            Self::Markup { voice, .. } | Self::Plain { voice, .. } => *voice,
        }
    }
}

/// External speech synthesis provider
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Whether the provider accepts SSML documents
    fn supports_markup(&self) -> bool;

    /// Synthesize a request, returning encoded audio (WAV or MP3)
    ///
    /// # Errors
    ///
    /// Returns error on network, auth or request rejection
    async fn synthesize(&self, request: SpeechRequest<'_>) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Azure Cognitive Services neural voices (SSML)
pub struct AzureSpeech {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl AzureSpeech {
    /// Output format requested from the service
    pub const OUTPUT_FORMAT: &'static str = "riff-24khz-16bit-mono-pcm";

    /// Create a new Azure TTS instance for a region
    ///
    /// # Errors
    ///
    /// Returns error if API key or region is missing
    pub fn new(api_key: String, region: &str) -> Result<Self> {
        if region.is_empty() {
            return Err(Error::Config("Azure speech region required for TTS".to_string()));
        }
        let endpoint = format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1");
        Self::with_endpoint(api_key, endpoint)
    }

    /// Create a new Azure TTS instance against an explicit endpoint
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn with_endpoint(api_key: String, endpoint: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Azure speech key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint,
        })
    }
}

#[async_trait]
impl SpeechProvider for AzureSpeech {
    fn supports_markup(&self) -> bool {
        true
    }

    async fn synthesize(&self, request: SpeechRequest<'_>) -> Result<Vec<u8>> {
        let body = match request {
            SpeechRequest::Markup { document, .. } => document.to_string(),
            SpeechRequest::Plain { text, voice } => format!(
                "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"{}\">\
                 <voice name=\"{}\">{}</voice></speak>",
                locale_of(voice),
                escape_xml(voice),
                escape_xml(text)
            ),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", Self::OUTPUT_FORMAT)
            .header("User-Agent", "lyra-voice")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Azure TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    fn name(&self) -> &'static str {
        "azure"
    }
}

/// `OpenAI` speech endpoint (plain text only)
///
/// `OpenAI` voices are not per-language, so the request voice id is ignored in
/// favor of the configured voice.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    model: String,
}

impl OpenAiSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, voice: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            model,
        })
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeech {
    fn supports_markup(&self) -> bool {
        false
    }

    async fn synthesize(&self, request: SpeechRequest<'_>) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
        }

        let SpeechRequest::Plain { text, .. } = request else {
            return Err(Error::Provider("OpenAI TTS does not accept SSML".to_string()));
        };

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Sends markup (or plain text) to a provider and decodes the reply
#[derive(Clone)]
pub struct SpeechEngine {
    provider: Arc<dyn SpeechProvider>,
}

impl SpeechEngine {
    #[must_use]
    pub fn new(provider: Arc<dyn SpeechProvider>) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Whether requests carry the full markup document
    #[must_use]
    pub fn supports_markup(&self) -> bool {
        self.provider.supports_markup()
    }

    /// Synthesize an utterance
    ///
    /// Markup-capable providers get the full document; others get `plain` with
    /// the markup's voice. One attempt, no retry.
    ///
    /// # Errors
    ///
    /// Returns provider errors and `Error::Decode` for unreadable audio
    pub async fn synthesize(&self, markup: &Markup, plain: &str) -> Result<Waveform> {
        let request = if self.provider.supports_markup() {
            SpeechRequest::Markup {
                document: markup.as_str(),
                voice: markup.voice(),
            }
        } else {
            tracing::debug!(provider = self.provider.name(), "provider lacks SSML, sending plain text");
            SpeechRequest::Plain {
                text: plain,
                voice: markup.voice(),
            }
        };
        self.run(request).await
    }

    /// Synthesize plain text with a voice and no prosody control
    ///
    /// # Errors
    ///
    /// Returns provider errors and `Error::Decode` for unreadable audio
    pub async fn synthesize_text(&self, text: &str, voice: &str) -> Result<Waveform> {
        self.run(SpeechRequest::Plain { text, voice }).await
    }

    async fn run(&self, request: SpeechRequest<'_>) -> Result<Waveform> {
        let audio = self.provider.synthesize(request).await?;
        tracing::debug!(
            provider = self.provider.name(),
            voice = request.voice(),
            bytes = audio.len(),
            "synthesized speech"
        );
        decode(&audio)
    }
}
