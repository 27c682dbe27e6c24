//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lyra_voice::voice::{
    GiggleCache, MemorySink, SpeechEngine, SpeechProvider, SpeechRequest, VoiceTable,
    samples_to_wav,
};
use lyra_voice::{Error, Result, Speaker};

/// Sample rate of scripted provider audio
pub const SAMPLE_RATE: u32 = 24_000;

/// Generate sine wave audio samples
#[must_use]
pub fn sine(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Root mean square level of a signal
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean.sqrt()
}

/// What the scripted provider saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Markup { document: String, voice: String },
    Plain { text: String, voice: String },
}

impl Seen {
    #[must_use]
    pub fn voice(&self) -> &str {
        match self {
            Self::Markup { voice, .. } | Self::Plain { voice, .. } => voice,
        }
    }
}

/// In-process speech provider answering with one second of tone
pub struct ScriptedProvider {
    markup: bool,
    fail: bool,
    audio: Vec<u8>,
    seen: Mutex<Vec<Seen>>,
}

impl ScriptedProvider {
    /// Markup-capable provider that always succeeds
    #[must_use]
    pub fn ok() -> Arc<Self> {
        Self::build(true, false)
    }

    /// Provider that only accepts plain text
    #[must_use]
    pub fn plain_only() -> Arc<Self> {
        Self::build(false, false)
    }

    /// Provider that rejects every request
    #[must_use]
    pub fn failing() -> Arc<Self> {
        Self::build(true, true)
    }

    fn build(markup: bool, fail: bool) -> Arc<Self> {
        let audio = samples_to_wav(&sine(220.0, 1.0, 0.5), SAMPLE_RATE).unwrap();
        Arc::new(Self {
            markup,
            fail,
            audio,
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Requests received so far
    #[must_use]
    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechProvider for ScriptedProvider {
    fn supports_markup(&self) -> bool {
        self.markup
    }

    async fn synthesize(&self, request: SpeechRequest<'_>) -> Result<Vec<u8>> {
        let seen = match request {
            SpeechRequest::Markup { document, voice } => Seen::Markup {
                document: document.to_string(),
                voice: voice.to_string(),
            },
            SpeechRequest::Plain { text, voice } => Seen::Plain {
                text: text.to_string(),
                voice: voice.to_string(),
            },
        };
        self.seen.lock().unwrap().push(seen);
        tokio::task::yield_now().await;

        if self.fail {
            return Err(Error::Provider("401 unauthorized".to_string()));
        }
        Ok(self.audio.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A seeded speaker over a scripted provider, caching under `cache_root`
#[must_use]
pub fn speaker(provider: Arc<ScriptedProvider>, cache_root: &Path, seed: u64) -> (Speaker, MemorySink) {
    let sink = MemorySink::new();
    let speaker = Speaker::new(
        SpeechEngine::new(provider),
        VoiceTable::default(),
        Arc::new(GiggleCache::with_defaults(cache_root.to_path_buf())),
        Box::new(sink.clone()),
    )
    .with_seed(seed);
    (speaker, sink)
}
