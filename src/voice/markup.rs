//! Provider-facing speech markup
//!
//! Builds an SSML document: voice selection wrapping a coarse prosody envelope
//! wrapping the embellished text. The prosody table here is keyed by emotion
//! but is separate from [`EmotionProfile`](super::profile::EmotionProfile); the
//! provider applies these hints and the post-processor applies the profile on
//! top, so both adjustments stack.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::embellish::{EmbellishedText, escape_xml};
use super::language::{Effect, Language};
use super::profile::Emotion;

/// Volume reduction applied by the whisper effect, in dB
pub const WHISPER_VOLUME_DB: f32 = -8.0;

/// Language to provider voice id table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTable {
    voices: HashMap<Language, String>,
}

impl Default for VoiceTable {
    fn default() -> Self {
        let voices = HashMap::from([
            (Language::En, "en-US-JennyNeural".to_string()),
            (Language::Hi, "hi-IN-SwaraNeural".to_string()),
            (Language::Hinglish, "hi-IN-SwaraNeural".to_string()),
        ]);
        Self { voices }
    }
}

impl VoiceTable {
    /// Build a table from explicit entries, filling gaps from the defaults
    #[must_use]
    pub fn with_overrides(overrides: HashMap<Language, String>) -> Self {
        let mut table = Self::default();
        table.voices.extend(overrides);
        table
    }

    /// Voice id for a language; unmapped languages use the Hindi voice
    #[must_use]
    pub fn voice_for(&self, language: Language) -> &str {
        self.voices
            .get(&language)
            .or_else(|| self.voices.get(&Language::Hi))
            .map_or("hi-IN-SwaraNeural", String::as_str)
    }
}

/// Coarse prosody deltas understood by the provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProsodyHint {
    /// Rate delta in percent
    pub rate_pct: i32,
    /// Pitch delta in Hz
    pub pitch_hz: Option<i32>,
    /// Volume delta in dB
    pub volume_db: Option<f32>,
}

impl ProsodyHint {
    /// Prosody hint for an emotion; emotions without an entry use the neutral hint
    #[must_use]
    pub const fn for_emotion(emotion: Emotion) -> Self {
        let (rate_pct, pitch_hz, volume_db) = match emotion {
            Emotion::Happy => (8, Some(2), Some(1.0)),
            Emotion::Sad => (-5, Some(-1), Some(-2.0)),
            Emotion::Angry => (5, Some(3), Some(2.0)),
            Emotion::Excited => (12, Some(4), Some(1.0)),
            Emotion::Tender => (-3, Some(-2), Some(-1.0)),
            Emotion::Playful => (6, Some(1), None),
            Emotion::Flirty => (4, Some(1), Some(0.5)),
            _ => (2, None, None),
        };
        Self {
            rate_pct,
            pitch_hz,
            volume_db,
        }
    }

    /// Prosody for one pre-rendered vocalization variant
    ///
    /// Variant `n` speeds up by `5 + 3n` percent and raises pitch by `1 + n` Hz.
    #[must_use]
    pub fn for_variant(variant: usize) -> Self {
        let n = i32::try_from(variant).unwrap_or(i32::MAX / 4);
        Self {
            rate_pct: 5 + 3 * n,
            pitch_hz: Some(1 + n),
            volume_db: None,
        }
    }

    /// Opening `<prosody>` tag
    #[must_use]
    pub fn open_tag(&self) -> String {
        let mut tag = format!("<prosody rate=\"{:+}%\"", self.rate_pct);
        if let Some(pitch) = self.pitch_hz {
            let _ = write!(tag, " pitch=\"{pitch:+}Hz\"");
        }
        if let Some(volume) = self.volume_db {
            let _ = write!(tag, " volume=\"{volume:+}dB\"");
        }
        tag.push('>');
        tag
    }
}

/// A complete markup document addressed to one voice
#[derive(Debug, Clone, PartialEq)]
pub struct Markup {
    voice: String,
    document: String,
    volume_db: f32,
}

impl Markup {
    /// Build the markup for an utterance
    #[must_use]
    pub fn build(body: &EmbellishedText, voice: &str, emotion: Emotion, effect: Effect) -> Self {
        let hint = ProsodyHint::for_emotion(emotion);
        let whisper = effect == Effect::Whisper;

        let mut inner = hint.open_tag();
        if whisper {
            let _ = write!(inner, "<prosody volume=\"{WHISPER_VOLUME_DB:+}dB\">");
        }
        inner.push_str(&body.to_markup());
        if whisper {
            inner.push_str("</prosody>");
        }
        inner.push_str("</prosody>");

        let mut volume_db = hint.volume_db.unwrap_or(0.0);
        if whisper {
            volume_db += WHISPER_VOLUME_DB;
        }

        Self {
            voice: voice.to_string(),
            document: wrap_speak(voice, &inner),
            volume_db,
        }
    }

    /// Build the markup for one pre-rendered vocalization variant
    #[must_use]
    pub fn variant(phrase: &str, voice: &str, variant: usize) -> Self {
        let hint = ProsodyHint::for_variant(variant);
        let inner = format!("{}{}</prosody>", hint.open_tag(), escape_xml(phrase));
        Self {
            voice: voice.to_string(),
            document: wrap_speak(voice, &inner),
            volume_db: 0.0,
        }
    }

    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// The SSML document
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.document
    }

    /// Net volume delta requested from the provider, in dB
    #[must_use]
    pub const fn volume_db(&self) -> f32 {
        self.volume_db
    }
}

fn wrap_speak(voice: &str, inner: &str) -> String {
    let voice = escape_xml(voice);
    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"{}\">\
         <voice name=\"{voice}\">{inner}</voice></speak>",
        locale_of(&voice)
    )
}

/// Locale prefix of a voice id (`en-US-JennyNeural` -> `en-US`)
pub(crate) fn locale_of(voice: &str) -> String {
    let mut parts = voice.splitn(3, '-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region)) if !lang.is_empty() && !region.is_empty() => {
            format!("{lang}-{region}")
        }
        _ => "en-US".to_string(),
    }
}
