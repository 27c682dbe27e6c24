//! Speak path facade
//!
//! Ties the embellisher, markup, speech engine, post-processor, giggle cache
//! and playback together. Every public entry point absorbs its own failures:
//! when speech is unavailable the text is printed instead, so the turn loop
//! can always continue.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;

use super::cache::{CacheReport, GiggleCache};
use super::effects::{PostProcessor, Processed};
use super::embellish::{EmbellishedText, Embellisher};
use super::language::{Effect, Language};
use super::markup::{Markup, VoiceTable};
use super::playback::AudioSink;
use super::profile::{Emotion, EmotionProfile};
use super::tts::SpeechEngine;
use crate::config::Config;
use crate::Result;

/// One reply to be spoken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtteranceRequest {
    pub text: String,
    pub language: Language,
    /// Emotion id; unknown ids are spoken as neutral
    pub emotion: String,
    pub effect: Effect,
}

impl UtteranceRequest {
    #[must_use]
    pub fn new(text: impl Into<String>, language: Language, emotion: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language,
            emotion: emotion.into(),
            effect: Effect::None,
        }
    }

    #[must_use]
    pub const fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }
}

/// Text and markup prepared for synthesis
#[derive(Debug, Clone)]
pub struct Utterance {
    pub profile: &'static EmotionProfile,
    pub text: EmbellishedText,
    pub markup: Markup,
}

/// What `speak` ended up doing
#[derive(Debug, Clone)]
pub enum SpeakOutcome {
    /// Audio was played
    Spoken(Processed),
    /// Synthesis or playback failed; the text was printed instead
    TextFallback,
    /// Nothing to say
    Silent,
}

impl SpeakOutcome {
    #[must_use]
    pub const fn is_spoken(&self) -> bool {
        matches!(self, Self::Spoken(_))
    }
}

/// Emotive text-to-speech front end
pub struct Speaker {
    engine: SpeechEngine,
    voices: VoiceTable,
    embellisher: Embellisher,
    processor: PostProcessor,
    cache: Arc<GiggleCache>,
    sink: Box<dyn AudioSink>,
    rng: StdRng,
    console_echo: bool,
}

impl Speaker {
    #[must_use]
    pub fn new(
        engine: SpeechEngine,
        voices: VoiceTable,
        cache: Arc<GiggleCache>,
        sink: Box<dyn AudioSink>,
    ) -> Self {
        Self {
            engine,
            voices,
            embellisher: Embellisher::new(),
            processor: PostProcessor::new(),
            cache,
            sink,
            rng: StdRng::from_entropy(),
            console_echo: false,
        }
    }

    /// Build a speaker from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the speech provider cannot be constructed
    pub fn from_config(config: &Config, sink: Box<dyn AudioSink>) -> Result<Self> {
        let engine = SpeechEngine::new(config.speech_provider()?);
        let mut speaker = Self::new(
            engine,
            config.voices.clone(),
            Arc::new(config.giggle_cache()),
            sink,
        )
        .with_console_echo(config.console_echo);

        if let Some(seed) = config.seed {
            speaker = speaker.with_seed(seed);
        }
        Ok(speaker)
    }

    /// Use a fixed seed for every random draw
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub const fn with_console_echo(mut self, enabled: bool) -> Self {
        self.console_echo = enabled;
        self
    }

    #[must_use]
    pub const fn voices(&self) -> &VoiceTable {
        &self.voices
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<GiggleCache> {
        &self.cache
    }

    /// Embellish a reply and build its markup, without synthesizing it
    pub fn prepare(
        &mut self,
        text: &str,
        language: Language,
        emotion: &str,
        effect: Effect,
    ) -> Utterance {
        let profile = super::profile::get(emotion);
        let embellished = self.embellisher.embellish(text, profile, &mut self.rng);
        let markup = Markup::build(
            &embellished,
            self.voices.voice_for(language),
            profile.emotion,
            effect,
        );

        Utterance {
            profile,
            text: embellished,
            markup,
        }
    }

    /// Speak a reply with emotion and effect
    ///
    /// Never fails: provider, decode and playback errors print the text instead.
    pub async fn speak(
        &mut self,
        text: &str,
        language: Language,
        emotion: &str,
        effect: Effect,
    ) -> SpeakOutcome {
        if text.trim().is_empty() {
            return SpeakOutcome::Silent;
        }

        if self.console_echo {
            println!("Lyra -> (lang={language}, emotion={emotion}, effect={effect}): {text}");
        }

        match self.try_speak(text, language, emotion, effect).await {
            Ok(processed) => SpeakOutcome::Spoken(processed),
            Err(e) => {
                tracing::warn!(
                    provider = self.engine.provider_name(),
                    provider_failure = e.is_provider(),
                    error = %e,
                    "speech unavailable, showing text"
                );
                if !self.console_echo {
                    println!("Lyra: {text}");
                }
                SpeakOutcome::TextFallback
            }
        }
    }

    async fn try_speak(
        &mut self,
        text: &str,
        language: Language,
        emotion: &str,
        effect: Effect,
    ) -> Result<Processed> {
        let utterance = self.prepare(text, language, emotion, effect);
        tracing::debug!(
            voice = utterance.markup.voice(),
            emotion = %utterance.profile.emotion,
            pauses = utterance.text.pause_count(),
            "speaking"
        );

        let wave = self
            .engine
            .synthesize(&utterance.markup, &utterance.text.plain())
            .await?;
        // Plain-text providers never saw the markup volume, so apply it here
        let gain_db = if self.engine.supports_markup() {
            0.0
        } else {
            utterance.markup.volume_db()
        };
        let processed =
            self.processor
                .process_with_gain(wave, utterance.profile, gain_db, &mut self.rng);
        self.sink.play(&processed.waveform)?;
        Ok(processed)
    }

    /// Speak a reply request, leading with a giggle when asked for one
    pub async fn respond(&mut self, request: &UtteranceRequest) -> SpeakOutcome {
        if request.effect == Effect::Giggle {
            self.play_giggle(request.language, &request.emotion).await;
        }
        self.speak(
            &request.text,
            request.language,
            &request.emotion,
            request.effect,
        )
        .await
    }

    /// Play a giggle, preferring the cache
    ///
    /// If the cache path fails, a few emotion-flavored giggle fragments are
    /// spoken live. Returns whether any audio was played.
    pub async fn play_giggle(&mut self, language: Language, emotion: &str) -> bool {
        let cached = self
            .cache
            .play_random(
                &self.engine,
                &self.voices,
                self.sink.as_ref(),
                &mut self.rng,
                language,
            )
            .await;

        match cached {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "cached giggle unavailable, speaking fragments");
                let fragments = self.giggle_fragments(Emotion::from_id(emotion));

                let mut played = false;
                for fragment in fragments {
                    played |= self
                        .speak(fragment, language, emotion, Effect::None)
                        .await
                        .is_spoken();
                }
                played
            }
        }
    }

    /// Pick giggle fragments for an emotion, without repeats
    fn giggle_fragments(&mut self, emotion: Emotion) -> Vec<&'static str> {
        let phrases = giggle_phrases(emotion);
        let count = if matches!(emotion, Emotion::Happy | Emotion::Excited) {
            self.rng.gen_range(2..=4)
        } else {
            self.rng.gen_range(1..=2)
        };
        phrases
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect()
    }

    /// Speak a short emotion-keyed interjection ("yay!", "sigh...")
    pub async fn play_emotional_sound(&mut self, emotion: &str, language: Language) -> SpeakOutcome {
        let sound = emotional_sounds(Emotion::from_id(emotion))
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("okay");
        self.speak(sound, language, emotion, Effect::None).await
    }

    /// Start building the giggle cache on a background task
    ///
    /// Fire and forget, or await the handle for the build report.
    #[must_use]
    pub fn warm_cache(&self, language: Language) -> JoinHandle<CacheReport> {
        Arc::clone(&self.cache).warm(self.engine.clone(), self.voices.clone(), language)
    }
}

/// Giggle fragments spoken when the cache cannot play
const fn giggle_phrases(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Playful => &["teehee", "hehe", "😜", "giggle"],
        Emotion::Flirty => &["mmm", "hehe", "😘", "teehee"],
        Emotion::Excited => &["wow", "haha", "yay", "😄"],
        Emotion::Tender => &["hehe", "sweet", "😍"],
        Emotion::Surprised => &["oh my", "wow", "😲", "haha"],
        Emotion::Sarcastic => &["sure", "right", "hehe"],
        Emotion::Confused => &["umm", "huh", "😕"],
        _ => &["हाहा", "hehe", "haha", "😊"],
    }
}

const fn emotional_sounds(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Happy => &["yay!", "woo!", "great!"],
        Emotion::Sad => &["oh...", "sigh...", "aww..."],
        Emotion::Surprised => &["wow!", "oh my!", "really?!"],
        Emotion::Angry => &["grrr!", "humph!", "tch!"],
        Emotion::Flirty => &["mmm...", "oh darling...", "😘"],
        Emotion::Tender => &["aww...", "sweet...", "dear..."],
        Emotion::Confused => &["umm...", "huh?", "what?"],
        Emotion::Sarcastic => &["oh please...", "sure...", "right..."],
        Emotion::Excited => &["wow!", "amazing!", "fantastic!"],
        Emotion::Playful => &["teehee!", "gotcha!", "😜"],
        Emotion::Neutral | Emotion::Whisper => &["okay"],
    }
}
