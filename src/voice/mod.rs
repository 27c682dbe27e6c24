//! Voice processing module
//!
//! Turns a reply plus an emotion/effect label into audio: embellishment,
//! markup, synthesis, post-processing and playback, plus the giggle cache.

pub mod cache;
pub mod decode;
pub mod effects;
pub mod embellish;
mod language;
pub mod markup;
mod playback;
pub mod profile;
mod speaker;
pub mod tts;
mod waveform;

pub use cache::{CacheKey, CacheReport, DEFAULT_PHRASES, DEFAULT_VARIANTS, GiggleCache};
pub use decode::{samples_to_wav, to_wav};
pub use effects::{PostProcessor, Processed, Stage, StageOutcome, StageReport};
pub use embellish::{EmbellishedText, Embellisher, Segment};
pub use language::{Effect, Language};
pub use markup::{Markup, ProsodyHint, VoiceTable};
pub use playback::{AudioPlayback, AudioSink, MemorySink, WavFileSink};
pub use profile::{Emotion, EmotionProfile};
pub use speaker::{SpeakOutcome, Speaker, Utterance, UtteranceRequest};
pub use tts::{AzureSpeech, OpenAiSpeech, SpeechEngine, SpeechProvider, SpeechRequest};
pub use waveform::Waveform;
