//! Lyra Voice - emotive speech synthesis for the Lyra assistant
//!
//! Turns a reply plus an emotion/effect label into an audible utterance:
//! - Text embellishment (modifiers, templates, pause markup)
//! - SSML markup for the speech provider
//! - Waveform post-processing (breaths, giggles, sighs, laughs, pitch, speed)
//! - A pre-rendered giggle cache warmed in the background
//!
//! # Architecture
//!
//! ```text
//! text + language + emotion + effect
//!        │
//! ┌──────▼──────┐   ┌──────────┐   ┌──────────────┐   ┌────────────────┐   ┌──────────┐
//! │ Embellisher │──▶│  Markup  │──▶│ SpeechEngine │──▶│ PostProcessor  │──▶│ AudioSink│
//! └─────────────┘   └──────────┘   └──────────────┘   └────────────────┘   └──────────┘
//!                                                                                ▲
//!                         language + emotion ──▶ GiggleCache ────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use voice::{Effect, Emotion, Language, SpeakOutcome, Speaker, UtteranceRequest};
