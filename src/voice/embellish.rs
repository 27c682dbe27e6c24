//! Text embellishment
//!
//! Augments a reply with emotional modifiers, templated sentence variations and
//! pause directives. The result is a sequence of text and pause segments; the
//! markup synthesizer renders pauses as `<break>` elements, plain-text providers
//! drop them.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;

use super::profile::{Emotion, EmotionProfile};

/// Chance of injecting one modifier token
pub const MODIFIER_PROBABILITY: f64 = 0.3;

/// Chance of wrapping the reply in a sentence template
pub const TEMPLATE_PROBABILITY: f64 = 0.4;

/// Pause inserted between sentences, on top of the punctuation pause
pub const SENTENCE_GAP: Duration = Duration::from_millis(150);

/// Tokens that replace the reply's trailing punctuation
const PUNCTUATION_TOKENS: [&str; 3] = ["!", "!!!", "?"];

/// One piece of embellished text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Pause(Duration),
}

/// Reply text carrying pause directives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbellishedText {
    segments: Vec<Segment>,
}

impl EmbellishedText {
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Text without pause directives
    #[must_use]
    pub fn plain(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                Segment::Pause(_) => None,
            })
            .collect()
    }

    /// Number of pause directives
    #[must_use]
    pub fn pause_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Pause(_)))
            .count()
    }

    /// Render as markup body: escaped text with `<break time="..ms"/>` directives
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(&escape_xml(t)),
                Segment::Pause(d) => {
                    out.push_str(&format!(" <break time=\"{}ms\"/> ", d.as_millis()));
                }
            }
        }
        out
    }

    fn push_text(&mut self, c: char) {
        if let Some(Segment::Text(t)) = self.segments.last_mut() {
            t.push(c);
        } else {
            self.segments.push(Segment::Text(c.to_string()));
        }
    }

    fn push_pause(&mut self, pause: Duration) {
        self.segments.push(Segment::Pause(pause));
    }
}

impl fmt::Display for EmbellishedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

/// Applies modifier injection, template variation and breathing markup in that order
#[derive(Debug, Clone, Copy, Default)]
pub struct Embellisher;

impl Embellisher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Embellish a reply for the given emotion
    pub fn embellish<R: Rng + ?Sized>(
        &self,
        text: &str,
        profile: &EmotionProfile,
        rng: &mut R,
    ) -> EmbellishedText {
        let text = inject_modifier(text, profile, rng);
        let text = apply_template(&text, profile.emotion, rng);
        breathe(&text)
    }
}

/// Maybe inject one of the profile's modifier tokens
///
/// Punctuation tokens replace the trailing `.`/`!`/`?`. Symbol-only tokens
/// (ellipsis, emoji) are appended after a space. Word tokens go in front of a
/// uniformly chosen word; a single-word reply gets the word appended instead.
pub fn inject_modifier<R: Rng + ?Sized>(text: &str, profile: &EmotionProfile, rng: &mut R) -> String {
    if profile.modifiers.is_empty() || text.trim().is_empty() {
        return text.to_string();
    }
    if !rng.gen_bool(MODIFIER_PROBABILITY) {
        return text.to_string();
    }
    let Some(token) = profile.modifiers.choose(rng) else {
        return text.to_string();
    };

    if PUNCTUATION_TOKENS.contains(token) {
        let stem = text.trim_end().trim_end_matches(['.', '!', '?']);
        return format!("{stem}{token}");
    }

    if token.chars().all(|c| !c.is_alphanumeric()) {
        return format!("{text} {token}");
    }

    let mut words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 {
        return format!("{text} {token}");
    }
    let at = rng.gen_range(0..words.len());
    words.insert(at, token);
    words.join(" ")
}

/// Maybe wrap the reply in one of the emotion's sentence templates
pub fn apply_template<R: Rng + ?Sized>(text: &str, emotion: Emotion, rng: &mut R) -> String {
    let choices = templates(emotion);
    if choices.is_empty() || !rng.gen_bool(TEMPLATE_PROBABILITY) {
        return text.to_string();
    }
    choices.choose(rng).map_or_else(
        || text.to_string(),
        |(prefix, suffix)| format!("{prefix}{text}{suffix}"),
    )
}

/// Insert pause directives after punctuation and between sentences
///
/// Never drops or reorders a character of the input.
#[must_use]
pub fn breathe(text: &str) -> EmbellishedText {
    let mut out = EmbellishedText::default();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        out.push_text(c);
        if let Some(pause) = punctuation_pause(c) {
            out.push_pause(pause);
            let ends_sentence = matches!(c, '.' | '!' | '?');
            if ends_sentence && chars.peek().is_some_and(|n| n.is_whitespace()) {
                out.push_pause(SENTENCE_GAP);
            }
        }
    }

    out
}

const fn punctuation_pause(c: char) -> Option<Duration> {
    match c {
        '.' => Some(Duration::from_millis(300)),
        ',' => Some(Duration::from_millis(200)),
        '!' | '?' => Some(Duration::from_millis(400)),
        _ => None,
    }
}

/// Sentence templates as (prefix, suffix) pairs around the reply
const fn templates(emotion: Emotion) -> &'static [(&'static str, &'static str)] {
    match emotion {
        Emotion::Happy => &[
            ("Oh ", "! That's wonderful!"),
            ("Yay! ", ""),
            ("I'm so happy! ", ""),
            ("Great! ", ""),
        ],
        Emotion::Sad => &[
            ("Oh... ", ""),
            ("I'm sorry... ", ""),
            ("Aww... ", ""),
            ("That's sad... ", ""),
        ],
        Emotion::Flirty => &[
            ("Oh darling, ", ""),
            ("Mmm... ", ""),
            ("You're so sweet... ", ""),
            ("My dear, ", ""),
        ],
        Emotion::Surprised => &[
            ("Wow! ", ""),
            ("Oh my! ", ""),
            ("Really? ", ""),
            ("That's amazing! ", ""),
        ],
        Emotion::Angry => &[
            ("Oh come on! ", ""),
            ("This is ridiculous! ", ""),
            ("I'm so mad! ", ""),
            ("Unbelievable! ", ""),
        ],
        Emotion::Playful => &[
            ("Hehe! ", ""),
            ("Gotcha! ", ""),
            ("Teehee! ", ""),
            ("You're funny! ", ""),
        ],
        Emotion::Tender => &[
            ("Aww... ", ""),
            ("That's so sweet... ", ""),
            ("My dear... ", ""),
            ("How lovely... ", ""),
        ],
        Emotion::Confused => &[
            ("Umm... ", ""),
            ("I'm confused... ", ""),
            ("Huh? ", ""),
            ("What do you mean? ", ""),
        ],
        Emotion::Sarcastic => &[
            ("Oh sure... ", ""),
            ("Right... ", ""),
            ("Oh please... ", ""),
            ("As if... ", ""),
        ],
        Emotion::Neutral | Emotion::Excited | Emotion::Whisper => &[],
    }
}

/// Escape the five XML special characters
#[must_use]
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
