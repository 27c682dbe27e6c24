//! Emotion profile table
//!
//! Static DSP and behavior parameters per emotion. Lookups are total: any id the
//! classifier emits that is not listed here resolves to the neutral profile.

use std::fmt;

/// Emotion tag attached to a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Excited,
    Angry,
    Flirty,
    Tender,
    Playful,
    Whisper,
    Surprised,
    Confused,
    Sarcastic,
}

impl Emotion {
    /// Every known emotion
    pub const ALL: [Self; 12] = [
        Self::Neutral,
        Self::Happy,
        Self::Sad,
        Self::Excited,
        Self::Angry,
        Self::Flirty,
        Self::Tender,
        Self::Playful,
        Self::Whisper,
        Self::Surprised,
        Self::Confused,
        Self::Sarcastic,
    ];

    /// Resolve an emotion id, falling back to neutral for unknown ids
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.id().eq_ignore_ascii_case(id))
            .unwrap_or(Self::Neutral)
    }

    /// Lowercase id as emitted by the classifier
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Excited => "excited",
            Self::Angry => "angry",
            Self::Flirty => "flirty",
            Self::Tender => "tender",
            Self::Playful => "playful",
            Self::Whisper => "whisper",
            Self::Surprised => "surprised",
            Self::Confused => "confused",
            Self::Sarcastic => "sarcastic",
        }
    }

    /// Profile for this emotion
    #[must_use]
    pub fn profile(self) -> &'static EmotionProfile {
        PROFILES
            .iter()
            .find(|p| p.emotion == self)
            .unwrap_or(&PROFILES[0])
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// DSP and behavior parameters for one emotion
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionProfile {
    pub emotion: Emotion,
    /// Pitch shift in semitones
    pub pitch_shift: f32,
    /// Playback speed factor, 1.0 = unchanged
    pub speed_factor: f32,
    /// Volume multiplier
    pub volume: f32,
    pub add_giggle: bool,
    pub add_sigh: bool,
    /// Tokens the embellisher may inject into the reply text
    pub modifiers: &'static [&'static str],
    pub voice_style: &'static str,
}

/// Look up the profile for an emotion id; unknown ids get the neutral profile
#[must_use]
pub fn get(emotion_id: &str) -> &'static EmotionProfile {
    Emotion::from_id(emotion_id).profile()
}

// First entry must stay neutral; it is the fallback.
static PROFILES: [EmotionProfile; 12] = [
    EmotionProfile {
        emotion: Emotion::Neutral,
        pitch_shift: 0.0,
        speed_factor: 1.0,
        volume: 1.0,
        add_giggle: false,
        add_sigh: false,
        modifiers: &[],
        voice_style: "neutral",
    },
    EmotionProfile {
        emotion: Emotion::Happy,
        pitch_shift: 1.5,
        speed_factor: 1.08,
        volume: 1.1,
        add_giggle: true,
        add_sigh: false,
        modifiers: &["!", "😊", "yay"],
        voice_style: "cheerful",
    },
    EmotionProfile {
        emotion: Emotion::Sad,
        pitch_shift: -1.0,
        speed_factor: 0.92,
        volume: 0.9,
        add_giggle: false,
        add_sigh: true,
        modifiers: &["...", "😢", "oh"],
        voice_style: "calm",
    },
    EmotionProfile {
        emotion: Emotion::Excited,
        pitch_shift: 2.0,
        speed_factor: 1.15,
        volume: 1.2,
        add_giggle: true,
        add_sigh: false,
        modifiers: &["!!!", "😄", "wow", "amazing"],
        voice_style: "excited",
    },
    EmotionProfile {
        emotion: Emotion::Angry,
        pitch_shift: -0.5,
        speed_factor: 1.1,
        volume: 1.3,
        add_giggle: false,
        add_sigh: false,
        modifiers: &["!", "grrr", "😠"],
        voice_style: "angry",
    },
    EmotionProfile {
        emotion: Emotion::Flirty,
        pitch_shift: 1.2,
        speed_factor: 0.95,
        volume: 1.05,
        add_giggle: true,
        add_sigh: false,
        modifiers: &["😘", "darling", "sweetie", "mmm"],
        voice_style: "seductive",
    },
    EmotionProfile {
        emotion: Emotion::Tender,
        pitch_shift: -0.3,
        speed_factor: 0.88,
        volume: 0.95,
        add_giggle: false,
        add_sigh: true,
        modifiers: &["...", "dear", "sweetheart", "😍"],
        voice_style: "gentle",
    },
    EmotionProfile {
        emotion: Emotion::Playful,
        pitch_shift: 1.8,
        speed_factor: 1.12,
        volume: 1.15,
        add_giggle: true,
        add_sigh: false,
        modifiers: &["😜", "teehee", "hehe", "playful"],
        voice_style: "playful",
    },
    EmotionProfile {
        emotion: Emotion::Whisper,
        pitch_shift: -2.0,
        speed_factor: 0.85,
        volume: 0.4,
        add_giggle: false,
        add_sigh: false,
        modifiers: &["...", "shh"],
        voice_style: "whispering",
    },
    EmotionProfile {
        emotion: Emotion::Surprised,
        pitch_shift: 2.5,
        speed_factor: 1.2,
        volume: 1.25,
        add_giggle: false,
        add_sigh: false,
        modifiers: &["!!!", "wow", "oh my", "😲"],
        voice_style: "surprised",
    },
    EmotionProfile {
        emotion: Emotion::Confused,
        pitch_shift: 0.5,
        speed_factor: 0.9,
        volume: 0.95,
        add_giggle: false,
        add_sigh: true,
        modifiers: &["?", "umm", "huh", "😕"],
        voice_style: "confused",
    },
    EmotionProfile {
        emotion: Emotion::Sarcastic,
        pitch_shift: -0.8,
        speed_factor: 0.95,
        volume: 1.1,
        add_giggle: false,
        add_sigh: false,
        modifiers: &["sure", "right", "oh please", "😏"],
        voice_style: "sarcastic",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids_return_their_profile() {
        for emotion in Emotion::ALL {
            let profile = get(emotion.id());
            assert_eq!(profile.emotion, emotion);
        }
    }

    #[test]
    fn test_unknown_id_is_neutral() {
        let profile = get("melancholic");
        assert_eq!(profile.emotion, Emotion::Neutral);
        assert!(profile.pitch_shift.abs() < f32::EPSILON);
        assert!((profile.speed_factor - 1.0).abs() < f32::EPSILON);
        assert_eq!(get(""), get("neutral"));
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(get("HAPPY").emotion, Emotion::Happy);
        assert_eq!(Emotion::from_id(" sad "), Emotion::Sad);
    }

    #[test]
    fn test_happy_values() {
        let happy = get("happy");
        assert!((happy.pitch_shift - 1.5).abs() < f32::EPSILON);
        assert!((happy.speed_factor - 1.08).abs() < f32::EPSILON);
        assert!(happy.add_giggle);
        assert!(!happy.add_sigh);
        assert_eq!(happy.voice_style, "cheerful");
    }

    #[test]
    fn test_every_emotion_has_exactly_one_profile() {
        for emotion in Emotion::ALL {
            assert_eq!(PROFILES.iter().filter(|p| p.emotion == emotion).count(), 1);
        }
    }
}
