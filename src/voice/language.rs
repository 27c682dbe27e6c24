//! Closed tag sets supplied by the turn loop

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::Error;

/// Reply language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    En,
    /// Hindi
    Hi,
    /// Hindi written in Latin script, mixed with English
    Hinglish,
}

impl Language {
    /// All supported languages
    pub const ALL: [Self; 3] = [Self::En, Self::Hi, Self::Hinglish];

    /// Stable tag used in config keys and cache file names
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Hinglish => "hinglish",
        }
    }

    /// Whether replies in this language are spoken by a Hindi voice
    #[must_use]
    pub const fn is_indic(self) -> bool {
        matches!(self, Self::Hi | Self::Hinglish)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "hi" | "hindi" => Ok(Self::Hi),
            "hinglish" => Ok(Self::Hinglish),
            other => Err(Error::UnknownTag {
                kind: "language",
                value: other.to_string(),
            }),
        }
    }
}

/// Optional delivery effect requested alongside a reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Plain delivery
    #[default]
    None,
    /// Quiet delivery wrapped in a volume reduction
    Whisper,
    /// Play a giggle before the reply
    Giggle,
}

impl Effect {
    /// Stable tag
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Whisper => "whisper",
            Self::Giggle => "giggle",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Effect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "whisper" => Ok(Self::Whisper),
            "giggle" => Ok(Self::Giggle),
            other => Err(Error::UnknownTag {
                kind: "effect",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!(" Hinglish ".parse::<Language>().unwrap(), Language::Hinglish);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_effect_parse() {
        assert_eq!("".parse::<Effect>().unwrap(), Effect::None);
        assert_eq!("WHISPER".parse::<Effect>().unwrap(), Effect::Whisper);
        assert!("shout".parse::<Effect>().is_err());
    }

    #[test]
    fn test_tags_roundtrip_through_display() {
        for lang in Language::ALL {
            assert_eq!(lang.to_string().parse::<Language>().unwrap(), lang);
        }
    }
}
