//! Tone selection: map the detected patient age to a verify-phase register.
//!
//! The age string comes straight from the model ("8", "8 years", "Age: 65",
//! "Unknown"), so parsing is deliberately forgiving. Anything without a digit
//! run yields [`Tone::Neutral`]; the pipeline never fails on age.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Below this age the explanation is written for a child.
pub const CHILD_AGE_LIMIT: u32 = 15;

/// From this age on the explanation is written for an older adult.
pub const SENIOR_AGE_FROM: u32 = 60;

/// Register used by the verify phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Children: warm, encouraging, emoji allowed.
    Playful,
    /// Adults: clear, professional and empathetic. (default)
    #[default]
    Neutral,
    /// Older adults: gentle, patient and reassuring.
    Gentle,
}

impl Tone {
    /// Pick the tone for an age string as reported by the model.
    pub fn from_age(age: &str) -> Self {
        match parse_age(age) {
            Some(years) if years < CHILD_AGE_LIMIT => Tone::Playful,
            Some(years) if years >= SENIOR_AGE_FROM => Tone::Gentle,
            _ => Tone::Neutral,
        }
    }

    /// The natural-language instruction embedded in the verify prompt.
    pub fn directive(self) -> &'static str {
        match self {
            Tone::Playful => {
                "The patient is a child. Use a playful, warm and encouraging tone. \
                 Address them kindly (e.g. \"buddy\", \"champ\", \"superstar\"), use very short \
                 sentences and simple comparisons to everyday things, and you may add a few \
                 friendly emoji (🌟, 💪, 🍎). Never be scary."
            }
            Tone::Neutral => {
                "The patient is an adult. Use a clear, professional and empathetic tone. \
                 Be direct about what the results mean, avoid jargon or explain it in plain \
                 words, and do not use emoji."
            }
            Tone::Gentle => {
                "The patient is an older adult. Use a gentle, patient and reassuring tone. \
                 Speak respectfully, keep sentences calm and unhurried, emphasise what they \
                 can do to stay well, and do not use emoji."
            }
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tone::Playful => "playful",
            Tone::Neutral => "neutral",
            Tone::Gentle => "gentle",
        })
    }
}

/// Leading digit run of `age`, skipping any non-digit prefix.
///
/// `"8 years"` → 8, `"Age: 65"` → 65, `"Unknown"` → `None`.
pub fn parse_age(age: &str) -> Option<u32> {
    let digits: String = age
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_is_playful() {
        assert_eq!(Tone::from_age("8 years"), Tone::Playful);
        assert_eq!(Tone::from_age("8"), Tone::Playful);
        assert_eq!(Tone::from_age("14"), Tone::Playful);
    }

    #[test]
    fn senior_is_gentle() {
        assert_eq!(Tone::from_age("65"), Tone::Gentle);
        assert_eq!(Tone::from_age("60 years old"), Tone::Gentle);
    }

    #[test]
    fn adult_is_neutral() {
        assert_eq!(Tone::from_age("15"), Tone::Neutral);
        assert_eq!(Tone::from_age("42"), Tone::Neutral);
        assert_eq!(Tone::from_age("59"), Tone::Neutral);
    }

    #[test]
    fn unparsable_is_neutral() {
        assert_eq!(Tone::from_age("Unknown"), Tone::Neutral);
        assert_eq!(Tone::from_age(""), Tone::Neutral);
        assert_eq!(Tone::from_age("not stated"), Tone::Neutral);
        // Overflowing digit runs do not panic.
        assert_eq!(Tone::from_age("99999999999999999999"), Tone::Neutral);
    }

    #[test]
    fn age_prefix_is_skipped() {
        assert_eq!(parse_age("Age: 72"), Some(72));
        assert_eq!(parse_age("~7 yrs"), Some(7));
        assert_eq!(parse_age("N/A"), None);
    }

    #[test]
    fn directives_differ() {
        assert!(Tone::Playful.directive().contains("playful"));
        assert!(Tone::Gentle.directive().contains("reassuring"));
        assert!(Tone::Neutral.directive().contains("professional"));
    }
}
