//! Transcript words, their time unit, and keyword matching.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Latest accepted word timestamp: 24 hours, in milliseconds.
pub const MAX_WORD_MS: i64 = 24 * 60 * 60 * 1000;

/// A transcript word with absolute timing in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    /// Start time in milliseconds
    pub start: i64,
    /// End time in milliseconds (never before `start`)
    pub end: i64,
}

impl Word {
    /// Create a word; an `end` before `start` collapses to `start`.
    pub fn new(text: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            text: text.into(),
            start,
            end: end.max(start),
        }
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the word overlaps the `[start_ms, end_ms)` window.
    pub fn overlaps(&self, start_ms: i64, end_ms: i64) -> bool {
        self.end > start_ms && self.start < end_ms
    }
}

/// Unit of the timestamps a caller sends for words.
///
/// There is no unit field in word payloads, so the unit is configuration,
/// never inferred from magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WordTimeUnit {
    #[default]
    #[serde(rename = "ms", alias = "milliseconds")]
    Milliseconds,
    #[serde(rename = "s", alias = "seconds")]
    Seconds,
}

impl WordTimeUnit {
    /// Multiplier that converts one unit into milliseconds.
    pub fn factor_ms(&self) -> f64 {
        match self {
            WordTimeUnit::Milliseconds => 1.0,
            WordTimeUnit::Seconds => 1000.0,
        }
    }

    /// Convert a raw timestamp into whole milliseconds.
    pub fn to_millis(&self, value: f64) -> i64 {
        (value * self.factor_ms()).round() as i64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WordTimeUnit::Milliseconds => "ms",
            WordTimeUnit::Seconds => "s",
        }
    }
}

impl fmt::Display for WordTimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WordTimeUnit {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ms" | "milliseconds" => Ok(WordTimeUnit::Milliseconds),
            "s" | "seconds" => Ok(WordTimeUnit::Seconds),
            other => Err(ModelError::unknown_variant("word time unit", other)),
        }
    }
}

/// Normalized keywords for case- and punctuation-insensitive matching.
///
/// Every keyword is stored both lower-cased and with non-alphanumeric
/// characters stripped, and words are probed in both forms, so `"Roma."`
/// matches the keyword `"roma"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    entries: HashSet<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = HashSet::new();
        for keyword in keywords {
            let (lowered, stripped) = normalize(keyword.as_ref());
            if stripped.is_empty() {
                continue;
            }
            entries.insert(lowered);
            entries.insert(stripped);
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the word matches any keyword in either normalized form.
    pub fn matches(&self, word: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let (lowered, stripped) = normalize(word);
        self.entries.contains(&lowered) || (!stripped.is_empty() && self.entries.contains(&stripped))
    }
}

fn normalize(text: &str) -> (String, String) {
    let lowered = text.trim().to_lowercase();
    let stripped = lowered.chars().filter(|c| c.is_alphanumeric()).collect();
    (lowered, stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_end_never_precedes_start() {
        let word = Word::new("ciao", 500, 200);
        assert_eq!(word.end, 500);
        assert_eq!(word.duration_ms(), 0);
    }

    #[test]
    fn test_duration_saturates_on_extreme_bounds() {
        let word = Word::new("x", i64::MIN, i64::MAX);
        assert_eq!(word.duration_ms(), i64::MAX);
    }

    #[test]
    fn test_word_overlap() {
        let word = Word::new("a", 900, 1200);
        assert!(word.overlaps(1000, 2000));
        assert!(!word.overlaps(1200, 2000));
        assert!(!word.overlaps(0, 900));
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(WordTimeUnit::Milliseconds.to_millis(400.0), 400);
        assert_eq!(WordTimeUnit::Seconds.to_millis(0.4), 400);
        assert_eq!(WordTimeUnit::Seconds.to_millis(12.3456), 12_346);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("ms".parse::<WordTimeUnit>().unwrap(), WordTimeUnit::Milliseconds);
        assert_eq!("Seconds".parse::<WordTimeUnit>().unwrap(), WordTimeUnit::Seconds);
        assert!("minutes".parse::<WordTimeUnit>().is_err());

        let unit: WordTimeUnit = serde_json::from_str("\"s\"").unwrap();
        assert_eq!(unit, WordTimeUnit::Seconds);
    }

    #[test]
    fn test_keyword_matching_ignores_case_and_punctuation() {
        let keywords = KeywordSet::new(["roma"]);
        assert!(keywords.matches("Roma"));
        assert!(keywords.matches("ROMA"));
        assert!(keywords.matches("Roma."));
        assert!(keywords.matches("«Ro,ma!»"));
        assert!(!keywords.matches("Romano"));
    }

    #[test]
    fn test_keywords_are_normalized_too() {
        let keywords = KeywordSet::new(["Città!", "  AI "]);
        assert!(keywords.matches("città"));
        assert!(keywords.matches("ai"));
        assert!(keywords.matches("A.I."));
    }

    #[test]
    fn test_empty_keyword_set_matches_nothing() {
        let keywords = KeywordSet::new(Vec::<String>::new());
        assert!(keywords.is_empty());
        assert!(!keywords.matches("anything"));

        let blank = KeywordSet::new(["", "..."]);
        assert!(!blank.matches("..."));
    }
}
