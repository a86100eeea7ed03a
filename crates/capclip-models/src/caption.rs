//! Caption output modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Caption format and visual style burned into a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStyle {
    /// Plain SubRip blocks
    Srt,
    /// One styled layer with per-word progressive reveal; keywords in an alternate color
    #[default]
    Karaoke,
    /// Progressive-reveal base layer plus a per-keyword overlay layer
    Highlight,
}

impl CaptionStyle {
    /// File extension of the caption document.
    pub fn extension(&self) -> &'static str {
        match self {
            CaptionStyle::Srt => "srt",
            CaptionStyle::Karaoke | CaptionStyle::Highlight => "ass",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionStyle::Srt => "srt",
            CaptionStyle::Karaoke => "karaoke",
            CaptionStyle::Highlight => "highlight",
        }
    }
}

impl fmt::Display for CaptionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptionStyle {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "srt" | "plain" => Ok(CaptionStyle::Srt),
            "karaoke" | "uniform" => Ok(CaptionStyle::Karaoke),
            "highlight" | "two_layer" => Ok(CaptionStyle::Highlight),
            other => Err(ModelError::unknown_variant("caption style", other)),
        }
    }
}
