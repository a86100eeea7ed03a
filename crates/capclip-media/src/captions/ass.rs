//! ASS (Advanced SubStation Alpha) caption rendering.
//!
//! Two layouts share one header:
//! - Uniform: one event per chunk, `\k` progressive reveal, keyword words
//!   recoloured inline.
//! - Two-layer: a layer 0 base event per chunk in the default style plus a
//!   layer 1 `Highlight` event per keyword word, spanning exactly that word.
//!   The overlay repeats the whole chunk with every other word fully
//!   transparent so the highlighted word lands on top of its base glyphs.

use std::fmt::Write;

use capclip_models::{to_caption_timestamp, KeywordSet, Word};

use super::chunker::CaptionChunk;
use super::Timeline;

/// Canvas the styles are laid out on (vertical short-form video).
pub const PLAY_RES: (u32, u32) = (1080, 1920);

/// Inline primary colour of regular words.
const COLOR_DEFAULT: &str = "&H00FFFFFF&";
/// Inline primary colour of keyword words.
const COLOR_KEYWORD: &str = "&H0000FFFF&";
const ALPHA_HIDDEN: &str = "&HFF&";
const ALPHA_VISIBLE: &str = "&H00&";

/// A named ASS style.
#[derive(Debug, Clone)]
pub struct AssStyle {
    pub name: String,
    pub font_name: String,
    pub font_size: u32,
    /// Colour after the `\k` sweep has passed (ABGR)
    pub primary_color: String,
    /// Colour before the `\k` sweep reaches a word (ABGR)
    pub secondary_color: String,
    pub outline_color: String,
    pub back_color: String,
    pub bold: bool,
    pub outline: u32,
    pub shadow: u32,
    /// Numpad alignment (2 = bottom centre)
    pub alignment: u8,
    pub margin_l: u32,
    pub margin_r: u32,
    pub margin_v: u32,
}

impl Default for AssStyle {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            font_name: "Arial".to_string(),
            font_size: 80,
            primary_color: "&H00FFFFFF".to_string(),
            secondary_color: "&H00C8C8C8".to_string(),
            outline_color: "&H00000000".to_string(),
            back_color: "&H80000000".to_string(),
            bold: true,
            outline: 4,
            shadow: 1,
            alignment: 2,
            margin_l: 60,
            margin_r: 60,
            margin_v: 380,
        }
    }
}

impl AssStyle {
    /// Overlay style for highlighted keywords.
    pub fn highlight() -> Self {
        Self {
            name: "Highlight".to_string(),
            primary_color: "&H0000FFFF".to_string(),
            secondary_color: "&H0000FFFF".to_string(),
            ..Self::default()
        }
    }

    fn to_style_line(&self) -> String {
        format!(
            "Style: {name},{font},{size},{primary},{secondary},{outline},{back},{bold},0,0,0,100,100,0,0,1,{outline_w},{shadow},{align},{ml},{mr},{mv},1",
            name = self.name,
            font = self.font_name,
            size = self.font_size,
            primary = self.primary_color,
            secondary = self.secondary_color,
            outline = self.outline_color,
            back = self.back_color,
            bold = if self.bold { -1 } else { 0 },
            outline_w = self.outline,
            shadow = self.shadow,
            align = self.alignment,
            ml = self.margin_l,
            mr = self.margin_r,
            mv = self.margin_v,
        )
    }
}

/// Which ASS layout to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssLayout {
    Uniform,
    TwoLayer,
}

/// Render chunks as a complete ASS document.
pub fn render_ass(
    chunks: &[CaptionChunk<'_>],
    keywords: &KeywordSet,
    timeline: &Timeline,
    max_line_chars: usize,
    layout: AssLayout,
) -> String {
    let base = AssStyle::default();
    let highlight = AssStyle::highlight();
    let mut output = header(&base, &highlight);

    for chunk in chunks {
        let start = timeline.relative_secs(chunk.start_ms());
        let end = timeline.relative_secs(chunk.end_ms());
        let line_break = chunk.line_break(max_line_chars);

        match layout {
            AssLayout::Uniform => {
                let text = karaoke_text(chunk.words(), line_break, |word| {
                    let color = if keywords.matches(&word.text) {
                        COLOR_KEYWORD
                    } else {
                        COLOR_DEFAULT
                    };
                    format!("\\1c{}", color)
                });
                push_event(&mut output, 0, start, end, &base.name, &text);
            }
            AssLayout::TwoLayer => {
                let text = karaoke_text(chunk.words(), line_break, |_| String::new());
                push_event(&mut output, 0, start, end, &base.name, &text);

                for (active, word) in chunk.words().iter().enumerate() {
                    if !keywords.matches(&word.text) {
                        continue;
                    }
                    let text = overlay_text(chunk.words(), line_break, active);
                    push_event(
                        &mut output,
                        1,
                        timeline.relative_secs(word.start),
                        timeline.relative_secs(word.end),
                        &highlight.name,
                        &text,
                    );
                }
            }
        }
    }

    output
}

fn header(base: &AssStyle, highlight: &AssStyle) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "[Script Info]");
    let _ = writeln!(output, "ScriptType: v4.00+");
    let _ = writeln!(output, "PlayResX: {}", PLAY_RES.0);
    let _ = writeln!(output, "PlayResY: {}", PLAY_RES.1);
    let _ = writeln!(output, "WrapStyle: 2");
    let _ = writeln!(output, "ScaledBorderAndShadow: yes");
    let _ = writeln!(output);
    let _ = writeln!(output, "[V4+ Styles]");
    let _ = writeln!(
        output,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    );
    let _ = writeln!(output, "{}", base.to_style_line());
    let _ = writeln!(output, "{}", highlight.to_style_line());
    let _ = writeln!(output);
    let _ = writeln!(output, "[Events]");
    let _ = writeln!(
        output,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    );
    output
}

/// Append a dialogue event; events that collapse to zero length are dropped.
fn push_event(output: &mut String, layer: u8, start: f64, end: f64, style: &str, text: &str) {
    if end <= start {
        return;
    }
    let _ = writeln!(
        output,
        "Dialogue: {},{},{},{},,0,0,0,,{}",
        layer,
        to_caption_timestamp(start),
        to_caption_timestamp(end),
        style,
        text
    );
}

/// `\k` duration of a word in centiseconds.
fn karaoke_cs(word: &Word) -> i64 {
    word.duration_ms().saturating_add(5) / 10
}

/// Progressive-reveal text: `{\k<cs><extra>}WORD` per word.
fn karaoke_text<F>(words: &[Word], line_break: Option<usize>, extra: F) -> String
where
    F: Fn(&Word) -> String,
{
    let mut text = String::new();
    for (i, word) in words.iter().enumerate() {
        push_separator(&mut text, i, line_break);
        let _ = write!(
            text,
            "{{\\k{}{}}}{}",
            karaoke_cs(word),
            extra(word),
            escape_ass_text(&word.text.to_uppercase())
        );
    }
    text
}

/// The chunk with only the `active` word visible.
fn overlay_text(words: &[Word], line_break: Option<usize>, active: usize) -> String {
    let mut text = String::new();
    for (i, word) in words.iter().enumerate() {
        push_separator(&mut text, i, line_break);
        let alpha = if i == active { ALPHA_VISIBLE } else { ALPHA_HIDDEN };
        let _ = write!(
            text,
            "{{\\alpha{}}}{}",
            alpha,
            escape_ass_text(&word.text.to_uppercase())
        );
    }
    text
}

fn push_separator(text: &mut String, index: usize, line_break: Option<usize>) {
    if index == 0 {
        return;
    }
    if line_break == Some(index) {
        text.push_str("\\N");
    } else {
        text.push(' ');
    }
}

/// Neutralise characters ASS would read as override blocks or line breaks.
fn escape_ass_text(text: &str) -> String {
    text.trim()
        .replace('\\', "/")
        .replace('{', "(")
        .replace('}', ")")
        .replace(['\n', '\r'], " ")
}
