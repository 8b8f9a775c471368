use serde::{Deserialize, Serialize};

use crate::models::color::Color;
use crate::models::common::Matrix;

/// Whether a text frame is point text (grows from an anchor) or area text
/// (wraps inside a box). Other host text kinds (text on a path) are not
/// renderable as HTML and fall through to image capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextKind {
    Point,
    Area,
    Path,
}

/// Paragraph justification, mirroring the host's values. Everything in the
/// FULLJUSTIFY family maps to CSS `justify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Justification {
    #[default]
    Left,
    Right,
    Center,
    FullJustify,
    FullJustifyLastLineLeft,
    FullJustifyLastLineCenter,
    FullJustifyLastLineRight,
}

impl Justification {
    pub fn css_value(&self) -> &'static str {
        match self {
            Justification::Left => "left",
            Justification::Right => "right",
            Justification::Center => "center",
            Justification::FullJustify
            | Justification::FullJustifyLastLineLeft
            | Justification::FullJustifyLastLineCenter
            | Justification::FullJustifyLastLineRight => "justify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capitalization {
    #[default]
    Normal,
    AllCaps,
    SmallCaps,
}

impl Capitalization {
    /// The CSS `text-transform` value; small caps are approximated with
    /// uppercase, matching the host's visual output more closely than
    /// `font-variant` for the supported fonts.
    pub fn css_value(&self) -> Option<&'static str> {
        match self {
            Capitalization::Normal => None,
            Capitalization::AllCaps | Capitalization::SmallCaps => Some("uppercase"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaselinePosition {
    #[default]
    Normal,
    Superscript,
    Subscript,
}

/// A maximal run of characters sharing one set of character attributes, as
/// reported by the host. Adjacent ranges whose *derived CSS styles* are
/// equal are merged again during extraction, so hosts may report finer
/// splits than strictly necessary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRange {
    pub text: String,

    /// The host font name, e.g. `SourceSansPro-Bold`.
    pub font: String,

    /// Font size in document points (1 pt = 1 CSS px at artboard scale).
    pub size: f64,

    /// The text fill. `None` models a missing fill (rendered pure green
    /// with a warning so the problem is visually obvious).
    pub fill: Option<Color>,

    /// Tracking in thousandths of an em.
    #[serde(default)]
    pub tracking: f64,

    #[serde(default)]
    pub capitalization: Capitalization,

    #[serde(default)]
    pub baseline: BaselinePosition,

    /// Horizontal character scaling percentage; CSS cannot represent values
    /// other than 100, which produces a warning.
    #[serde(default = "default_scale")]
    pub horizontal_scale: f64,

    /// Vertical character scaling percentage.
    #[serde(default = "default_scale")]
    pub vertical_scale: f64,
}

fn default_scale() -> f64 {
    100.0
}

/// One paragraph of a text frame: paragraph-level attributes plus its
/// ordered character ranges. An empty `ranges` list models an empty
/// paragraph (kept so vertical rhythm round-trips).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    #[serde(default)]
    pub justification: Justification,

    /// Leading (line height) in points.
    #[serde(default)]
    pub leading: f64,

    /// Space above the paragraph in points.
    #[serde(default)]
    pub space_before: f64,

    /// Space below the paragraph in points.
    #[serde(default)]
    pub space_after: f64,

    #[serde(default)]
    pub ranges: Vec<CharacterRange>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.ranges.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() || self.ranges.iter().all(|r| r.text.is_empty())
    }
}

/// Styling of the path an area-text frame sits in. A filled or stroked text
/// path renders as a box around the HTML text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPathStyle {
    #[serde(default)]
    pub filled: bool,
    pub fill_color: Option<Color>,
    #[serde(default)]
    pub stroked: bool,
    pub stroke_color: Option<Color>,
    /// Opacity of the text path, 0-100.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    100.0
}

/// A text frame: kind, transform, paragraphs, and the optional note field
/// whose `key: value` annotations can override rendering (e.g. `valign`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFrame {
    pub kind: TextKind,

    #[serde(default)]
    pub matrix: Matrix,

    /// Free-form note attribute carrying `key: value` data annotations.
    pub note: Option<String>,

    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,

    /// Styling of the frame's text path, for area text drawn in a box.
    pub text_path: Option<TextPathStyle>,
}

impl TextFrame {
    /// The frame's full text contents, paragraphs joined with newlines.
    pub fn contents(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_rotated(&self) -> bool {
        self.matrix.is_rotated()
    }

    /// The first character range of the frame, used for frame-level
    /// attributes the host only reports per character (scaling).
    pub fn first_range(&self) -> Option<&CharacterRange> {
        self.paragraphs.iter().flat_map(|p| p.ranges.iter()).next()
    }
}
