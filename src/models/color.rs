use serde::{Deserialize, Serialize};

/// A paint color as reported by the host application.
///
/// The converter only fully supports RGB documents; the other variants exist
/// so that content authored in the wrong color space can be detected and
/// reported instead of silently miscolored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Color {
    /// An RGB color with 0-255 channel values.
    Rgb(RgbColor),
    /// A grayscale color, 0 (white) to 100 (black).
    Gray(GrayColor),
    /// A spot color resolving to an inner process color. In an RGB document
    /// the inner color is expected to be RGB.
    Spot(Box<Color>),
    /// A CMYK color. Unsupported for text fills; triggers a warning.
    Cmyk(CmykColor),
    /// No fill at all.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RgbColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrayColor {
    pub gray: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmykColor {
    pub cyan: f64,
    pub magenta: f64,
    pub yellow: f64,
    pub black: f64,
}

impl Color {
    pub fn rgb(red: f64, green: f64, blue: f64) -> Color {
        Color::Rgb(RgbColor { red, green, blue })
    }

    /// Resolves spot colors to their inner process color.
    pub fn resolved(&self) -> &Color {
        match self {
            Color::Spot(inner) => inner.resolved(),
            other => other,
        }
    }
}

/// A blending mode attached to a layer or page item. Only multiply has a
/// CSS equivalent; anything else non-normal produces a warning downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    ColorBlend,
    Luminosity,
}

impl BlendMode {
    /// The CSS `mix-blend-mode` value, where one exists.
    pub fn css_value(&self) -> Option<&'static str> {
        match self {
            BlendMode::Multiply => Some("multiply"),
            _ => None,
        }
    }

    /// The host-facing name used in warning messages.
    pub fn host_name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "BlendModes.NORMAL",
            BlendMode::Multiply => "BlendModes.MULTIPLY",
            BlendMode::Screen => "BlendModes.SCREEN",
            BlendMode::Overlay => "BlendModes.OVERLAY",
            BlendMode::Darken => "BlendModes.DARKEN",
            BlendMode::Lighten => "BlendModes.LIGHTEN",
            BlendMode::ColorDodge => "BlendModes.COLORDODGE",
            BlendMode::ColorBurn => "BlendModes.COLORBURN",
            BlendMode::HardLight => "BlendModes.HARDLIGHT",
            BlendMode::SoftLight => "BlendModes.SOFTLIGHT",
            BlendMode::Difference => "BlendModes.DIFFERENCE",
            BlendMode::Exclusion => "BlendModes.EXCLUSION",
            BlendMode::Hue => "BlendModes.HUE",
            BlendMode::Saturation => "BlendModes.SATURATIONBLEND",
            BlendMode::ColorBlend => "BlendModes.COLORBLEND",
            BlendMode::Luminosity => "BlendModes.LUMINOSITY",
        }
    }
}
