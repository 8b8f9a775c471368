//! The configuration object threaded through every pipeline component.
//!
//! Settings arrive as loosely-typed key/value pairs (the host UI stores
//! them as strings); [`DocSettings::from_values`] merges them over the
//! documented defaults, warning about unrecognized keys instead of
//! rejecting them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::report::Report;

/// Output image formats. `Auto` resolves per artboard: jpg when the
/// artboard contains visible raster content, png otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Auto,
    Png,
    Png24,
    Jpg,
    Svg,
}

impl ImageFormat {
    pub fn parse(s: &str) -> Option<ImageFormat> {
        match s.trim() {
            "auto" => Some(ImageFormat::Auto),
            "png" => Some(ImageFormat::Png),
            "png24" => Some(ImageFormat::Png24),
            "jpg" | "jpeg" => Some(ImageFormat::Jpg),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    /// The file extension (png24 files are plain .png).
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Svg => "svg",
            _ => "png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Responsiveness {
    Fixed,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    #[serde(rename = "one-file")]
    OneFile,
    #[serde(rename = "multiple-files")]
    MultipleFiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderTextAs {
    Html,
    Image,
}

/// One entry of the font table: the CSS font-family stack for a host font
/// stem, with an optional vertical shift (a percentage of the font size,
/// e.g. `"7%"`) for fonts whose baseline sits off the CSS baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontMapping {
    Family(String),
    Detailed {
        family: String,
        #[serde(default)]
        vshift: Option<String>,
    },
}

impl FontMapping {
    pub fn family(&self) -> &str {
        match self {
            FontMapping::Family(f) => f,
            FontMapping::Detailed { family, .. } => family,
        }
    }

    pub fn vshift(&self) -> Option<&str> {
        match self {
            FontMapping::Family(_) => None,
            FontMapping::Detailed { vshift, .. } => vshift.as_deref(),
        }
    }
}

/// User-authored custom code blocks appended to the output at defined
/// insertion points. The bare `html` block is deprecated in favor of
/// `html_before` / `html_after`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomBlocks {
    pub css: Vec<String>,
    pub html_before: Vec<String>,
    pub html_after: Vec<String>,
    pub html: Vec<String>,
    pub js: Vec<String>,
}

/// Document-level conversion settings with their documented defaults.
#[derive(Debug, Clone)]
pub struct DocSettings {
    /// Prefix for every generated HTML id and class name.
    pub namespace: String,
    /// Ordered list of artboard image formats; the first becomes the embed.
    pub image_format: Vec<ImageFormat>,
    /// Disable to skip all image/vector capture passes.
    pub write_image_files: bool,
    pub responsiveness: Responsiveness,
    pub text_responsiveness: Responsiveness,
    /// Optional max-width (px) applied to the output container.
    pub max_width: Option<f64>,
    pub output: OutputMode,
    /// Overrides the document slug as the output name.
    pub project_name: String,
    pub html_output_path: String,
    pub html_output_extension: String,
    pub image_output_path: String,
    /// Path prefix used in generated image URLs.
    pub image_source_path: String,
    pub image_alt_text: String,
    pub alt_text: String,
    pub aria_role: String,
    /// Wraps the whole graphic in a link when set.
    pub clickable_link: String,
    pub png_transparent: bool,
    /// Colors in 8-bit PNG output, 1-256.
    pub png_number_of_colors: u32,
    /// JPEG quality, 0-100.
    pub jpg_quality: u32,
    pub center_html_output: bool,
    /// Capture at 2x pixel scale when the pixel budget allows it.
    pub use_2x_images_if_possible: bool,
    pub use_lazy_loader: bool,
    /// Emit data-min-width/data-max-width attributes on artboard divs.
    pub include_resizer_widths: bool,
    /// Use container queries for breakpoint switching; when off, a width
    /// binding in the component script drives visibility instead.
    pub include_resizer_css: bool,
    /// Embed background SVG inline instead of referencing a file.
    pub inline_svg: bool,
    /// Prefix applied to rewritten SVG ids to disambiguate them from other
    /// ids on the page.
    pub svg_id_prefix: String,
    pub svg_embed_images: bool,
    pub render_text_as: RenderTextAs,
    pub render_rotated_skewed_text_as: RenderTextAs,
    /// Render text in both the background image and HTML, for checking
    /// HTML text placement.
    pub testing_mode: bool,
    /// Fixed output width in px for promo-image capture.
    pub image_width: Option<f64>,
    /// Font table: host font-name stem to CSS font-family mapping.
    pub fonts: IndexMap<String, FontMapping>,
    /// Internal: set when duplicate artboard names were found, so that
    /// image and container ids get a width-based disambiguator.
    pub grouped_artboards: bool,
}

impl Default for DocSettings {
    fn default() -> Self {
        DocSettings {
            namespace: "g-".to_string(),
            image_format: vec![ImageFormat::Auto],
            write_image_files: true,
            responsiveness: Responsiveness::Fixed,
            text_responsiveness: Responsiveness::Dynamic,
            max_width: None,
            output: OutputMode::OneFile,
            project_name: String::new(),
            html_output_path: "artboard-output/".to_string(),
            html_output_extension: ".html".to_string(),
            image_output_path: "artboard-output/".to_string(),
            image_source_path: String::new(),
            image_alt_text: String::new(),
            alt_text: String::new(),
            aria_role: String::new(),
            clickable_link: String::new(),
            png_transparent: false,
            png_number_of_colors: 128,
            jpg_quality: 60,
            center_html_output: true,
            use_2x_images_if_possible: true,
            use_lazy_loader: true,
            include_resizer_widths: true,
            include_resizer_css: true,
            inline_svg: false,
            svg_id_prefix: String::new(),
            svg_embed_images: false,
            render_text_as: RenderTextAs::Html,
            render_rotated_skewed_text_as: RenderTextAs::Html,
            testing_mode: false,
            image_width: None,
            fonts: IndexMap::new(),
            grouped_artboards: false,
        }
    }
}

/// Accepts the host UI's loose true/yes spellings.
fn value_is_true(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "yes",
        _ => false,
    }
}

fn value_as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DocSettings {
    /// Merges loosely-typed overrides onto the defaults. Unknown keys warn;
    /// recognized keys with unparseable values fall back to the default.
    pub fn from_values(values: &IndexMap<String, Value>, report: &mut Report) -> DocSettings {
        let mut s = DocSettings::default();
        for (key, value) in values {
            s.apply_one(key, value, report);
        }
        s.validate(report);
        s
    }

    fn apply_one(&mut self, key: &str, value: &Value, report: &mut Report) {
        match key {
            "namespace" => self.namespace = value_as_string(value),
            "image_format" => self.image_format = parse_format_list(value, report),
            "write_image_files" => self.write_image_files = value_is_true(value),
            "responsiveness" => {
                self.responsiveness = parse_responsiveness(value, self.responsiveness)
            }
            "text_responsiveness" => {
                self.text_responsiveness = parse_responsiveness(value, self.text_responsiveness)
            }
            "max_width" => self.max_width = value_as_number(value).filter(|w| *w > 0.0),
            "output" => {
                self.output = match value_as_string(value).as_str() {
                    "multiple-files" => OutputMode::MultipleFiles,
                    _ => OutputMode::OneFile,
                }
            }
            "project_name" => self.project_name = value_as_string(value),
            "html_output_path" => self.html_output_path = value_as_string(value),
            "html_output_extension" => self.html_output_extension = value_as_string(value),
            "image_output_path" => self.image_output_path = value_as_string(value),
            "image_source_path" => self.image_source_path = value_as_string(value),
            "image_alt_text" => self.image_alt_text = value_as_string(value),
            "alt_text" => self.alt_text = value_as_string(value),
            "aria_role" => self.aria_role = value_as_string(value),
            "clickable_link" => self.clickable_link = value_as_string(value),
            "png_transparent" => self.png_transparent = value_is_true(value),
            "png_number_of_colors" => {
                if let Some(n) = value_as_number(value) {
                    self.png_number_of_colors = n as u32;
                }
            }
            "jpg_quality" => {
                if let Some(n) = value_as_number(value) {
                    self.jpg_quality = n as u32;
                }
            }
            "center_html_output" => self.center_html_output = value_is_true(value),
            "use_2x_images_if_possible" => self.use_2x_images_if_possible = value_is_true(value),
            "use_lazy_loader" => self.use_lazy_loader = value_is_true(value),
            "include_resizer_widths" => self.include_resizer_widths = value_is_true(value),
            "include_resizer_css" => self.include_resizer_css = value_is_true(value),
            "inline_svg" => self.inline_svg = value_is_true(value),
            "svg_id_prefix" => self.svg_id_prefix = value_as_string(value),
            "svg_embed_images" => self.svg_embed_images = value_is_true(value),
            "render_text_as" => self.render_text_as = parse_render_text(value, self.render_text_as),
            "render_rotated_skewed_text_as" => {
                self.render_rotated_skewed_text_as =
                    parse_render_text(value, self.render_rotated_skewed_text_as)
            }
            "testing_mode" => self.testing_mode = value_is_true(value),
            "image_width" => self.image_width = value_as_number(value).filter(|w| *w > 0.0),
            "fonts" => {
                if let Value::Object(map) = value {
                    self.fonts = map
                        .iter()
                        .filter_map(|(k, v)| {
                            serde_json::from_value::<FontMapping>(v.clone())
                                .ok()
                                .map(|m| (k.clone(), m))
                        })
                        .collect();
                }
            }
            other => {
                report.warn(format!(
                    "Settings block contains an unused parameter: {other}"
                ));
            }
        }
    }

    fn validate(&mut self, report: &mut Report) {
        if self.png_number_of_colors < 1 || self.png_number_of_colors > 256 {
            report.warn(format!(
                "png_number_of_colors must be between 1 and 256 (got {}).",
                self.png_number_of_colors
            ));
            self.png_number_of_colors = self.png_number_of_colors.clamp(1, 256);
        }
        if self.jpg_quality > 100 {
            report.warn(format!(
                "jpg_quality must be between 0 and 100 (got {}).",
                self.jpg_quality
            ));
            self.jpg_quality = 100;
        }
    }
}

fn parse_responsiveness(value: &Value, default: Responsiveness) -> Responsiveness {
    match value_as_string(value).as_str() {
        "fixed" => Responsiveness::Fixed,
        "dynamic" => Responsiveness::Dynamic,
        _ => default,
    }
}

fn parse_render_text(value: &Value, default: RenderTextAs) -> RenderTextAs {
    match value_as_string(value).as_str() {
        "html" => RenderTextAs::Html,
        "image" => RenderTextAs::Image,
        _ => default,
    }
}

/// `image_format` accepts a JSON array or a comma/space separated string.
fn parse_format_list(value: &Value, report: &mut Report) -> Vec<ImageFormat> {
    let names: Vec<String> = match value {
        Value::Array(items) => items.iter().map(value_as_string).collect(),
        other => value_as_string(other)
            .split([',', ' '])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    };
    let mut formats = Vec::new();
    for name in names {
        match ImageFormat::parse(&name) {
            Some(fmt) => formats.push(fmt),
            None => report.warn(format!("Unsupported image format: {name}")),
        }
    }
    formats
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn unknown_keys_warn_but_do_not_reject() {
        let mut report = Report::new();
        let s = DocSettings::from_values(
            &values(&[("responsiveness", json!("dynamic")), ("bogus_key", json!(1))]),
            &mut report,
        );
        assert_eq!(s.responsiveness, Responsiveness::Dynamic);
        assert!(report.warnings().iter().any(|w| w.contains("bogus_key")));
    }

    #[test]
    fn image_format_accepts_string_lists() {
        let mut report = Report::new();
        let s = DocSettings::from_values(
            &values(&[("image_format", json!("png,svg"))]),
            &mut report,
        );
        assert_eq!(s.image_format, vec![ImageFormat::Png, ImageFormat::Svg]);
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn bad_format_names_warn() {
        let mut report = Report::new();
        let s = DocSettings::from_values(
            &values(&[("image_format", json!(["png", "webp"]))]),
            &mut report,
        );
        assert_eq!(s.image_format, vec![ImageFormat::Png]);
        assert!(report
            .warnings()
            .iter()
            .any(|w| w.contains("Unsupported image format: webp")));
    }

    #[test]
    fn loose_boolean_spellings_are_accepted() {
        let mut report = Report::new();
        let s = DocSettings::from_values(
            &values(&[("inline_svg", json!("yes")), ("use_lazy_loader", json!("false"))]),
            &mut report,
        );
        assert!(s.inline_svg);
        assert!(!s.use_lazy_loader);
    }

    #[test]
    fn numeric_knobs_are_clamped_with_warnings() {
        let mut report = Report::new();
        let s = DocSettings::from_values(
            &values(&[("png_number_of_colors", json!(300)), ("jpg_quality", json!(120))]),
            &mut report,
        );
        assert_eq!(s.png_number_of_colors, 256);
        assert_eq!(s.jpg_quality, 100);
        assert_eq!(report.warnings().len(), 2);
    }
}
