//! Text style extraction and CSS deduplication.
//!
//! Converts the per-character and per-paragraph styling of the selected
//! text frames into a minimal set of CSS classes: one elected base `<p>`
//! style, paragraph classes for paragraphs that differ from the base, and
//! character classes for runs that differ from their paragraph. Class
//! numbering is first-seen order and nothing else, so re-running the
//! extraction over the same input reproduces identical CSS.

use regex::Regex;

use super::constants::{CSS_PRECISION, POINT_TEXT_WIDTH_PAD, TEXT_SAMPLE_LEN};
use super::utils::{
    clean_html_text, convert_color, find_html_tag, fmt_number, format_css_pct, format_css_rule,
    round_to, straighten_curly_quotes_inside_angle_brackets, truncate_string,
};
use super::visibility::{DocIndex, IndexedItem};
use crate::models::{
    Artboard, BlendMode, Bounds, Capitalization, CharacterRange, CssBox, Justification, Matrix,
    PageItem, Paragraph, TextFrame, TextKind,
};
use crate::models::name::{make_keyword, parse_data_attributes};
use crate::report::Report;
use crate::settings::{DocSettings, RenderTextAs, Responsiveness};

// ---------------------------------------------------------------------------
// Derived CSS text style
// ---------------------------------------------------------------------------

/// The closed set of CSS properties tracked for text styling.
///
/// Two styles are equal iff their [`CssTextStyle::key`] values are equal;
/// the key concatenates the fixed property list below in order. `top` is
/// carried for vertical-shift fonts but is deliberately not part of the
/// key (it always travels with `position`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CssTextStyle {
    pub position: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub font_style: Option<String>,
    pub color: Option<String>,
    pub line_height: Option<String>,
    pub height: Option<String>,
    pub letter_spacing: Option<String>,
    pub opacity: Option<String>,
    pub padding_top: Option<String>,
    pub padding_bottom: Option<String>,
    pub text_align: Option<String>,
    pub text_transform: Option<String>,
    pub mix_blend_mode: Option<String>,
    pub vertical_align: Option<String>,
    pub top: Option<String>,
}

impl CssTextStyle {
    fn fields(&self) -> [(&'static str, &Option<String>); 17] {
        [
            ("position", &self.position),
            ("font-family", &self.font_family),
            ("font-size", &self.font_size),
            ("font-weight", &self.font_weight),
            ("font-style", &self.font_style),
            ("color", &self.color),
            ("line-height", &self.line_height),
            ("height", &self.height),
            ("letter-spacing", &self.letter_spacing),
            ("opacity", &self.opacity),
            ("padding-top", &self.padding_top),
            ("padding-bottom", &self.padding_bottom),
            ("text-align", &self.text_align),
            ("text-transform", &self.text_transform),
            ("mix-blend-mode", &self.mix_blend_mode),
            ("vertical-align", &self.vertical_align),
            ("top", &self.top),
        ]
    }

    fn field_mut(&mut self, name: &str) -> &mut Option<String> {
        match name {
            "position" => &mut self.position,
            "font-family" => &mut self.font_family,
            "font-size" => &mut self.font_size,
            "font-weight" => &mut self.font_weight,
            "font-style" => &mut self.font_style,
            "color" => &mut self.color,
            "line-height" => &mut self.line_height,
            "height" => &mut self.height,
            "letter-spacing" => &mut self.letter_spacing,
            "opacity" => &mut self.opacity,
            "padding-top" => &mut self.padding_top,
            "padding-bottom" => &mut self.padding_bottom,
            "text-align" => &mut self.text_align,
            "text-transform" => &mut self.text_transform,
            "mix-blend-mode" => &mut self.mix_blend_mode,
            "vertical-align" => &mut self.vertical_align,
            "top" => &mut self.top,
            other => unreachable!("unknown css text property {other}"),
        }
    }

    /// Stable serialization of the fixed property list; the deduplication
    /// key.
    pub fn key(&self) -> String {
        let mut key = String::new();
        for (name, value) in self.fields() {
            if name == "top" {
                continue;
            }
            key.push('~');
            if let Some(v) = value {
                key.push_str(v);
            }
        }
        key
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }

    /// Properties set in `self` that are missing or different in `base`.
    pub fn diff(&self, base: &CssTextStyle) -> CssTextStyle {
        let mut out = CssTextStyle::default();
        for ((name, mine), (_, theirs)) in self.fields().iter().zip(base.fields().iter()) {
            if mine.is_some() && mine != theirs {
                *out.field_mut(name) = (*mine).clone();
            }
        }
        out
    }

    /// Overwrites fields of `self` with the fields set in `other`.
    pub fn extend(&mut self, other: &CssTextStyle) {
        let names: Vec<(&'static str, Option<String>)> = other
            .fields()
            .iter()
            .map(|(n, v)| (*n, (*v).clone()))
            .collect();
        for (name, value) in names {
            if value.is_some() {
                *self.field_mut(name) = value;
            }
        }
    }

    /// The set properties in declaration order, for CSS emission.
    pub fn declarations(&self) -> Vec<(&'static str, String)> {
        self.fields()
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (*name, v.clone())))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Host-style records
// ---------------------------------------------------------------------------

/// Style attributes read from the host before conversion to CSS. Paragraph
/// records carry both paragraph-level attributes and (after merging) the
/// dominant character attributes of the paragraph.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AiTextStyle {
    aifont: Option<String>,
    size: Option<f64>,
    color: Option<String>,
    capitalization: Option<Capitalization>,
    tracking: Option<f64>,
    superscript: bool,
    subscript: bool,
    leading: Option<f64>,
    space_before: Option<f64>,
    space_after: Option<f64>,
    justification: Option<Justification>,
    rotated: bool,
    opacity: Option<f64>,
    blend: Option<BlendMode>,
    frame_kind: Option<TextKind>,
}

impl AiTextStyle {
    /// Folds character-level attributes into a paragraph-level record.
    fn merge_char(&mut self, c: &AiTextStyle) {
        if c.aifont.is_some() {
            self.aifont = c.aifont.clone();
        }
        if c.size.is_some() {
            self.size = c.size;
        }
        if c.color.is_some() {
            self.color = c.color.clone();
        }
        if c.capitalization.is_some() {
            self.capitalization = c.capitalization;
        }
        if c.tracking.is_some() {
            self.tracking = c.tracking;
        }
        self.superscript = c.superscript;
        self.subscript = c.subscript;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RangeData {
    text: String,
    ai: AiTextStyle,
    warning: Option<String>,
    css: CssTextStyle,
}

#[derive(Debug, Clone)]
pub(crate) struct ParagraphData {
    text: String,
    ai: AiTextStyle,
    ranges: Vec<RangeData>,
    css: CssTextStyle,
}

fn get_char_style(range: &CharacterRange) -> (AiTextStyle, Option<String>) {
    let converted = convert_color(range.fill.as_ref(), None);
    let style = AiTextStyle {
        aifont: Some(range.font.clone()),
        size: Some(range.size.round()),
        color: Some(converted.css),
        capitalization: match range.capitalization {
            Capitalization::Normal => None,
            other => Some(other),
        },
        tracking: Some(range.tracking),
        superscript: range.baseline == crate::models::BaselinePosition::Superscript,
        subscript: range.baseline == crate::models::BaselinePosition::Subscript,
        ..AiTextStyle::default()
    };
    (style, converted.warning)
}

fn get_paragraph_style(p: &Paragraph) -> AiTextStyle {
    AiTextStyle {
        leading: Some(p.leading.round()),
        space_before: Some(p.space_before.round()),
        space_after: Some(p.space_after.round()),
        justification: Some(p.justification),
        ..AiTextStyle::default()
    }
}

/// Segments a paragraph into maximal runs sharing one derived style: a run
/// boundary occurs wherever any tracked character attribute changes.
fn get_paragraph_ranges(p: &Paragraph) -> Vec<RangeData> {
    let mut segments: Vec<RangeData> = Vec::new();
    let mut prev: Option<AiTextStyle> = None;
    for range in &p.ranges {
        let (style, warning) = get_char_style(range);
        let same = prev.as_ref().map_or(false, |p| *p == style);
        if !same {
            segments.push(RangeData {
                text: String::new(),
                ai: style.clone(),
                warning: None,
                css: CssTextStyle::default(),
            });
        }
        let current = segments.last_mut().expect("segment exists");
        if warning.is_some() {
            current.warning = warning;
        }
        current.text.push_str(&range.text);
        prev = Some(style);
    }
    segments
}

/// Converts a text frame into one data record per paragraph. Empty
/// paragraphs become placeholder records so vertical rhythm round-trips.
pub(crate) fn import_text_frame_paragraphs(
    frame: &TextFrame,
    entry: &IndexedItem,
) -> Vec<ParagraphData> {
    let rotated = frame.is_rotated();
    let blend = match entry.blend {
        BlendMode::Normal => None,
        other => Some(other),
    };
    let mut data = Vec::with_capacity(frame.paragraphs.len());
    for p in &frame.paragraphs {
        if p.is_empty() {
            data.push(ParagraphData {
                text: String::new(),
                ai: AiTextStyle::default(),
                ranges: Vec::new(),
                css: CssTextStyle::default(),
            });
            continue;
        }
        let mut ai = get_paragraph_style(p);
        ai.rotated = rotated;
        ai.opacity = Some(entry.opacity);
        ai.blend = blend;
        ai.frame_kind = Some(frame.kind);
        data.push(ParagraphData {
            text: p.text(),
            ai,
            ranges: get_paragraph_ranges(p),
            css: CssTextStyle::default(),
        });
    }
    data
}

// ---------------------------------------------------------------------------
// Font resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct FontInfo {
    family: Option<String>,
    weight: Option<String>,
    style: Option<String>,
    vshift: Option<String>,
}

fn css_weight(token: &str) -> &'static str {
    match token.to_ascii_lowercase().as_str() {
        "bold" => "700",
        "black" => "900",
        "light" => "300",
        "extralight" | "extra-light" => "200",
        "regular" => "400",
        "semibold" | "semi-bold" => "600",
        "medium" => "500",
        "ultra-light" | "ultralight" => "100",
        _ => "400",
    }
}

/// Resolves a host font name against the settings font table: the family
/// comes from the table (keyed by the name stem), weight and style are
/// matched out of the name itself.
fn find_font_info(aifont: &str, settings: &DocSettings) -> FontInfo {
    let weight_re =
        Regex::new(r"(?i)(semi-?bold|bold|black|extra-?light|light|regular|medium|ultra-?light)")
            .unwrap();
    // some families spell italic as a "...It" suffix on the weight name
    let style_re =
        Regex::new(r"(?i)(italic|(?:semi-?bold|bold|black|extra-?light|light|regular)it)").unwrap();

    let stem = aifont.split('-').next().unwrap_or(aifont);
    let mapping = settings.fonts.get(stem);
    FontInfo {
        family: mapping.map(|m| m.family().to_string()),
        weight: Some(
            weight_re
                .captures(aifont)
                .map(|caps| css_weight(&caps[1]).to_string())
                .unwrap_or_else(|| "400".to_string()),
        ),
        style: style_re.is_match(aifont).then(|| "italic".to_string()),
        vshift: mapping.and_then(|m| m.vshift().map(str::to_string)),
    }
}

fn vshift_to_pixels(vshift: &str, font_size: f64) -> String {
    if !vshift.contains('%') {
        return "0".to_string();
    }
    let pct: f64 = vshift.trim_end_matches('%').parse().unwrap_or(0.0);
    let px = font_size * pct / 100.0;
    if px == 0.0 {
        return "0".to_string();
    }
    format!("{}px", fmt_number(round_to(px, 1)))
}

// ---------------------------------------------------------------------------
// Host style -> CSS conversion
// ---------------------------------------------------------------------------

/// Converts a host-style record into CSS text properties.
fn convert_ai_text_style(ai: &AiTextStyle, settings: &DocSettings) -> CssTextStyle {
    let mut css = CssTextStyle::default();
    let mut font_size = ai.size.unwrap_or(0.0);
    let mut font_info = FontInfo::default();

    if let Some(aifont) = &ai.aifont {
        font_info = find_font_info(aifont, settings);
        if let Some(family) = &font_info.family {
            if !family.is_empty() {
                css.font_family = Some(family.clone());
            }
        }
        css.font_weight = font_info.weight.clone();
        css.font_style = font_info.style.clone();
    }
    if let Some(leading) = ai.leading {
        css.line_height = Some(format!("{}px", fmt_number(leading)));
        // line-height alone misplaces point text at certain browser zooms
        if ai.frame_kind == Some(TextKind::Point) {
            css.height = css.line_height.clone();
        }
    }
    if let Some(opacity) = ai.opacity {
        css.opacity = Some(fmt_number(round_to(opacity / 100.0, CSS_PRECISION)));
    }
    if let Some(blend) = ai.blend {
        if let Some(value) = blend.css_value() {
            css.mix_blend_mode = Some(value.to_string());
        }
    }
    if let Some(space) = ai.space_before.filter(|s| *s > 0.0) {
        css.padding_top = Some(format!("{}px", fmt_number(space)));
    }
    if let Some(space) = ai.space_after.filter(|s| *s > 0.0) {
        css.padding_bottom = Some(format!("{}px", fmt_number(space)));
    }
    if let Some(tracking) = ai.tracking {
        css.letter_spacing = Some(format!(
            "{}em",
            fmt_number(round_to(tracking / 1000.0, CSS_PRECISION))
        ));
    }
    if ai.superscript {
        font_size = round_to(font_size * 0.7, 1);
        css.vertical_align = Some("super".to_string());
    }
    if ai.subscript {
        font_size = round_to(font_size * 0.7, 1);
        css.vertical_align = Some("sub".to_string());
    }
    if font_size > 0.0 {
        css.font_size = Some(format!("{}px", fmt_number(font_size)));
    }
    // alignment of rotated point text is handled as a special case; see
    // also the frame-level transform in text_frame_css()
    if ai.rotated && ai.frame_kind == Some(TextKind::Point) {
        css.text_align = Some("center".to_string());
    } else if let Some(justification) = ai.justification {
        css.text_align = Some(justification.css_value().to_string());
    }
    if let Some(capitalization) = ai.capitalization {
        if let Some(value) = capitalization.css_value() {
            css.text_transform = Some(value.to_string());
        }
    }
    if let Some(color) = &ai.color {
        css.color = Some(color.clone());
    }
    // vertical shift is only applied to point text
    if let Some(size) = ai.size.filter(|s| *s > 0.0) {
        if ai.frame_kind == Some(TextKind::Point) {
            if let Some(vshift) = &font_info.vshift {
                css.top = Some(vshift_to_pixels(vshift, size));
                css.position = Some("relative".to_string());
            }
        }
    }
    css
}

// ---------------------------------------------------------------------------
// Style election and deduplication
// ---------------------------------------------------------------------------

struct StyleRecord {
    key: String,
    ai: AiTextStyle,
    css: CssTextStyle,
    count: usize,
}

fn analyze_text_style(
    ai: &AiTextStyle,
    text: &str,
    styles: &mut Vec<StyleRecord>,
    settings: &DocSettings,
) -> CssTextStyle {
    let css = convert_ai_text_style(ai, settings);
    if text.is_empty() {
        return CssTextStyle::default();
    }
    let key = css.key();
    match styles.iter_mut().find(|s| s.key == key) {
        Some(record) => record.count += text.chars().count(),
        None => styles.push(StyleRecord {
            key,
            ai: ai.clone(),
            css: css.clone(),
            count: text.chars().count(),
        }),
    }
    css
}

/// Computes the base paragraph style (the style used by the greatest total
/// character count across all frames), and fills in the derived CSS on
/// every paragraph and range record along the way.
pub(crate) fn derive_text_style_css(
    frame_data: &mut [Vec<ParagraphData>],
    settings: &DocSettings,
    report: &mut Report,
) -> CssTextStyle {
    let mut pg_styles: Vec<StyleRecord> = Vec::new();

    for paragraphs in frame_data.iter_mut() {
        for pdata in paragraphs.iter_mut() {
            let mut char_styles: Vec<StyleRecord> = Vec::new();
            for range in pdata.ranges.iter_mut() {
                range.css = analyze_text_style(&range.ai, &range.text, &mut char_styles, settings);
                if let Some(warning) = &range.warning {
                    report.warn(
                        warning.replace("%s", &truncate_string(&range.text, TEXT_SAMPLE_LEN, false)),
                    );
                }
                if let Some(aifont) = &range.ai.aifont {
                    if range.css.font_family.is_none() {
                        report.warn_once(
                            format!(
                                "Missing a rule for converting font: {}. Sample text: {}",
                                aifont,
                                truncate_string(&range.text, TEXT_SAMPLE_LEN, false)
                            ),
                            Some(aifont),
                        );
                    }
                }
            }
            if !char_styles.is_empty() {
                // fold the dominant character style into the paragraph, to
                // avoid wrapping all of its text in <span> tags
                char_styles.sort_by(|a, b| b.count.cmp(&a.count));
                pdata.ai.merge_char(&char_styles[0].ai);
            }
            pdata.css = analyze_text_style(&pdata.ai, &pdata.text, &mut pg_styles, settings);
            if let Some(blend) = pdata.ai.blend {
                if pdata.css.mix_blend_mode.is_none() {
                    report.warn_once(
                        format!(
                            "Missing a rule for converting {} to CSS.",
                            blend.host_name()
                        ),
                        None,
                    );
                }
            }
        }
    }

    let mut base = CssTextStyle::default();
    if !pg_styles.is_empty() {
        pg_styles.sort_by(|a, b| b.count.cmp(&a.count));
        base = pg_styles[0].css.clone();
    }
    // overridden defaults layered on top, for predictable fallbacks
    base.extend(&CssTextStyle {
        text_align: Some("left".to_string()),
        text_transform: Some("none".to_string()),
        padding_bottom: Some("0".to_string()),
        padding_top: Some("0".to_string()),
        mix_blend_mode: Some("normal".to_string()),
        font_style: Some("normal".to_string()),
        font_weight: Some("regular".to_string()),
        height: Some("auto".to_string()),
        opacity: Some("1".to_string()),
        position: Some("static".to_string()),
        ..CssTextStyle::default()
    });
    base
}

/// Registry of deduplicated style classes. Names are
/// `<namespace><prefix><n>` where `n` is the first-seen index of the
/// style's key within this collection.
pub(crate) struct StyleClassRegistry {
    namespace: String,
    prefix: String,
    classes: Vec<(String, CssTextStyle, String)>,
}

impl StyleClassRegistry {
    fn new(namespace: &str, prefix: &str) -> StyleClassRegistry {
        StyleClassRegistry {
            namespace: namespace.to_string(),
            prefix: prefix.to_string(),
            classes: Vec::new(),
        }
    }

    fn class_for(&mut self, style: &CssTextStyle) -> String {
        let key = style.key();
        for (existing_key, _, classname) in &self.classes {
            if *existing_key == key {
                return classname.clone();
            }
        }
        let classname = format!("{}{}{}", self.namespace, self.prefix, self.classes.len());
        self.classes
            .push((key, style.clone(), classname.clone()));
        classname
    }

    fn rules(&self) -> impl Iterator<Item = String> + '_ {
        self.classes.iter().map(|(_, style, classname)| {
            format_css_rule(&format!(".{classname}"), &style.declarations())
        })
    }
}

// ---------------------------------------------------------------------------
// HTML generation
// ---------------------------------------------------------------------------

fn clean_html_tags(text: &str, report: &mut Report) -> String {
    if let Some(tag) = find_html_tag(text) {
        if ["i", "span", "b", "strong", "em"].contains(&tag.to_ascii_lowercase().as_str()) {
            report.warn_once(
                format!("Found a <{tag}> tag. Try using the drawing application's formatting instead."),
                None,
            );
        }
        straighten_curly_quotes_inside_angle_brackets(text)
    } else {
        text.to_string()
    }
}

fn generate_paragraph_html(
    pdata: &ParagraphData,
    base_style: &CssTextStyle,
    p_styles: &mut StyleClassRegistry,
    c_styles: &mut StyleClassRegistry,
    report: &mut Report,
) -> String {
    if pdata.text.is_empty() {
        // an empty paragraph holds one line of vertical rhythm
        return "<p>&nbsp;</p>".to_string();
    }
    let diff = pdata.css.diff(base_style);
    let mut html = if diff.is_empty() {
        "<p>".to_string()
    } else {
        format!("<p class=\"{}\">", p_styles.class_for(&diff))
    };
    for range in &pdata.ranges {
        let mut range_html = clean_html_text(&clean_html_tags(&range.text, report));
        let diff = range.css.diff(&pdata.css);
        if !diff.is_empty() {
            range_html = format!(
                "<span class=\"{}\">{}</span>",
                c_styles.class_for(&diff),
                range_html
            );
        }
        html.push_str(&range_html);
    }
    html.push_str("</p>");
    html
}

fn generate_text_frame_html(
    paragraphs: &[ParagraphData],
    base_style: &CssTextStyle,
    p_styles: &mut StyleClassRegistry,
    c_styles: &mut StyleClassRegistry,
    report: &mut Report,
) -> String {
    let mut html = String::new();
    for pdata in paragraphs {
        html.push_str("\n\t\t\t");
        html.push_str(&generate_paragraph_html(
            pdata, base_style, p_styles, c_styles, report,
        ));
    }
    html
}

// ---------------------------------------------------------------------------
// Frame geometry and placement CSS
// ---------------------------------------------------------------------------

/// Recovers the approximate pre-rotation bounds of a transformed frame by
/// mapping its bounds center through the inverse rotation and solving the
/// axis-aligned box equations for the untransformed size.
fn untransformed_bounds(bounds: &Bounds, matrix: &Matrix) -> Bounds {
    let rot = matrix.without_translation();
    let inv = match rot.inverse() {
        Some(m) => m,
        None => return *bounds,
    };
    let theta = rot.rotation_degrees().to_radians();
    let (c, s) = (theta.cos().abs(), theta.sin().abs());
    let det = c * c - s * s;
    if det.abs() < 1e-6 {
        return *bounds;
    }
    let (tw, th) = (bounds.width(), bounds.height());
    let w = (tw * c - th * s) / det;
    let h = (th * c - tw * s) / det;
    if w <= 0.0 || h <= 0.0 {
        return *bounds;
    }
    let (cx, cy) = (
        (bounds.left + bounds.right) / 2.0,
        (bounds.top + bounds.bottom) / 2.0,
    );
    let (ux, uy) = inv.apply(cx, cy);
    Bounds::new(ux - w / 2.0, uy + h / 2.0, ux + w / 2.0, uy - h / 2.0)
}

/// The CSS transform for a rotated/skewed frame. The translation is
/// cleared before the matrix is emitted so the transform-origin does not
/// drift with the frame's position; `b` and `c` flip sign to account for
/// the y-down CSS space.
fn transformation_css(
    frame: &TextFrame,
    vert_anchor_pct: f64,
    report: &mut Report,
) -> String {
    let m = frame.matrix.without_translation();
    let transform = format!(
        "matrix({},{},{},{},{},{});",
        fmt_number(round_to(m.a, CSS_PRECISION)),
        fmt_number(round_to(-m.b, CSS_PRECISION)),
        fmt_number(round_to(-m.c, CSS_PRECISION)),
        fmt_number(round_to(m.d, CSS_PRECISION)),
        fmt_number(round_to(m.tx, CSS_PRECISION)),
        fmt_number(round_to(m.ty, CSS_PRECISION)),
    );
    let transform_origin = format!("50% {}%;", fmt_number(round_to(vert_anchor_pct, CSS_PRECISION)));

    if let Some(range) = frame.first_range() {
        if range.horizontal_scale != 100.0 || range.vertical_scale != 100.0 {
            report.warn(format!(
                "Vertical or horizontal text scaling will be lost. Affected text: {}",
                truncate_string(&frame.contents(), TEXT_SAMPLE_LEN, false)
            ));
        }
    }

    format!(
        "transform: {transform}transform-origin: {transform_origin}\
         -webkit-transform: {transform}-webkit-transform-origin: {transform_origin}\
         -ms-transform: {transform}-ms-transform-origin: {transform_origin}"
    )
}

/// A box around area text whose text path is styled.
fn area_text_path_css(frame: &TextFrame) -> String {
    let path = match &frame.text_path {
        Some(path) if path.filled || path.stroked => path,
        _ => return String::new(),
    };
    let mut style = "padding: 6px 6px 6px 7px;".to_string();
    if path.filled {
        let color = convert_color(path.fill_color.as_ref(), Some(path.opacity));
        style.push_str(&format!("background-color: {};", color.css));
    }
    if path.stroked {
        let color = convert_color(path.stroke_color.as_ref(), Some(path.opacity));
        style.push_str(&format!("border: 1px solid {};", color.css));
    }
    style
}

/// Builds the `class` and `style` attributes positioning one text frame's
/// container div over the artboard.
fn text_frame_css(
    entry: &IndexedItem,
    frame: &TextFrame,
    layer_name: &str,
    ab_box: &CssBox,
    pg_data: &[ParagraphData],
    settings: &DocSettings,
    report: &mut Report,
) -> String {
    let mut styles = String::new();
    let namespace = &settings.namespace;

    // frame-level positioning borrows attributes from the first and last
    // paragraphs
    let default_ai = AiTextStyle::default();
    let first = pg_data.first().map(|p| &p.ai).unwrap_or(&default_ai);
    let last = pg_data.last().map(|p| &p.ai).unwrap_or(&default_ai);
    let is_rotated = first.rotated;

    let ai_bounds = if is_rotated {
        untransformed_bounds(&entry.item.geometric_bounds, &frame.matrix)
    } else {
        entry.item.geometric_bounds
    };
    let html_box = ai_bounds.shifted(-ab_box.left, ab_box.top).to_css_box();

    let attributes = frame
        .note
        .as_deref()
        .map(parse_data_attributes)
        .unwrap_or_default();

    // estimated space between the container edges and the glyphs, from the
    // difference between leading and font size
    let first_leading = first.leading.unwrap_or(0.0);
    let first_size = first.size.unwrap_or(0.0);
    let last_leading = last.leading.unwrap_or(0.0);
    let last_size = last.size.unwrap_or(0.0);
    let margin_top_px = (first_leading - first_size) / 2.0 + first.space_before.unwrap_or(0.0);
    let margin_bottom_px = (last_leading - last_size) / 2.0 + last.space_after.unwrap_or(0.0);

    let html_l = html_box.left;
    let html_t = (html_box.top - margin_top_px).round();
    let mut html_w = html_box.width;
    let html_h = html_box.height + margin_top_px + margin_bottom_px;

    let mut alignment = match first.justification {
        Some(Justification::Left) => Some("left"),
        Some(Justification::Right) => Some("right"),
        Some(Justification::Center) => Some("center"),
        _ => None,
    };

    let mut v_align;
    if frame.kind == TextKind::Area {
        v_align = "top".to_string();
        styles.push_str(&area_text_path_css(frame));
    } else {
        // point text anchors to the midline, a sensible default for chart
        // axis labels and map labels
        v_align = "middle".to_string();
        html_w += POINT_TEXT_WIDTH_PAD;
    }

    if let Some(valign) = attributes.get("valign") {
        if !is_rotated {
            v_align = if valign == "center" {
                "middle".to_string()
            } else {
                valign.clone()
            };
        }
    }

    if is_rotated {
        let vert_anchor_pct = (margin_top_px + html_box.height * 0.5 + 1.0) / html_h * 100.0;
        styles.push_str(&transformation_css(frame, vert_anchor_pct, report));
        // only centered alignment renders predictably under rotation
        v_align = "middle".to_string();
        alignment = Some("center");
    }

    if v_align == "bottom" {
        let bottom_px = ab_box.height - (html_box.top + html_box.height + margin_bottom_px);
        styles.push_str(&format!("bottom:{};", format_css_pct(bottom_px, ab_box.height)));
    } else if v_align == "middle" {
        styles.push_str(&format!(
            "top:{};",
            format_css_pct(html_t + margin_top_px + html_box.height / 2.0, ab_box.height)
        ));
        styles.push_str(&format!(
            "margin-top:-{}px;",
            fmt_number(round_to(margin_top_px + html_box.height / 2.0, 1))
        ));
    } else {
        styles.push_str(&format!("top:{};", format_css_pct(html_t, ab_box.height)));
    }

    match alignment {
        Some("right") => {
            styles.push_str(&format!(
                "right:{};",
                format_css_pct(ab_box.width - (html_l + html_box.width), ab_box.width)
            ));
        }
        Some("center") => {
            styles.push_str(&format!(
                "left:{};",
                format_css_pct(html_l + html_box.width / 2.0, ab_box.width)
            ));
            // negative margin recenters the container; pixels for point
            // text because its width is in pixels
            if frame.kind == TextKind::Point {
                styles.push_str(&format!(
                    "margin-left:-{}px;",
                    fmt_number(round_to(html_w / 2.0, 1))
                ));
            } else {
                styles.push_str(&format!(
                    "margin-left:{};",
                    format_css_pct(-html_w / 2.0, ab_box.width)
                ));
            }
        }
        _ => {
            styles.push_str(&format!("left:{};", format_css_pct(html_l, ab_box.width)));
        }
    }

    let mut classes = format!("{namespace}{layer_name} {namespace}abs");
    if frame.kind == TextKind::Point {
        classes.push_str(&format!(" {namespace}pointText"));
        // pixel width: percentage width causes alignment drift for
        // unwrapped text
        styles.push_str(&format!(
            "width:{}px;",
            fmt_number(round_to(html_w, CSS_PRECISION))
        ));
    } else if settings.text_responsiveness == Responsiveness::Fixed {
        styles.push_str(&format!(
            "width:{}px;",
            fmt_number(round_to(html_w, CSS_PRECISION))
        ));
    } else {
        styles.push_str(&format!(
            "width:{};",
            format_css_pct(html_w, ab_box.width)
        ));
    }

    format!("class=\"{classes}\" style=\"{styles}\"")
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// The HTML and style-class CSS produced from one artboard's text frames.
pub struct TextData {
    pub html: String,
    pub styles: Vec<String>,
}

impl TextData {
    pub fn empty() -> TextData {
        TextData {
            html: String::new(),
            styles: Vec::new(),
        }
    }
}

/// Converts the selected text frames of one artboard into positioned HTML
/// divs plus deduplicated style-class CSS rules.
pub fn convert_text_frames(
    frames: &[&PageItem],
    index: &DocIndex,
    ab: &Artboard,
    ab_index: usize,
    settings: &DocSettings,
    report: &mut Report,
) -> TextData {
    let selected: Vec<(&PageItem, &IndexedItem, &TextFrame)> = frames
        .iter()
        .filter_map(|item| {
            let entry = index.item(&item.id)?;
            let frame = item.as_text()?;
            Some((*item, entry, frame))
        })
        .collect();

    let mut frame_data: Vec<Vec<ParagraphData>> = Vec::with_capacity(selected.len());
    for (_, entry, frame) in &selected {
        if settings.render_text_as == RenderTextAs::Html && !frame.is_rotated() {
            if let Some(range) = frame.first_range() {
                if range.horizontal_scale != 100.0 || range.vertical_scale != 100.0 {
                    report.warn(format!(
                        "Vertical or horizontal text scaling will be lost. Affected text: {}",
                        truncate_string(&frame.contents(), TEXT_SAMPLE_LEN, false)
                    ));
                }
            }
        }
        frame_data.push(import_text_frame_paragraphs(frame, entry));
    }

    let base_style = derive_text_style_css(&mut frame_data, settings, report);
    let mut pg_styles = StyleClassRegistry::new(&settings.namespace, "pstyle");
    let mut char_styles = StyleClassRegistry::new(&settings.namespace, "cstyle");
    let id_prefix = format!("{}tf{}-", settings.namespace, ab_index);
    let ab_box = ab.rect.to_css_box();

    let mut html = String::new();
    for (i, paragraphs) in frame_data.iter().enumerate() {
        let (item, entry, frame) = selected[i];
        let layer_name = index
            .layer(entry.layer_id)
            .map(|l| l.layer.clean_name())
            .unwrap_or_default();
        let div_id = match &item.name {
            Some(name) if !name.is_empty() => make_keyword(name),
            _ => format!("{}{}", id_prefix, i + 1),
        };
        let position_css = text_frame_css(
            entry, frame, &layer_name, &ab_box, paragraphs, settings, report,
        );
        html.push_str(&format!("\t\t<div id=\"{div_id}\" {position_css}>"));
        html.push_str(&generate_text_frame_html(
            paragraphs,
            &base_style,
            &mut pg_styles,
            &mut char_styles,
            report,
        ));
        html.push_str("\n\t\t</div>\n");
    }

    let mut css_blocks: Vec<String> = pg_styles.rules().chain(char_styles.rules()).collect();
    if !frame_data.is_empty() {
        css_blocks.insert(0, format_css_rule("p", &base_style.declarations()));
    }

    TextData {
        html,
        styles: css_blocks,
    }
}
