//! Utility functions for HTML/CSS generation: numeric rounding and
//! formatting, percentage conversion, entity encoding, quote repair, and
//! color normalization.

use regex::Regex;

use super::constants::{CSS_PRECISION, RGB_BLACK_THRESHOLD};
use crate::models::Color;

// --- Numeric formatting ---

/// Rounds to the given number of decimal digits.
pub fn round_to(number: f64, precision: u32) -> f64 {
    let d = 10f64.powi(precision as i32);
    (number * d).round() / d
}

/// Formats a number the way the generated CSS expects: no trailing `.0`
/// on whole values, shortest representation otherwise.
pub fn fmt_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Formats `part` as a CSS percentage of `whole`, rounded to the standard
/// precision.
pub fn format_css_pct(part: f64, whole: f64) -> String {
    format!("{}%", fmt_number(round_to(part / whole * 100.0, CSS_PRECISION)))
}

// --- Strings ---

pub fn truncate_string(s: &str, max_len: usize, use_ellipsis: bool) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_len).collect();
    if use_ellipsis {
        out.push_str("...");
    }
    out
}

const BASIC_REPLACEMENTS: [(char, &str); 4] = [
    ('\u{26}', "&amp;"),
    ('\u{22}', "&quot;"),
    ('\u{3C}', "&lt;"),
    ('\u{3E}', "&gt;"),
];

const EXTRA_REPLACEMENTS: [(char, &str); 22] = [
    ('\u{A0}', "&nbsp;"),
    ('\u{A9}', "&copy;"),
    ('\u{AE}', "&reg;"),
    ('\u{B0}', "&deg;"),
    ('\u{B7}', "&middot;"),
    ('\u{D7}', "&times;"),
    ('\u{F7}', "&divide;"),
    ('\u{2013}', "&ndash;"),
    ('\u{2014}', "&mdash;"),
    ('\u{2018}', "&lsquo;"),
    ('\u{2019}', "&rsquo;"),
    ('\u{201C}', "&ldquo;"),
    ('\u{201D}', "&rdquo;"),
    ('\u{2022}', "&bull;"),
    ('\u{2026}', "&hellip;"),
    ('\u{20AC}', "&euro;"),
    ('\u{2122}', "&trade;"),
    ('\u{2190}', "&larr;"),
    ('\u{2192}', "&rarr;"),
    ('\u{2212}', "&minus;"),
    ('\u{2264}', "&le;"),
    ('\u{2265}', "&ge;"),
];

fn replace_chars(text: &str, replacements: &[(char, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    'chars: for ch in text.chars() {
        for (from, to) in replacements {
            if ch == *from {
                out.push_str(to);
                continue 'chars;
            }
        }
        out.push(ch);
    }
    out
}

/// Encodes text for attribute values: markup characters and common
/// typographic characters become entities.
pub fn encode_html_entities(text: &str) -> String {
    let basic = replace_chars(text, &BASIC_REPLACEMENTS);
    replace_chars(&basic, &EXTRA_REPLACEMENTS)
}

/// Encodes typographic characters only. `<`, `>`, and `&` are left alone so
/// authors can embed real markup in their text.
pub fn clean_html_text(text: &str) -> String {
    replace_chars(text, &EXTRA_REPLACEMENTS)
}

/// Undoes the host's automatic curly-quote conversion.
pub fn straighten_curly_quotes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Straightens curly quotes only inside `<...>` tags, fixing quoted
/// attributes in markup that was typed into the drawing document.
pub fn straighten_curly_quotes_inside_angle_brackets(text: &str) -> String {
    let tag_finder = Regex::new(r"<[^\n]+?>").unwrap();
    tag_finder
        .replace_all(text, |caps: &regex::Captures| {
            straighten_curly_quotes(&caps[0])
        })
        .into_owned()
}

/// The name of the first HTML tag in a string, if any. Not very robust;
/// good enough for printing a warning.
pub fn find_html_tag(s: &str) -> Option<String> {
    if !s.contains('<') {
        return None;
    }
    let re = Regex::new(r"<(\w+)[^>]*>").unwrap();
    re.captures(s).map(|caps| caps[1].to_string())
}

/// Wraps `s` in the given tag unless it already contains it.
pub fn add_enclosing_tag(tag_name: &str, s: &str) -> String {
    let open = format!("<{tag_name}");
    let close = format!("</{tag_name}>");
    let mut out = s.to_string();
    if !out.contains(&open) {
        out = format!("{open}>\n{out}");
    }
    if !out.contains(&close) {
        out = format!("{out}\n{close}");
    }
    out
}

/// Removes opening and closing occurrences of the given tag.
pub fn strip_tag(tag_name: &str, s: &str) -> String {
    let open = Regex::new(&format!("<{tag_name}[^>]*>")).unwrap();
    let close = Regex::new(&format!("</{tag_name}>")).unwrap();
    close.replace_all(&open.replace_all(s, ""), "").into_owned()
}

// --- CSS ---

/// Formats a CSS rule with one tab-indented declaration per line.
pub fn format_css_rule(selector: &str, declarations: &[(&str, String)]) -> String {
    let mut css = format!("{selector} {{\n");
    for (prop, value) in declarations {
        css.push_str(&format!("\t{prop}: {value};\n"));
    }
    css.push_str("}\n");
    css
}

/// Formats an rgb()/rgba() CSS color. Opacity is 0-100; full or missing
/// opacity emits the rgb() form.
pub fn get_css_color(r: u8, g: u8, b: u8, opacity: Option<f64>) -> String {
    match opacity {
        Some(o) if o > 0.0 && o < 100.0 => {
            format!("rgba({r},{g},{b},{})", fmt_number(round_to(o / 100.0, 2)))
        }
        _ => format!("rgb({r},{g},{b})"),
    }
}

/// A normalized color plus an optional warning template (`%s` is replaced
/// with a sample of the affected text by the caller).
pub struct ConvertedColor {
    pub css: String,
    pub warning: Option<String>,
}

/// Normalizes a host color to a CSS color.
///
/// Near-black RGB snaps to pure black. A missing fill becomes pure green
/// with a warning, so the problem is visually obvious in the output;
/// non-RGB fills become black with a warning.
pub fn convert_color(color: Option<&Color>, opacity: Option<f64>) -> ConvertedColor {
    let resolved = color.map(Color::resolved);
    let (r, g, b, warning) = match resolved {
        Some(Color::Rgb(rgb)) => {
            let (mut r, mut gch, mut bch) = (rgb.red, rgb.green, rgb.blue);
            if r < RGB_BLACK_THRESHOLD && gch < RGB_BLACK_THRESHOLD && bch < RGB_BLACK_THRESHOLD {
                r = 0.0;
                gch = 0.0;
                bch = 0.0;
            }
            (r, gch, bch, None)
        }
        Some(Color::Gray(gray)) => {
            let v = ((100.0 - gray.gray) / 100.0 * 255.0).round();
            (v, v, v, None)
        }
        Some(Color::None) | None => (
            0.0,
            255.0,
            0.0,
            Some(
                "The text \"%s\" has no fill. Please fill it with an RGB color. \
                 It has been filled with green."
                    .to_string(),
            ),
        ),
        Some(other) => {
            let kind = match other {
                Color::Cmyk(_) => "CMYK",
                _ => "an unsupported",
            };
            (
                0.0,
                0.0,
                0.0,
                Some(format!(
                    "The text \"%s\" has {kind} fill. Please fill it with an RGB color."
                )),
            )
        }
    };
    ConvertedColor {
        css: get_css_color(r.round() as u8, g.round() as u8, b.round() as u8, opacity),
        warning,
    }
}

/// Very basic template substitution: `{{key}}` and `<%= key %>` forms,
/// case-insensitive on the key.
pub fn apply_template(template: &str, replacements: &[(&str, &str)]) -> String {
    fn lookup(caps: &regex::Captures, replacements: &[(&str, &str)]) -> String {
        let name = &caps[1];
        for (key, value) in replacements {
            if key.eq_ignore_ascii_case(name) {
                return value.to_string();
            }
        }
        caps[0].to_string()
    }
    let mustache = Regex::new(r"\{\{\{? *([_a-zA-Z][\w-]*) *\}\}\}?").unwrap();
    let ejs = Regex::new(r"<%=? *([_a-zA-Z][\w-]*) *%>").unwrap();
    let pass1 = mustache
        .replace_all(template, |caps: &regex::Captures| lookup(caps, replacements))
        .into_owned();
    ejs.replace_all(&pass1, |caps: &regex::Captures| lookup(caps, replacements))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_and_number_formatting() {
        assert_eq!(round_to(0.12345678, 4), 0.1235);
        assert_eq!(fmt_number(12.0), "12");
        assert_eq!(fmt_number(0.1235), "0.1235");
    }

    #[test]
    fn css_pct_uses_four_decimals() {
        assert_eq!(format_css_pct(1.0, 3.0), "33.3333%");
        assert_eq!(format_css_pct(50.0, 100.0), "50%");
    }

    #[test]
    fn near_black_snaps_to_black_and_missing_fill_goes_green() {
        let near_black = Color::rgb(20.0, 30.0, 10.0);
        let converted = convert_color(Some(&near_black), None);
        assert_eq!(converted.css, "rgb(0,0,0)");
        assert!(converted.warning.is_none());

        let missing = convert_color(Some(&Color::None), None);
        assert_eq!(missing.css, "rgb(0,255,0)");
        assert!(missing.warning.is_some());
    }

    #[test]
    fn rgba_only_for_partial_opacity() {
        assert_eq!(get_css_color(1, 2, 3, Some(50.0)), "rgba(1,2,3,0.5)");
        assert_eq!(get_css_color(1, 2, 3, Some(100.0)), "rgb(1,2,3)");
        assert_eq!(get_css_color(1, 2, 3, None), "rgb(1,2,3)");
    }

    #[test]
    fn quote_straightening_is_scoped_to_tags() {
        let text = "\u{201C}hello\u{201D} <span class=\u{201C}x\u{201D}>";
        let fixed = straighten_curly_quotes_inside_angle_brackets(text);
        assert!(fixed.starts_with('\u{201C}'));
        assert!(fixed.contains("class=\"x\""));
    }

    #[test]
    fn enclosing_tag_is_idempotent() {
        let wrapped = add_enclosing_tag("script", "let x = 1;");
        assert!(wrapped.starts_with("<script>"));
        assert!(wrapped.ends_with("</script>"));
        assert_eq!(add_enclosing_tag("script", &wrapped), wrapped);
        assert_eq!(strip_tag("style", "<style>p{}</style>"), "p{}");
    }

    #[test]
    fn template_substitution() {
        let out = apply_template("id-{{namespace}}x <%= project_name %>", &[
            ("namespace", "g-"),
            ("project_name", "demo"),
        ]);
        assert_eq!(out, "id-g-x demo");
    }
}
