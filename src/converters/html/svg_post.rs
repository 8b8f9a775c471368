//! Post-processing of exported vector files.
//!
//! The host's vector exporter rasterizes any item carrying opacity or a
//! blend mode, so those effects are stripped before export and encoded
//! into the item's *name* with a reserved prefix; this module is the other
//! end of that wire format. It also rewrites generated ids into meaningful
//! ones, injects a stroke-scaling guard, and strips raster references when
//! raster embedding is disabled.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::debug;
use regex::Regex;

use super::constants::ID_LIST_SAMPLE_LEN;
use super::error::Result;
use super::utils::{fmt_number, truncate_string};
use crate::models::BlendMode;
use crate::report::Report;
use crate::settings::DocSettings;

/// Reserved prefix of the effect wire format:
/// `Z-` + `-opacity<N>`? + `-multiply`? + (`--<original name>`)?.
const EFFECT_PREFIX: &str = "Z-";

/// Encodes opacity and multiply-blend into an item name, or `None` when
/// the item carries neither effect. The original name, when present, is
/// appended after a `--` separator so the post-processor can restore it.
pub fn encode_effects_name(opacity: f64, blend: BlendMode, name: Option<&str>) -> Option<String> {
    let mut encoded = String::new();
    if opacity < 100.0 {
        encoded.push_str(&format!("-opacity{}", fmt_number(opacity.round())));
    }
    if blend == BlendMode::Multiply {
        encoded.push_str("-multiply");
    }
    if encoded.is_empty() {
        return None;
    }
    if let Some(name) = name {
        if !name.is_empty() {
            encoded.push_str("--");
            encoded.push_str(name);
        }
    }
    Some(format!("{EFFECT_PREFIX}{encoded}"))
}

/// Decodes effect-encoded ids back into inline CSS, restoring the original
/// id where one was appended.
pub fn reapply_effects(svg: &str) -> String {
    let id_re = Regex::new(r#"id="Z-(-[^"]+)""#).unwrap();
    let opacity_re = Regex::new(r"-opacity([0-9]+)").unwrap();
    let multiply_re = Regex::new(r"-multiply").unwrap();

    id_re
        .replace_all(svg, |caps: &regex::Captures| {
            let mut body = caps[1].to_string();
            let mut style = String::new();
            if multiply_re.is_match(&body) {
                style.push_str("mix-blend-mode:multiply;");
                body = multiply_re.replace(&body, "").into_owned();
            }
            if let Some(op) = opacity_re.captures(&body) {
                let value: f64 = op[1].parse().unwrap_or(100.0);
                style.push_str(&format!("opacity:{};", fmt_number(value / 100.0)));
                body = opacity_re.replace(&body, "").into_owned();
            }
            let mut replacement = format!("style=\"{style}\"");
            if let Some(original) = body.strip_prefix("--") {
                replacement = format!("id=\"{original}\" {replacement}");
            }
            replacement
        })
        .into_owned()
}

/// Replaces the file's first id attribute (the root element's) with the
/// given id.
pub fn set_root_id(svg: &str, id: &str) -> String {
    let re = Regex::new(r#"id="[^"]*""#).unwrap();
    re.replace(svg, format!("id=\"{id}\"").as_str()).into_owned()
}

/// Appends a style element just before the closing root tag.
pub fn inject_css(svg: &str, css: &str) -> String {
    svg.replacen("</svg>", &format!("<style>\n{css}\n</style>\n</svg>"), 1)
}

/// The stroke-scaling guard, scoped under the file's root id so inline
/// SVG cannot affect other vector content on the page.
pub fn stroke_guard_css(root_id: &str) -> String {
    let selector = ["rect", "circle", "path", "line", "polyline", "polygon"]
        .iter()
        .map(|name| format!("#{root_id} {name}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{selector} {{ vector-effect: non-scaling-stroke; }}")
}

/// Removes embedded raster references from the markup, returning the
/// stripped content and the referenced file names.
pub fn strip_raster_references(svg: &str) -> (String, Vec<String>) {
    let re = Regex::new(r#"(?m)<image[^<]+href="([^"]+)"[^<]*>(?:</image>)?"#).unwrap();
    let mut removed = Vec::new();
    let stripped = re
        .replace_all(svg, |caps: &regex::Captures| {
            removed.push(caps[1].to_string());
            String::new()
        })
        .into_owned();
    (stripped, removed)
}

/// Index of ids already assigned during a run, spanning every inline
/// vector file of the output so ids stay unique page-wide.
#[derive(Debug, Default)]
pub struct SvgIdIndex {
    seen: HashSet<String>,
}

/// Rewrites exporter-generated ids (`<name>_<digits>_`) into meaningful
/// ids derived from the original item names: hex-escaped characters are
/// decoded, collisions resolved with numeric suffixes, and the decoded
/// name preserved in a `data-name` attribute. Duplicate original names are
/// reported in one coalesced warning.
pub fn replace_generated_ids(
    svg: &str,
    prefix: &str,
    index: &mut SvgIdIndex,
    report: &mut Report,
) -> String {
    let id_re = Regex::new(r#"id="([^"]+)_[0-9]+_""#).unwrap();
    let hex_re = Regex::new(r"_x([1-7][0-9A-F])_").unwrap();
    let mut dupes: Vec<String> = Vec::new();

    let out = id_re
        .replace_all(svg, |caps: &regex::Captures| {
            let fixed = hex_re
                .replace_all(&caps[1], |hex: &regex::Captures| {
                    u32::from_str_radix(&hex[1], 16)
                        .ok()
                        .and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_default()
                })
                .into_owned();
            // resolve collisions by appending a numeric suffix
            let mut uniq = fixed.clone();
            let mut n = 1;
            while index.seen.contains(&uniq) {
                n += 1;
                uniq = format!("{fixed}-{n}");
            }
            if n == 2 {
                dupes.push(fixed.clone());
            }
            index.seen.insert(uniq.clone());
            format!("id=\"{prefix}{uniq}\" data-name=\"{fixed}\"")
        })
        .into_owned();

    if !dupes.is_empty() {
        dupes.sort();
        let listed = truncate_string(&dupes.join(", "), ID_LIST_SAMPLE_LEN, true);
        report.warn_once(
            format!(
                "Found duplicate SVG {}: {}",
                if dupes.len() == 1 { "id" } else { "ids" },
                listed
            ),
            None,
        );
    }
    out
}

/// Rewrites an exported vector file in place: root id replacement, effect
/// reapplication, stroke-scaling guard, and (when raster embedding is
/// disabled) raster-reference stripping with sidecar file deletion.
pub fn rewrite_svg_file(
    path: &Path,
    root_id: &str,
    settings: &DocSettings,
    report: &mut Report,
) -> Result<()> {
    let mut svg = fs::read_to_string(path)?;
    debug!("[rewrite_svg_file] rewriting {} as #{root_id}", path.display());

    svg = set_root_id(&svg, root_id);
    svg = reapply_effects(&svg);
    svg = inject_css(&svg, &stroke_guard_css(root_id));

    if !settings.svg_embed_images {
        let (stripped, removed) = strip_raster_references(&svg);
        svg = stripped;
        if !removed.is_empty() {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            for file in &removed {
                // the exporter writes sidecar images next to the vector file
                let _ = fs::remove_file(dir.join(file));
            }
            report.warn_once(
                "This document contains images or effects that can't be exported to SVG.",
                None,
            );
        }
    }

    fs::write(path, svg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_encoding_round_trips() {
        // opacity values across the range, with and without multiply and
        // an original name
        for opacity in [1.0, 7.0, 25.0, 50.0, 99.0] {
            for multiply in [false, true] {
                let blend = if multiply {
                    BlendMode::Multiply
                } else {
                    BlendMode::Normal
                };
                let encoded =
                    encode_effects_name(opacity, blend, Some("shore line")).expect("encoded");
                let svg = format!("<path id=\"{encoded}\" d=\"M0,0\"/>");
                let decoded = reapply_effects(&svg);
                assert!(
                    decoded.contains(&format!("opacity:{};", fmt_number(opacity / 100.0))),
                    "{decoded}"
                );
                assert_eq!(decoded.contains("mix-blend-mode:multiply"), multiply);
                assert!(decoded.contains("id=\"shore line\""), "{decoded}");
            }
        }
    }

    #[test]
    fn unnamed_items_decode_to_style_only() {
        let encoded = encode_effects_name(100.0, BlendMode::Multiply, None).unwrap();
        assert_eq!(encoded, "Z--multiply");
        let decoded = reapply_effects(&format!("<g id=\"{encoded}\">"));
        assert_eq!(decoded, "<g style=\"mix-blend-mode:multiply;\">");
    }

    #[test]
    fn no_effects_means_no_encoding() {
        assert_eq!(encode_effects_name(100.0, BlendMode::Normal, Some("x")), None);
    }

    #[test]
    fn root_id_replacement_targets_the_first_id_only() {
        let svg = r#"<svg id="Layer_1"><rect id="a_1_"/></svg>"#;
        let out = set_root_id(svg, "g-map-img");
        assert!(out.starts_with(r#"<svg id="g-map-img">"#));
        assert!(out.contains(r#"id="a_1_""#));
    }

    #[test]
    fn stroke_guard_is_scoped_to_the_root_id() {
        let css = stroke_guard_css("g-map-img");
        assert!(css.contains("#g-map-img rect"));
        assert!(css.contains("#g-map-img polygon"));
        assert!(css.contains("vector-effect: non-scaling-stroke"));
        let out = inject_css("<svg></svg>", &css);
        assert!(out.contains("<style>"));
        assert!(out.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn generated_ids_become_meaningful_with_collision_suffixes() {
        let svg = concat!(
            r#"<path id="coast_x20_line_1_"/>"#,
            r#"<path id="coast_x20_line_2_"/>"#,
            r#"<path id="inlet_3_"/>"#,
        );
        let mut index = SvgIdIndex::default();
        let mut report = Report::new();
        let out = replace_generated_ids(svg, "", &mut index, &mut report);
        assert!(out.contains(r#"id="coast line" data-name="coast line""#));
        assert!(out.contains(r#"id="coast line-2" data-name="coast line""#));
        assert!(out.contains(r#"id="inlet""#));
        assert!(report
            .warnings()
            .iter()
            .any(|w| w.contains("duplicate SVG id") && w.contains("coast line")));
    }

    #[test]
    fn id_index_spans_multiple_files() {
        let mut index = SvgIdIndex::default();
        let mut report = Report::new();
        let first = replace_generated_ids(r#"<g id="badge_1_"/>"#, "", &mut index, &mut report);
        let second = replace_generated_ids(r#"<g id="badge_1_"/>"#, "", &mut index, &mut report);
        assert!(first.contains(r#"id="badge""#));
        assert!(second.contains(r#"id="badge-2""#));
    }

    #[test]
    fn raster_references_are_stripped_and_reported() {
        let svg = concat!(
            "<svg>",
            "<image width=\"10\" height=\"10\" xlink:href=\"map-image1.png\"></image>",
            "<rect/>",
            "</svg>"
        );
        let (stripped, removed) = strip_raster_references(svg);
        assert!(!stripped.contains("<image"));
        assert!(stripped.contains("<rect/>"));
        assert_eq!(removed, vec!["map-image1.png".to_string()]);
    }
}
