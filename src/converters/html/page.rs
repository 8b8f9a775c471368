//! Output assembly: artboard containers, page-level CSS, container
//! queries, the component script preamble, custom code blocks, and the
//! final per-group artifact.

use super::constants::{CSS_PRECISION, SCRIPT_VERSION};
use super::planner::{
    self, artboard_unique_name, group_container_id, ArtboardGroup,
};
use super::utils::{
    add_enclosing_tag, apply_template, clean_html_text, encode_html_entities, fmt_number,
    format_css_rule, round_to, straighten_curly_quotes, straighten_curly_quotes_inside_angle_brackets,
    strip_tag,
};
use crate::models::Document;
use crate::settings::{CustomBlocks, DocSettings};

/// The accumulating output of one artboard group.
#[derive(Debug, Default, Clone)]
pub struct GroupOutput {
    pub html: String,
    pub css: String,
    pub js: String,
}

/// One finished output artifact.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub file_name: String,
    pub contents: String,
}

/// The opening markup of one artboard's container div, including its
/// inline sizing style, aspect-ratio data attribute, and (when container
/// queries are disabled) the width-conditional wrapper.
pub fn generate_artboard_div(
    doc: &Document,
    group: &ArtboardGroup,
    ab_index: usize,
    settings: &DocSettings,
) -> String {
    let ab = &doc.artboards[ab_index];
    let id = format!("{}{}", settings.namespace, artboard_unique_name(doc, ab, settings));
    let classname = format!("{}artboard", settings.namespace);
    let visible = planner::visibility_range(doc, group, ab_index);
    let sizing = planner::width_range(doc, group, ab_index, settings);
    let ab_box = ab.rect.to_css_box();
    let aspect_ratio = ab_box.width / ab_box.height;

    let mut inline_style = String::new();
    match sizing {
        Some(range) if !range.is_fixed_point() => {
            if range.min > 0.0 {
                inline_style.push_str(&format!("min-width: {}px;", fmt_number(range.min)));
            }
            if !range.is_unbounded() {
                inline_style.push_str(&format!("max-width: {}px;", fmt_number(range.max)));
            }
        }
        _ => {
            // fixed width (including duplicate-width artboards that are
            // never shown)
            inline_style.push_str(&format!(
                "width:{}px; height:{}px;",
                fmt_number(ab_box.width),
                fmt_number(ab_box.height)
            ));
        }
    }
    inline_style.push_str(&format!(
        "aspect-ratio: {};",
        fmt_number(round_to(aspect_ratio, CSS_PRECISION))
    ));

    let mut html = String::new();
    if !settings.include_resizer_css {
        match visible {
            Some(range) if !range.is_unbounded() => {
                html.push_str(&format!(
                    "{{#if width && ( width >= {} && width < {})}}",
                    fmt_number(range.min),
                    fmt_number(range.max + 1.0)
                ));
            }
            Some(range) => {
                html.push_str(&format!(
                    "{{#if width && (width >= {})}}",
                    fmt_number(range.min)
                ));
            }
            None => html.push_str("{#if false}"),
        }
        html.push('\n');
    }

    html.push_str(&format!(
        "\t<div id=\"{id}\" class=\"{classname}\" style=\"{inline_style}\""
    ));
    html.push_str(&format!(
        " data-aspect-ratio=\"{}\"",
        fmt_number(round_to(aspect_ratio, 3))
    ));
    if settings.include_resizer_widths {
        if let Some(range) = visible {
            html.push_str(&format!(" data-min-width=\"{}\"", fmt_number(range.min)));
            if !range.is_unbounded() {
                html.push_str(&format!(" data-max-width=\"{}\"", fmt_number(range.max)));
            }
        }
    }
    html.push_str(">\n");
    html
}

/// Per-artboard CSS: the positioning rule, the container-query display
/// rules, and the artboard-scoped text style classes.
pub fn generate_artboard_css(
    doc: &Document,
    group: &ArtboardGroup,
    ab_index: usize,
    container_id: &str,
    css_rules: &[String],
    settings: &DocSettings,
) -> String {
    let ab = &doc.artboards[ab_index];
    let ab_id = format!("#{}{}", settings.namespace, artboard_unique_name(doc, ab, settings));
    let mut css = format_css_rule(
        &ab_id,
        &[
            ("position", "relative".to_string()),
            ("overflow", "hidden".to_string()),
        ],
    );
    if settings.include_resizer_css {
        css.push_str(&generate_container_query_css(
            doc,
            group,
            ab_index,
            &ab_id,
            container_id,
        ));
    }
    for block in css_rules {
        css.push_str(&format!("{ab_id} {block}"));
    }
    css
}

/// The container-query display rules scoping one artboard to its width
/// band. A group's sole artboard needs no query at all; the narrowest
/// artboard is visible by default (the fallback for browsers without
/// container queries) and hidden above its band.
fn generate_container_query_css(
    doc: &Document,
    group: &ArtboardGroup,
    ab_index: usize,
    ab_id: &str,
    container_id: &str,
) -> String {
    let range = match planner::visibility_range(doc, group, ab_index) {
        Some(range) => range,
        // a duplicate-width artboard that never becomes the active one
        None => return format_css_rule(ab_id, &[("display", "none".to_string())]),
    };
    let is_smallest = range.min == 0.0;
    let is_largest = range.is_unbounded();
    if is_smallest && is_largest {
        return String::new();
    }

    let mut css = String::new();
    if !is_smallest {
        css.push_str(&format_css_rule(ab_id, &[("display", "none".to_string())]));
    }
    let query = if is_smallest {
        format!("(width >= {}px)", fmt_number(range.max + 1.0))
    } else {
        let mut q = format!("(width >= {}px)", fmt_number(range.min));
        if !is_largest {
            q.push_str(&format!(" and (width < {}px)", fmt_number(range.max + 1.0)));
        }
        q
    };
    css.push_str(&format!("@container {container_id} {query} {{\n"));
    css.push_str(&format_css_rule(
        ab_id,
        &[(
            "display",
            if is_smallest { "none" } else { "block" }.to_string(),
        )],
    ));
    css.push_str("}\n");
    css
}

/// CSS common to all generated content of one group.
pub fn generate_page_css(
    container_id: &str,
    group: &ArtboardGroup,
    settings: &DocSettings,
) -> String {
    let ns = &settings.namespace;
    let block_start = format!("#{container_id}");
    let mut css = String::new();

    if settings.include_resizer_css && group.artboards.len() > 1 {
        css.push_str(&format_css_rule(
            &block_start,
            &[
                ("container-type", "inline-size".to_string()),
                ("container-name", container_id.to_string()),
            ],
        ));
    }
    if let Some(max_width) = settings.max_width {
        css.push_str(&format_css_rule(
            &block_start,
            &[("max-width", format!("{}px", fmt_number(max_width)))],
        ));
    }
    if settings.center_html_output {
        css.push_str(&format_css_rule(
            &format!("{block_start},\n{block_start} .{ns}artboard"),
            &[("margin", "0 auto".to_string())],
        ));
    }
    if !settings.alt_text.is_empty() {
        css.push_str(&format_css_rule(
            &format!("{block_start} .{ns}altText"),
            &[
                ("position", "absolute".to_string()),
                ("left", "-10000px".to_string()),
                ("width", "1px".to_string()),
                ("height", "1px".to_string()),
                ("overflow", "hidden".to_string()),
                ("white-space", "nowrap".to_string()),
            ],
        ));
    }
    if !settings.clickable_link.is_empty() {
        css.push_str(&format_css_rule(
            &format!("{block_start} .{ns}link"),
            &[("display", "block".to_string())],
        ));
    }

    css.push_str(&format_css_rule(
        &format!("{block_start} p"),
        &[("margin", "0".to_string())],
    ));
    if settings.testing_mode {
        css.push_str(&format_css_rule(
            &format!("{block_start} p"),
            &[("color", "rgba(209, 0, 0, 0.5) !important".to_string())],
        ));
    }
    css.push_str(&format_css_rule(
        &format!("{block_start} .{ns}abs"),
        &[("position", "absolute".to_string())],
    ));
    css.push_str(&format_css_rule(
        &format!("{block_start} .{ns}img"),
        &[
            ("position", "absolute".to_string()),
            ("top", "0".to_string()),
            ("display", "block".to_string()),
            ("width", "100% !important".to_string()),
            ("height", "100%".to_string()),
            ("background-size", "contain".to_string()),
            ("background-repeat", "no-repeat".to_string()),
        ],
    ));
    css.push_str(&format_css_rule(
        &format!("{block_start} .{ns}symbol"),
        &[
            ("position", "absolute".to_string()),
            ("box-sizing", "border-box".to_string()),
        ],
    ));
    css.push_str(&format_css_rule(
        &format!("{block_start} .{ns}pointText p"),
        &[("white-space", "nowrap".to_string())],
    ));
    css
}

/// The component script preamble: asset path and mount-callback props,
/// one prop per snippet layer, and the width binding used when container
/// queries are disabled.
pub fn generate_component_script(settings: &DocSettings, snippet_props: &[String]) -> String {
    let mut script = String::from("<script>\n\t");
    script.push_str("let { assetsPath = '/', onMounted = () => {}");
    for prop in snippet_props {
        script.push_str(&format!(", {prop}"));
    }
    script.push_str(" } = $props();\n");
    if !settings.include_resizer_css {
        script.push_str("\tlet width = $state(100);\n");
    }
    script.push_str("\timport { onMount } from 'svelte';\n");
    script.push_str("\tonMount(() => {\n\t\tonMounted();\n\t});\n");
    script.push_str("</script>\n");
    script
}

/// Undoes the host's automatic quote conversion inside custom code blocks
/// and normalizes their enclosing tags.
fn clean_code_block(kind: &str, raw: &str) -> String {
    if kind.contains("html") {
        clean_html_text(&straighten_curly_quotes_inside_angle_brackets(raw))
    } else if kind == "js" {
        add_enclosing_tag("script", &straighten_curly_quotes(raw))
    } else if kind == "css" {
        strip_tag("style", &straighten_curly_quotes(raw))
    } else {
        raw.to_string()
    }
}

/// Splices the user-authored custom blocks into the group output at their
/// defined insertion points.
pub fn add_custom_blocks(output: &mut GroupOutput, blocks: &CustomBlocks) {
    if !blocks.css.is_empty() {
        let cleaned: Vec<String> = blocks.css.iter().map(|b| clean_code_block("css", b)).collect();
        output.css.push_str(&format!("\n/* Custom CSS */\n{}\n", cleaned.join("\n")));
    }
    if !blocks.html_before.is_empty() {
        let cleaned: Vec<String> = blocks
            .html_before
            .iter()
            .map(|b| clean_code_block("html", b))
            .collect();
        output.html = format!("<!-- Custom HTML -->\n{}\n{}\n", cleaned.join("\n"), output.html);
    }
    if !blocks.html_after.is_empty() {
        let cleaned: Vec<String> = blocks
            .html_after
            .iter()
            .map(|b| clean_code_block("html", b))
            .collect();
        output
            .html
            .push_str(&format!("\n<!-- Custom HTML -->\n{}\n", cleaned.join("\n")));
    }
    // deprecated bare html block, kept for old documents
    if !blocks.html.is_empty() {
        let cleaned: Vec<String> = blocks.html.iter().map(|b| clean_code_block("html", b)).collect();
        output
            .html
            .push_str(&format!("\n<!-- Custom HTML -->\n{}\n", cleaned.join("\n")));
    }
    if !blocks.js.is_empty() {
        let cleaned: Vec<String> = blocks.js.iter().map(|b| clean_code_block("js", b)).collect();
        output.js.push_str(&format!("\n<!-- Custom JS -->\n{}\n", cleaned.join("\n")));
    }
}

/// Wraps the group's content in its container element, prepends the
/// generated-by comment and script preamble, appends the style block and
/// custom JS, and names the output file.
#[allow(clippy::too_many_arguments)]
pub fn generate_output_file(
    output: &GroupOutput,
    group: &ArtboardGroup,
    page_name: &str,
    doc_name: &str,
    snippet_props: &[String],
    timestamp: &str,
    settings: &DocSettings,
) -> OutputFile {
    let ns = &settings.namespace;
    let container_id = group_container_id(ns, page_name);
    let alt_text_id = format!("{container_id}-img-desc");

    let mut aria_attrs = String::new();
    if !settings.aria_role.is_empty() {
        aria_attrs.push_str(&format!(" role=\"{}\"", settings.aria_role));
    }
    if !settings.alt_text.is_empty() {
        aria_attrs.push_str(&format!(" aria-describedby=\"{alt_text_id}\""));
    }

    let comment_block = format!(
        "<!-- Generated by artboard-tools v{SCRIPT_VERSION} - {timestamp} -->\n\
         <!-- source file: {doc_name} -->\n"
    );

    let script = generate_component_script(settings, snippet_props);

    let mut html = format!("<div id=\"{container_id}\" class=\"artboard-embed\"{aria_attrs}");
    if !settings.include_resizer_css {
        html.push_str(" bind:clientWidth={width}");
    }
    html.push_str(">\n");
    if !settings.alt_text.is_empty() {
        html.push_str(&format!(
            "<div class=\"{ns}altText\" id=\"{alt_text_id}\">{}</div>\n",
            encode_html_entities(&settings.alt_text)
        ));
    }
    if !settings.clickable_link.is_empty() {
        html.push_str(&format!(
            "\t<a class=\"{ns}link\" href=\"{}\">\n",
            settings.clickable_link
        ));
    }
    html.push_str(&output.html);
    if !settings.clickable_link.is_empty() {
        html.push_str("\t</a>\n");
    }
    html.push_str("</div>\n");

    let css = format!(
        "<style>\n{}{}\n</style>\n",
        generate_page_css(&container_id, group, settings),
        output.css
    );

    let contents = format!(
        "\n{comment_block}{script}{html}{css}{}<!-- End artboard-tools - {timestamp} -->\n",
        output.js
    );
    let contents = apply_template(
        &contents,
        &[
            ("namespace", ns.as_str()),
            ("project_name", settings.project_name.as_str()),
            ("image_source_path", settings.image_source_path.as_str()),
            ("html_output_path", settings.html_output_path.as_str()),
            ("image_output_path", settings.image_output_path.as_str()),
        ],
    );

    OutputFile {
        file_name: format!("{page_name}{}", settings.html_output_extension),
        contents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Artboard, Bounds, ColorSpace};
    use crate::settings::DocSettings;
    use pretty_assertions::assert_eq;

    fn doc(names_and_widths: &[(&str, f64)]) -> Document {
        Document {
            name: "Demo Graphic.ai".to_string(),
            path: Some("/tmp".to_string()),
            saved: true,
            color_space: ColorSpace::Rgb,
            active_layer_name: None,
            artboards: names_and_widths
                .iter()
                .map(|(name, w)| Artboard {
                    name: name.to_string(),
                    rect: Bounds::new(0.0, 0.0, *w, -300.0),
                })
                .collect(),
            layers: vec![],
        }
    }

    fn group_of(doc: &Document) -> ArtboardGroup {
        planner::group_artboards_for_output(doc, &DocSettings::default())
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn dynamic_artboards_get_min_and_max_width_style() {
        let mut settings = DocSettings::default();
        settings.responsiveness = crate::settings::Responsiveness::Dynamic;
        let doc = doc(&[("Desktop", 800.0), ("Mobile", 400.0)]);
        let group = group_of(&doc);
        let desktop = generate_artboard_div(&doc, &group, 0, &settings);
        let mobile = generate_artboard_div(&doc, &group, 1, &settings);
        assert!(desktop.contains("min-width: 800px;"));
        assert!(!desktop.contains("max-width"));
        assert!(mobile.contains("max-width: 799px;"));
        assert!(mobile.contains("data-min-width=\"0\""));
        assert!(mobile.contains("data-max-width=\"799\""));
    }

    #[test]
    fn container_query_toggles_display_at_the_breakpoint() {
        let settings = DocSettings::default();
        let doc = doc(&[("Desktop", 800.0), ("Mobile", 400.0)]);
        let group = group_of(&doc);
        let container_id = group_container_id("g-", &group.name);
        let desktop_css =
            generate_artboard_css(&doc, &group, 0, &container_id, &[], &settings);
        let mobile_css = generate_artboard_css(&doc, &group, 1, &container_id, &[], &settings);

        // desktop: hidden by default, shown at 800px and up
        assert!(desktop_css.contains("display: none"));
        assert!(desktop_css.contains("@container"));
        assert!(desktop_css.contains("(width >= 800px)"));
        assert!(desktop_css.contains("display: block"));
        // mobile: visible fallback, hidden from 800px up
        assert!(mobile_css.contains("(width >= 800px)"));
        assert!(!mobile_css.contains("display: block"));
        // the only breakpoint anywhere is 800
        for css in [&desktop_css, &mobile_css] {
            for line in css.lines().filter(|l| l.contains("@container")) {
                assert!(line.contains("800px"), "unexpected breakpoint in {line}");
            }
        }
    }

    #[test]
    fn sole_artboard_needs_no_container_query() {
        let settings = DocSettings::default();
        let doc = doc(&[("Only", 600.0)]);
        let group = group_of(&doc);
        let container_id = group_container_id("g-", &group.name);
        let css = generate_artboard_css(&doc, &group, 0, &container_id, &[], &settings);
        assert!(!css.contains("@container"));
    }

    #[test]
    fn page_css_declares_the_container_only_for_multi_artboard_groups() {
        let settings = DocSettings::default();
        let two = doc(&[("A", 400.0), ("B", 800.0)]);
        let group2 = group_of(&two);
        let css = generate_page_css("g-demo-box", &group2, &settings);
        assert!(css.contains("container-type: inline-size"));
        assert!(css.contains("container-name: g-demo-box"));

        let one = doc(&[("A", 400.0)]);
        let group1 = group_of(&one);
        let css = generate_page_css("g-demo-box", &group1, &settings);
        assert!(!css.contains("container-type"));
    }

    #[test]
    fn snippet_props_are_declared_in_the_script() {
        let settings = DocSettings::default();
        let script =
            generate_component_script(&settings, &["legend".to_string(), "chart".to_string()]);
        assert!(script.contains(", legend, chart } = $props();"));
        // container queries on: no width binding needed
        assert!(!script.contains("$state"));
    }

    #[test]
    fn custom_blocks_land_at_their_insertion_points() {
        let mut output = GroupOutput {
            html: "<div>core</div>\n".to_string(),
            css: String::new(),
            js: String::new(),
        };
        let blocks = CustomBlocks {
            css: vec!["<style>p { color: red; }</style>".to_string()],
            html_before: vec!["<p>before</p>".to_string()],
            html_after: vec!["<p>after</p>".to_string()],
            html: vec![],
            js: vec!["console.log(1);".to_string()],
        };
        add_custom_blocks(&mut output, &blocks);
        let before_at = output.html.find("before").unwrap();
        let core_at = output.html.find("core").unwrap();
        let after_at = output.html.find("after").unwrap();
        assert!(before_at < core_at && core_at < after_at);
        // style wrapper stripped from custom css, script wrapper added to js
        assert!(!output.css.contains("<style>"));
        assert!(output.css.contains("p { color: red; }"));
        assert!(output.js.contains("<script>"));
    }

    #[test]
    fn output_file_carries_version_and_timestamp_only_in_comments() {
        let settings = DocSettings::default();
        let d = doc(&[("Only", 600.0)]);
        let group = group_of(&d);
        let output = GroupOutput::default();
        let file = generate_output_file(
            &output,
            &group,
            &group.name,
            &d.name,
            &[],
            "2026-08-05 12:00",
            &settings,
        );
        assert_eq!(file.file_name, "Demo-Graphic.html");
        assert!(file.contents.contains("Generated by artboard-tools"));
        assert!(file.contents.contains("2026-08-05 12:00"));
        assert!(file.contents.contains("<script>"));
        assert!(file.contents.contains("<style>"));
    }
}
