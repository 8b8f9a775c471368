//! Converts a drawing-document snapshot into responsive HTML/CSS plus a
//! component script stub.
//!
//! The pipeline runs per document: artboards are grouped into output units,
//! clipping masks are discovered once, and then each artboard contributes
//! positioned text HTML, image/vector embeds, and width-band CSS to its
//! group's output file. Recoverable problems are collected into a single
//! end-of-run report; only precondition failures abort a document, and the
//! driver catches exactly one of those per run.

pub mod constants;
pub mod error;
pub mod images;
pub mod page;
pub mod planner;
pub mod svg_post;
pub mod symbols;
pub mod text;
pub mod utils;
pub mod visibility;

pub use error::{HtmlConversionError, Result};
pub use page::{GroupOutput, OutputFile};

use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::host::DocumentHost;
use crate::models::{ColorSpace, Document};
use crate::report::Report;
use crate::settings::{CustomBlocks, DocSettings, RenderTextAs};
use images::{ImageData, RunAssets};
use planner::group_container_id;
use text::TextData;
use visibility::{build_doc_index, MaskInfo};

/// Inputs of one conversion run beyond the settings: user-authored custom
/// code blocks, and an optional timestamp override (runs over an unchanged
/// document are byte-identical except for this field, so tests pin it).
#[derive(Debug, Default, Clone)]
pub struct ConvertOptions {
    pub custom_blocks: CustomBlocks,
    pub timestamp: Option<String>,
}

/// What a run produced: the output artifacts (one per artboard group) and
/// the end-of-run report.
pub struct RunOutcome {
    pub outputs: Vec<OutputFile>,
    pub report: Report,
}

/// Converts the host's document. Fatal preconditions surface as a single
/// formatted error in the report; recoverable conditions are collected as
/// warnings while processing continues.
pub fn convert_document(
    host: &mut dyn DocumentHost,
    settings: &mut DocSettings,
    options: &ConvertOptions,
) -> RunOutcome {
    let mut report = Report::new();
    let timestamp = options
        .timestamp
        .clone()
        .unwrap_or_else(current_timestamp);
    let mut outputs = Vec::new();

    let result = run_document(
        host,
        settings,
        &options.custom_blocks,
        &timestamp,
        &mut outputs,
        &mut report,
    );
    if let Err(e) = result {
        report.error(error::format_error(&e));
    }
    RunOutcome { outputs, report }
}

fn run_document(
    host: &mut dyn DocumentHost,
    settings: &mut DocSettings,
    blocks: &CustomBlocks,
    timestamp: &str,
    outputs: &mut Vec<OutputFile>,
    report: &mut Report,
) -> Result<()> {
    precheck(host.document())?;
    planner::validate_artboard_names(host.document(), settings, report);

    let masks = visibility::find_masks(host, report)?;
    debug!("[run_document] found {} relevant masks", masks.len());

    let groups = planner::group_artboards_for_output(host.document(), settings);
    if groups.is_empty() {
        return error::user_error("No usable artboards were found");
    }

    for group in &groups {
        let file = render_artboard_group(host, group, &masks, settings, blocks, timestamp, report)?;
        outputs.push(file);
    }
    Ok(())
}

/// Fatal preconditions, checked before any work happens.
fn precheck(doc: &Document) -> Result<()> {
    if doc.path.as_deref().unwrap_or("").is_empty() {
        return error::user_error(
            "You need to save your document before running the exporter",
        );
    }
    if doc.color_space != ColorSpace::Rgb {
        return error::user_error(
            "You should change the document color mode to \"RGB\" before exporting",
        );
    }
    match doc.active_layer_name.as_deref() {
        Some("Isolation Mode") => {
            return error::user_error(
                "Unable to run because the document is in Isolation Mode",
            );
        }
        Some("<Opacity Mask>") if doc.layers.len() == 1 => {
            return error::user_error(
                "Unable to run because an opacity mask is being edited",
            );
        }
        _ => {}
    }
    Ok(())
}

/// Renders one group of artboards into a single output file.
fn render_artboard_group(
    host: &mut dyn DocumentHost,
    group: &planner::ArtboardGroup,
    masks: &[MaskInfo],
    settings: &DocSettings,
    blocks: &CustomBlocks,
    timestamp: &str,
    report: &mut Report,
) -> Result<OutputFile> {
    let mut output = GroupOutput::default();
    let mut assets = RunAssets::default();
    let page_name = if settings.project_name.is_empty() {
        group.name.clone()
    } else {
        settings.project_name.clone()
    };
    let container_id = group_container_id(&settings.namespace, &page_name);

    for &ab_index in &group.artboards {
        // select and convert text while the document is at rest
        let (text_data, text_ids) = {
            let doc = host.document();
            let ab = &doc.artboards[ab_index];
            let render_as_image = ab.settings().flag("image_only")
                || settings.render_text_as == RenderTextAs::Image;
            if render_as_image {
                (TextData::empty(), Vec::new())
            } else {
                let index = build_doc_index(doc);
                let frames =
                    visibility::text_frames_for_artboard(&index, masks, &ab.rect, settings);
                let ids: Vec<String> = frames.iter().map(|f| f.id.clone()).collect();
                let data =
                    text::convert_text_frames(&frames, &index, ab, ab_index, settings, report);
                (data, ids)
            }
        };

        // capture passes mutate visibility transactionally
        let image_data = if settings.write_image_files {
            images::convert_art_items(host, ab_index, &text_ids, settings, &mut assets, report)?
        } else {
            ImageData::empty()
        };

        let doc = host.document();
        let ab = &doc.artboards[ab_index];
        output
            .html
            .push_str(&format!("\t<!-- Artboard: {} -->\n", ab.clean_name()));
        output
            .html
            .push_str(&page::generate_artboard_div(doc, group, ab_index, settings));
        output.html.push_str(&image_data.html);
        output.html.push_str(&text_data.html);
        output.html.push_str("\t</div>\n");
        if !settings.include_resizer_css {
            output.html.push_str("{/if}\n");
        }
        output.css.push_str(&page::generate_artboard_css(
            doc,
            group,
            ab_index,
            &container_id,
            &text_data.styles,
            settings,
        ));
    }

    page::add_custom_blocks(&mut output, blocks);
    Ok(page::generate_output_file(
        &output,
        group,
        &page_name,
        &host.document().name,
        &assets.snippet_props,
        timestamp,
        settings,
    ))
}

/// `YYYY-MM-DD HH:MM`, UTC.
fn current_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (year, month, day) = civil_from_days((secs / 86400) as i64);
    let rem = secs % 86400;
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60
    )
}

/// Days since 1970-01-01 to (year, month, day), proleptic Gregorian.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SnapshotHost;
    use crate::models::{
        Artboard, BlendMode, Bounds, CharacterRange, Color, Layer, Matrix, PageItem, PageItemKind,
        Paragraph, TextFrame, TextKind,
    };

    fn text_frame_item(id: &str, bounds: Bounds, text: &str) -> PageItem {
        PageItem {
            id: id.to_string(),
            name: None,
            hidden: false,
            locked: false,
            opacity: 100.0,
            blending_mode: BlendMode::Normal,
            z: 1,
            geometric_bounds: bounds,
            visible_bounds: None,
            kind: PageItemKind::Text(TextFrame {
                kind: TextKind::Area,
                matrix: Matrix::default(),
                note: None,
                paragraphs: vec![Paragraph {
                    justification: Default::default(),
                    leading: 16.0,
                    space_before: 0.0,
                    space_after: 0.0,
                    ranges: vec![CharacterRange {
                        text: text.to_string(),
                        font: "Georgia".to_string(),
                        size: 13.0,
                        fill: Some(Color::rgb(0.0, 0.0, 0.0)),
                        tracking: 0.0,
                        capitalization: Default::default(),
                        baseline: Default::default(),
                        horizontal_scale: 100.0,
                        vertical_scale: 100.0,
                    }],
                }],
                text_path: None,
            }),
        }
    }

    fn responsive_doc() -> Document {
        Document {
            name: "Scorecard.ai".to_string(),
            path: Some("/tmp".to_string()),
            saved: true,
            color_space: ColorSpace::Rgb,
            active_layer_name: None,
            artboards: vec![
                Artboard {
                    name: "Desktop:dynamic".to_string(),
                    rect: Bounds::new(0.0, 0.0, 800.0, -450.0),
                },
                Artboard {
                    name: "Mobile:dynamic".to_string(),
                    rect: Bounds::new(0.0, -500.0, 400.0, -800.0),
                },
            ],
            layers: vec![Layer {
                id: "L1".to_string(),
                name: "copy".to_string(),
                visible: true,
                locked: false,
                opacity: 100.0,
                blending_mode: BlendMode::Normal,
                z: 0,
                layers: vec![],
                items: vec![
                    text_frame_item("t1", Bounds::new(20.0, -20.0, 300.0, -60.0), "Headline"),
                    text_frame_item("t2", Bounds::new(20.0, -520.0, 300.0, -560.0), "Headline"),
                ],
            }],
        }
    }

    fn settings_without_images() -> DocSettings {
        let mut settings = DocSettings::default();
        settings.write_image_files = false;
        settings
    }

    #[test]
    fn two_artboards_produce_one_group_with_an_800px_breakpoint() {
        let mut host = SnapshotHost::new(responsive_doc());
        let mut settings = settings_without_images();
        let options = ConvertOptions {
            timestamp: Some("2026-08-05 12:00".to_string()),
            ..ConvertOptions::default()
        };
        let outcome = convert_document(&mut host, &mut settings, &options);
        assert!(outcome.report.errors().is_empty(), "{:?}", outcome.report.errors());
        assert_eq!(outcome.outputs.len(), 1);

        let contents = &outcome.outputs[0].contents;
        // mobile is visible from 0 to 799, desktop from 800 up
        assert!(contents.contains("data-min-width=\"800\""));
        assert!(contents.contains("data-min-width=\"0\""));
        assert!(contents.contains("data-max-width=\"799\""));
        // every container query toggles at the 800px breakpoint
        let query_lines: Vec<&str> = contents
            .lines()
            .filter(|line| line.contains("@container"))
            .collect();
        assert!(!query_lines.is_empty());
        assert!(query_lines.iter().all(|line| line.contains("800px")));
        // both frames render as HTML text
        assert!(contents.matches("Headline").count() >= 2);
    }

    #[test]
    fn reruns_are_byte_identical_with_a_pinned_timestamp() {
        let options = ConvertOptions {
            timestamp: Some("2026-08-05 12:00".to_string()),
            ..ConvertOptions::default()
        };
        let run = || {
            let mut host = SnapshotHost::new(responsive_doc());
            let mut settings = settings_without_images();
            let outcome = convert_document(&mut host, &mut settings, &options);
            outcome.outputs[0].contents.clone()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn duplicate_artboard_names_warn_and_suffix_ids() {
        let mut doc = responsive_doc();
        doc.artboards[0].name = "Panel".to_string();
        doc.artboards[1].name = "Panel".to_string();
        let mut host = SnapshotHost::new(doc);
        let mut settings = settings_without_images();
        settings.output = crate::settings::OutputMode::MultipleFiles;
        let outcome = convert_document(&mut host, &mut settings, &ConvertOptions::default());
        assert!(outcome
            .report
            .warnings()
            .iter()
            .any(|w| w.contains("Panel")));
        let contents = &outcome.outputs[0].contents;
        assert!(contents.contains("Panel-800"));
        assert!(contents.contains("Panel-400"));
    }

    #[test]
    fn non_rgb_documents_abort_with_a_single_error() {
        let mut doc = responsive_doc();
        doc.color_space = ColorSpace::Cmyk;
        let mut host = SnapshotHost::new(doc);
        let mut settings = settings_without_images();
        let outcome = convert_document(&mut host, &mut settings, &ConvertOptions::default());
        assert_eq!(outcome.outputs.len(), 0);
        assert_eq!(outcome.report.errors().len(), 1);
        assert!(outcome.report.errors()[0].contains("RGB"));
    }

    #[test]
    fn suppressing_every_artboard_is_fatal() {
        let mut doc = responsive_doc();
        doc.artboards[0].name = "-a".to_string();
        doc.artboards[1].name = "-b".to_string();
        let mut host = SnapshotHost::new(doc);
        let mut settings = settings_without_images();
        let outcome = convert_document(&mut host, &mut settings, &ConvertOptions::default());
        assert!(outcome.report.errors()[0].contains("No usable artboards"));
    }

    #[test]
    fn civil_date_conversion_is_correct() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
        assert_eq!(civil_from_days(20_670), (2026, 8, 5));
    }

    fn corner(x: f64, y: f64) -> crate::models::PathPoint {
        crate::models::PathPoint {
            anchor: [x, y],
            left_direction: [x, y],
            right_direction: [x, y],
            point_type: crate::models::PointType::Corner,
        }
    }

    /// A document with a `:svg` layer whose item carries opacity and a
    /// name, plus a base art layer: enough to drive the capture passes
    /// and the vector post-processor end to end.
    fn doc_with_svg_layer(out_dir: &std::path::Path) -> Document {
        let path_item = PageItem {
            id: "p1".to_string(),
            name: Some("shore line".to_string()),
            hidden: false,
            locked: false,
            opacity: 50.0,
            blending_mode: BlendMode::Multiply,
            z: 5,
            geometric_bounds: Bounds::new(10.0, -10.0, 110.0, -60.0),
            visible_bounds: None,
            kind: PageItemKind::Path(crate::models::PathItem {
                points: vec![
                    corner(10.0, -10.0),
                    corner(110.0, -10.0),
                    corner(110.0, -60.0),
                    corner(10.0, -60.0),
                ],
                closed: true,
                clipping: false,
                guides: false,
                filled: true,
                fill_color: Some(Color::rgb(200.0, 40.0, 40.0)),
                stroked: false,
                stroke_color: None,
                stroke_width: 0.0,
            }),
        };
        Document {
            name: "Coast.ai".to_string(),
            path: Some(out_dir.to_string_lossy().into_owned()),
            saved: true,
            color_space: ColorSpace::Rgb,
            active_layer_name: None,
            artboards: vec![Artboard {
                name: "Main".to_string(),
                rect: Bounds::new(0.0, 0.0, 400.0, -300.0),
            }],
            layers: vec![
                Layer {
                    id: "Lsvg".to_string(),
                    name: "terrain:svg,inline".to_string(),
                    visible: true,
                    locked: false,
                    opacity: 100.0,
                    blending_mode: BlendMode::Normal,
                    z: 2,
                    layers: vec![],
                    items: vec![path_item],
                },
                Layer {
                    id: "Lbase".to_string(),
                    name: "background".to_string(),
                    visible: true,
                    locked: false,
                    opacity: 100.0,
                    blending_mode: BlendMode::Normal,
                    z: 1,
                    layers: vec![],
                    items: vec![],
                },
            ],
        }
    }

    #[test]
    fn svg_layers_export_and_post_process_end_to_end() {
        let out_dir = std::env::temp_dir().join(format!(
            "artboard-tools-test-{}-svg",
            std::process::id()
        ));
        std::fs::create_dir_all(&out_dir).unwrap();

        let doc = doc_with_svg_layer(&out_dir);
        let mut host = SnapshotHost::new(doc);
        let mut settings = DocSettings::default();
        settings.image_format = vec![crate::settings::ImageFormat::Png];
        let outcome = convert_document(&mut host, &mut settings, &ConvertOptions::default());
        assert!(outcome.report.errors().is_empty(), "{:?}", outcome.report.errors());

        let contents = &outcome.outputs[0].contents;
        // the svg layer was inlined with its effects restored as CSS
        assert!(contents.contains("<svg"), "{contents}");
        assert!(contents.contains("opacity:0.5;"), "{contents}");
        assert!(contents.contains("mix-blend-mode:multiply"), "{contents}");
        // the stroke-scaling guard is scoped to the layer's root id
        assert!(contents.contains("#g-svg-terrain"), "{contents}");
        assert!(contents.contains("vector-effect: non-scaling-stroke"));
        // the base raster capture landed next to the document
        let base_png = out_dir
            .join(&settings.image_output_path)
            .join("Coast-Main.png");
        assert!(base_png.exists());

        // every visibility toggle was restored
        let doc = host.into_document();
        assert!(doc.find_layer("Lsvg").unwrap().visible);
        assert!(!doc.find_item("p1").unwrap().hidden);

        let _ = std::fs::remove_dir_all(&out_dir);
    }

    #[test]
    fn failed_captures_still_restore_visibility() {
        // an unwritable image folder makes the raster capture fail
        let out_dir = std::path::Path::new("/proc/no-such-dir");
        let doc = doc_with_svg_layer(out_dir);
        let mut host = SnapshotHost::new(doc);
        let mut settings = DocSettings::default();
        settings.image_format = vec![crate::settings::ImageFormat::Png];
        let outcome = convert_document(&mut host, &mut settings, &ConvertOptions::default());
        assert_eq!(outcome.report.errors().len(), 1);

        let doc = host.into_document();
        assert!(doc.find_layer("Lsvg").unwrap().visible);
        assert!(!doc.find_item("p1").unwrap().hidden);
    }
}
