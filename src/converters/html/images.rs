//! The export orchestrator.
//!
//! Drives the per-layer image/vector export passes for one artboard,
//! converting `:symbol`/`:div`/`:snippet` layers through the shape
//! classifier, capturing `:svg` and `:png` layers through the host, and
//! finally capturing the base artboard image, all under a transactional
//! visibility discipline: every hide/show performed here is logged with
//! its prior value and replayed in reverse before returning, whether the
//! captures succeeded or failed.

use std::path::{Path, PathBuf};

use log::debug;

use super::constants::{
    JPG_PIXEL_WARN_THRESHOLD, MAX_JPG_SCALE, PNG_PIXEL_WARN_THRESHOLD,
};
use super::error::Result;
use super::planner::artboard_unique_name;
use super::svg_post::{self, SvgIdIndex};
use super::symbols::{export_symbols, SymbolOptions};
use super::utils::{fmt_number, format_css_pct, round_to};
use super::visibility::build_doc_index;
use crate::host::{CaptureFormat, CaptureRequest, DocumentHost, RasterFormat};
use crate::models::{
    Bounds, CssBox, Document, Layer, LayerTag, PageItem, PageItemKind,
};
use crate::report::Report;
use crate::settings::{DocSettings, ImageFormat};

/// Per-run state shared by every artboard of an output group: the
/// page-wide id index for inline vector files, and the snippet props the
/// component script must declare.
#[derive(Default)]
pub struct RunAssets {
    pub svg_ids: SvgIdIndex,
    pub snippet_props: Vec<String>,
}

/// The image/vector embed markup produced for one artboard.
pub struct ImageData {
    pub html: String,
}

impl ImageData {
    pub fn empty() -> ImageData {
        ImageData {
            html: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Visibility transaction log
// ---------------------------------------------------------------------------

enum VisOp {
    Layer { id: String, prior: bool },
    Item { id: String, prior: bool },
}

/// Logs every visibility write with its prior value so the document can be
/// returned to its original state by a reverse replay, regardless of how
/// the capture passes ended.
#[derive(Default)]
struct VisibilityLog {
    ops: Vec<VisOp>,
}

impl VisibilityLog {
    fn set_layer_visible(
        &mut self,
        host: &mut dyn DocumentHost,
        id: &str,
        visible: bool,
    ) -> Result<()> {
        let prior = host
            .document()
            .find_layer(id)
            .map(|l| l.visible)
            .unwrap_or(true);
        host.set_layer_visible(id, visible)?;
        self.ops.push(VisOp::Layer {
            id: id.to_string(),
            prior,
        });
        Ok(())
    }

    fn set_item_hidden(
        &mut self,
        host: &mut dyn DocumentHost,
        id: &str,
        hidden: bool,
    ) -> Result<()> {
        let prior = host
            .document()
            .find_item(id)
            .map(|item| item.hidden)
            .unwrap_or(false);
        host.set_item_hidden(id, hidden)?;
        self.ops.push(VisOp::Item {
            id: id.to_string(),
            prior,
        });
        Ok(())
    }

    /// Unconditional restoration, last write first.
    fn restore(self, host: &mut dyn DocumentHost) {
        for op in self.ops.into_iter().rev() {
            let result = match op {
                VisOp::Layer { id, prior } => host.set_layer_visible(&id, prior),
                VisOp::Item { id, prior } => host.set_item_hidden(&id, prior),
            };
            if let Err(e) = result {
                log::warn!("failed to restore visibility state: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Planning (read-only over the document snapshot)
// ---------------------------------------------------------------------------

struct SymbolPass {
    z: i64,
    html: String,
    item_ids: Vec<String>,
    hide_items: bool,
}

struct SvgPass {
    layer_id: String,
    base_name: String,
    z: i64,
    inline: bool,
    opacity_css: String,
    uniq_name: String,
}

struct PngPass {
    layer_id: String,
    base_name: String,
    z: i64,
}

struct LayerCapturePlan {
    img_name: String,
    ab_rect: Bounds,
    ab_box: CssBox,
    doc_dir: PathBuf,
    text_to_hide: Vec<String>,
    symbol_passes: Vec<SymbolPass>,
    svg_passes: Vec<SvgPass>,
    png_passes: Vec<PngPass>,
    snippet_passes: Vec<SymbolPass>,
    snippet_z: Vec<(i64, String)>,
    root_visible_layers: Vec<String>,
    png_ancestors: Vec<(String, Vec<String>)>,
    contains_raster: bool,
}

/// Layers carrying the given tag, visible ones only, bottom of the stack
/// first (separately rendered layers convert from back to front).
fn find_tagged_layers<'a>(layers: &'a [Layer], tag: LayerTag, out: &mut Vec<&'a Layer>) {
    for layer in layers {
        if !layer.visible {
            continue;
        }
        if layer.tag() == Some(tag) {
            out.push(layer);
        } else {
            find_tagged_layers(&layer.layers, tag, out);
        }
    }
}

fn tagged_layers(doc: &Document, tag: LayerTag) -> Vec<&Layer> {
    let mut found = Vec::new();
    find_tagged_layers(&doc.layers, tag, &mut found);
    found.reverse();
    found
}

/// Snippet layers live at the root of the layer stack.
fn snippet_layers(doc: &Document) -> Vec<&Layer> {
    let mut found: Vec<&Layer> = doc
        .layers
        .iter()
        .filter(|layer| layer.tag() == Some(LayerTag::Snippet))
        .collect();
    found.reverse();
    found
}

/// Whether any directly visible artwork of the layer intersects the
/// artboard; prevents exporting empty images for tagged layers.
fn layer_intersects_artboard(layer: &Layer, ab_rect: &Bounds) -> bool {
    fn item_visible(item: &PageItem, ab_rect: &Bounds) -> bool {
        if item.hidden {
            return false;
        }
        match &item.kind {
            PageItemKind::Group(group) => {
                group.items.iter().any(|child| item_visible(child, ab_rect))
            }
            PageItemKind::Path(path) if path.guides => false,
            _ => item.visible_bounds().intersects(ab_rect),
        }
    }
    if !layer.visible {
        return false;
    }
    layer.items.iter().any(|item| item_visible(item, ab_rect))
        || layer
            .layers
            .iter()
            .any(|sub| layer_intersects_artboard(sub, ab_rect))
}

/// Raster content outside the tagged layers decides the `auto` format.
fn artboard_contains_raster(doc: &Document, ab_rect: &Bounds) -> bool {
    fn walk_items(items: &[PageItem], ab_rect: &Bounds) -> bool {
        items.iter().any(|item| {
            if item.hidden {
                return false;
            }
            match &item.kind {
                PageItemKind::Raster(_) => item.visible_bounds().intersects(ab_rect),
                PageItemKind::Group(group) => walk_items(&group.items, ab_rect),
                _ => false,
            }
        })
    }
    fn walk_layer(layer: &Layer, ab_rect: &Bounds) -> bool {
        if !layer.visible || layer.tag().is_some() {
            return false;
        }
        walk_items(&layer.items, ab_rect)
            || layer.layers.iter().any(|sub| walk_layer(sub, ab_rect))
    }
    doc.layers.iter().any(|layer| walk_layer(layer, ab_rect))
}

fn uniq_asset_name(name: &str, used: &[String]) -> String {
    let mut uniq = name.to_string();
    let mut n = 2;
    while used.iter().any(|existing| *existing == uniq) {
        uniq = format!("{name}-{n}");
        n += 1;
    }
    uniq
}

fn layer_opacity_css(doc_index_opacity: f64) -> String {
    if doc_index_opacity < 100.0 {
        format!("opacity:{};", fmt_number(round_to(doc_index_opacity / 100.0, 2)))
    } else {
        String::new()
    }
}

fn build_plan(
    doc: &Document,
    ab_index: usize,
    text_frame_ids: &[String],
    settings: &DocSettings,
    assets: &mut RunAssets,
) -> LayerCapturePlan {
    let index = build_doc_index(doc);
    let ab = &doc.artboards[ab_index];
    let ab_rect = ab.rect;
    let ab_box = ab_rect.to_css_box();
    let img_name = artboard_unique_name(doc, ab, settings);
    let doc_dir = PathBuf::from(doc.path.clone().unwrap_or_default());

    // symbols in :symbol layers keep fixed pixel geometry; :div symbols
    // scale with the artboard
    let mut symbol_passes = Vec::new();
    for (tag, scaled, prefix) in [
        (LayerTag::Symbol, false, "symbol"),
        (LayerTag::Div, true, "div"),
    ] {
        for layer in tagged_layers(doc, tag) {
            let id_name = layer.tag_base(tag).unwrap_or_else(|| layer.clean_name());
            let opts = SymbolOptions {
                scaled,
                tag_prefix: prefix,
                id_name,
                inner_block: String::new(),
            };
            let export = export_symbols(layer, &ab_rect, &index, &opts, settings);
            if export.html.is_empty() && export.item_ids.is_empty() {
                continue;
            }
            symbol_passes.push(SymbolPass {
                z: layer.z,
                html: format!("{}\n", export.html),
                item_ids: export.item_ids,
                hide_items: true,
            });
        }
    }

    let mut used_names: Vec<String> = Vec::new();
    let mut svg_passes = Vec::new();
    for layer in tagged_layers(doc, LayerTag::Svg) {
        let base_name = layer
            .tag_base(LayerTag::Svg)
            .unwrap_or_else(|| layer.clean_name());
        let layer_image = format!("{}-{}", img_name, layer.clean_name());
        let uniq_name = uniq_asset_name(&layer_image, &used_names);
        used_names.push(uniq_name.clone());
        let opacity = index
            .layer(&layer.id)
            .map(|entry| {
                // fold ancestor opacities the way computed item opacity does
                let mut o = entry.layer.opacity;
                for ancestor in &entry.ancestors {
                    if let Some(a) = index.layer(ancestor) {
                        o = o * a.layer.opacity / 100.0;
                    }
                }
                o
            })
            .unwrap_or(100.0);
        svg_passes.push(SvgPass {
            layer_id: layer.id.clone(),
            base_name,
            z: layer.z,
            inline: settings.inline_svg || layer.settings().flag("inline"),
            opacity_css: layer_opacity_css(opacity),
            uniq_name,
        });
    }

    let mut png_passes = Vec::new();
    let mut png_ancestors = Vec::new();
    for layer in tagged_layers(doc, LayerTag::Png) {
        if !layer_intersects_artboard(layer, &ab_rect) {
            continue;
        }
        let base_name = layer
            .tag_base(LayerTag::Png)
            .unwrap_or_else(|| layer.clean_name());
        let ancestors = index
            .layer(&layer.id)
            .map(|entry| entry.ancestors.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();
        png_ancestors.push((layer.id.clone(), ancestors));
        png_passes.push(PngPass {
            layer_id: layer.id.clone(),
            base_name,
            z: layer.z,
        });
    }

    let mut snippet_passes = Vec::new();
    let mut snippet_z = Vec::new();
    for layer in snippet_layers(doc) {
        let prop = layer
            .tag_base(LayerTag::Snippet)
            .unwrap_or_else(|| layer.clean_name());
        if !assets.snippet_props.contains(&prop) {
            assets.snippet_props.push(prop.clone());
        }
        let opts = SymbolOptions {
            scaled: true,
            tag_prefix: "snippet",
            id_name: prop.clone(),
            inner_block: format!("{{@render {prop}?.()}}"),
        };
        let export = export_symbols(layer, &ab_rect, &index, &opts, settings);
        snippet_z.push((layer.z, layer.id.clone()));
        snippet_passes.push(SymbolPass {
            z: layer.z,
            html: format!("{}\n", export.html),
            // snippet symbols stay visible; the whole layer is hidden
            item_ids: Vec::new(),
            hide_items: false,
        });
    }

    LayerCapturePlan {
        img_name,
        ab_rect,
        ab_box,
        doc_dir,
        text_to_hide: text_frame_ids.to_vec(),
        symbol_passes,
        svg_passes,
        png_passes,
        snippet_passes,
        snippet_z,
        root_visible_layers: doc
            .layers
            .iter()
            .filter(|layer| layer.visible)
            .map(|layer| layer.id.clone())
            .collect(),
        png_ancestors,
        contains_raster: artboard_contains_raster(doc, &ab_rect),
    }
}

// ---------------------------------------------------------------------------
// Capture execution
// ---------------------------------------------------------------------------

fn image_folder(doc_dir: &Path, settings: &DocSettings) -> PathBuf {
    doc_dir.join(&settings.image_output_path)
}

/// 1 for standard, 2 for double-resolution output; warns on oversized
/// pixel counts.
fn output_pixel_ratio(
    width: f64,
    height: f64,
    format: ImageFormat,
    doubleres: bool,
    report: &mut Report,
) -> f64 {
    let k = if doubleres { 2.0 } else { 1.0 };
    let warn_threshold = if format == ImageFormat::Jpg {
        JPG_PIXEL_WARN_THRESHOLD
    } else {
        PNG_PIXEL_WARN_THRESHOLD
    };
    let pixels = width * height * k * k;
    if pixels > warn_threshold {
        report.warn(format!(
            "An output image contains ~{} million pixels -- this may cause problems on mobile devices",
            (pixels / 1e6).round() as i64
        ));
    }
    k
}

struct ExportContext<'a> {
    img_name: &'a str,
    ab_rect: Bounds,
    ab_box: CssBox,
    doc_dir: &'a Path,
    /// Tagged layer being exported, if any.
    layer: Option<&'a SvgPass>,
    tag_prefix: Option<&'a str>,
    png_transparent: bool,
}

/// Captures one image (raster or vector) and returns its embed HTML, or
/// an empty string when the capture produced nothing.
fn export_image(
    host: &mut dyn DocumentHost,
    ctx: &ExportContext,
    format: ImageFormat,
    settings: &DocSettings,
    assets: &mut RunAssets,
    report: &mut Report,
) -> Result<String> {
    let img_file = format!("{}.{}", ctx.img_name, format.extension());
    let output_path = image_folder(ctx.doc_dir, settings).join(&img_file);
    let mut img_id = format!("{}{}-img", settings.namespace, ctx.img_name);
    if ctx.tag_prefix == Some("png") {
        img_id = format!("{}png-{}", settings.namespace, ctx.img_name);
    }

    // the class keeps the id's shape with the artboard-size token removed,
    // so grouped artboards share styling
    let size_token = regex::Regex::new(r"-[1-9][0-9]+-").unwrap();
    let mut img_class = size_token.replace(&img_id, "-").into_owned();
    img_class.push_str(&format!(" {}img", settings.namespace));

    if format == ImageFormat::Svg {
        if let Some(pass) = ctx.layer {
            img_id = format!("{}svg-{}", settings.namespace, pass.base_name);
        }
        img_class.push_str(&format!(" {}svg-layer", settings.namespace));

        let request = CaptureRequest {
            file_path: output_path.clone(),
            artboard_rect: ctx.ab_rect,
            format: CaptureFormat::Vector {
                embed_images: settings.svg_embed_images,
                encode_effects: true,
                trim_to_content: ctx.layer.is_some(),
            },
            layer_ids: ctx.layer.map(|pass| vec![pass.layer_id.clone()]),
        };
        let capture = match host.capture(&request)? {
            Some(capture) => capture,
            None => return Ok(String::new()), // nothing to export
        };
        svg_post::rewrite_svg_file(&output_path, &img_id, settings, report)?;

        let mut inline_style = ctx
            .layer
            .map(|pass| pass.opacity_css.clone())
            .unwrap_or_default();
        let inline = match ctx.layer {
            Some(pass) => pass.inline,
            None => settings.inline_svg,
        };

        if inline {
            if ctx.layer.is_some() {
                // tagged layers embed with percentage geometry from the
                // capture's trim metadata
                inline_style.push_str("position: absolute;");
                inline_style.push_str(&format!(
                    "width: {};",
                    format_css_pct(round_to(capture.width, 1), ctx.ab_box.width)
                ));
                inline_style.push_str(&format!(
                    "height: {};",
                    format_css_pct(round_to(capture.height, 1), ctx.ab_box.height)
                ));
                inline_style.push_str(&format!(
                    "top: {};",
                    format_css_pct(round_to(capture.top, 1), ctx.ab_box.height)
                ));
                inline_style.push_str(&format!(
                    "left: {};",
                    format_css_pct(round_to(capture.left, 1), ctx.ab_box.width)
                ));
                img_class = img_class.replace(&format!(" {}img", settings.namespace), "");
            }
            let html =
                inline_svg_html(&output_path, &img_class, &inline_style, settings, assets, report)?;
            if let Some(pass) = ctx.layer {
                report.message(format!("Generated inline SVG for layer [{}]", pass.base_name));
            }
            return Ok(html);
        }
        if let Some(pass) = ctx.layer {
            report.message(format!("Exported an SVG layer as {img_file} [{}]", pass.base_name));
        }
        return Ok(generate_image_html(
            &img_file,
            &img_id,
            &img_class,
            &inline_style,
            settings,
        ));
    }

    // raster export
    let mut image_scale = match settings.image_width {
        Some(target_width) => 100.0 * target_width / ctx.ab_box.width,
        None => {
            100.0
                * output_pixel_ratio(
                    ctx.ab_box.width,
                    ctx.ab_box.height,
                    format,
                    settings.use_2x_images_if_possible,
                    report,
                )
        }
    };
    let raster = match format {
        ImageFormat::Png => RasterFormat::Png8,
        ImageFormat::Png24 => RasterFormat::Png24,
        ImageFormat::Jpg => {
            if image_scale > MAX_JPG_SCALE {
                image_scale = MAX_JPG_SCALE;
                report.warn(format!(
                    "{img_file} was output at a smaller size than desired because of a limit on \
                     jpg exports. If the file needs to be larger, change the image format to png."
                ));
            }
            RasterFormat::Jpeg
        }
        other => {
            report.warn(format!("Unsupported image format: {other:?}"));
            return Ok(String::new());
        }
    };
    let request = CaptureRequest {
        file_path: output_path,
        artboard_rect: ctx.ab_rect,
        format: CaptureFormat::Raster {
            format: raster,
            scale_percent: image_scale,
            transparency: ctx.png_transparent || settings.png_transparent,
            color_count: settings.png_number_of_colors,
            quality: settings.jpg_quality,
        },
        layer_ids: None,
    };
    host.capture(&request)?;
    Ok(generate_image_html(
        &img_file,
        &img_id,
        &img_class,
        "",
        settings,
    ))
}

/// Reads a rewritten vector file and embeds it inline, with page-unique
/// ids.
fn inline_svg_html(
    path: &Path,
    img_class: &str,
    img_style: &str,
    settings: &DocSettings,
    assets: &mut RunAssets,
    report: &mut Report,
) -> Result<String> {
    let mut svg = std::fs::read_to_string(path)?;
    let xml_decl = regex::Regex::new(r"<\?xml.*?\?>").unwrap();
    svg = xml_decl.replace(&svg, "").into_owned();
    let mut attr = format!(" class=\"{img_class}\"");
    if !img_style.is_empty() {
        attr.push_str(&format!(" style=\"{img_style}\""));
    }
    svg = svg.replacen("<svg", &format!("<svg{attr}"), 1);
    svg = svg_post::replace_generated_ids(&svg, &settings.svg_id_prefix, &mut assets.svg_ids, report);
    Ok(svg)
}

/// The embed element for an exported image file: an absolutely positioned
/// div carrying the image as its background.
fn generate_image_html(
    img_file: &str,
    img_id: &str,
    img_class: &str,
    img_style: &str,
    settings: &DocSettings,
) -> String {
    let mut src = String::from("{assetsPath}");
    if !settings.image_source_path.is_empty() {
        src.push_str(settings.image_source_path.trim_end_matches('/'));
        src.push('/');
    }
    src.push_str(img_file);

    let mut html = format!(
        "\t\t<div id=\"{img_id}\" class=\"{img_class}\" alt=\"{}\"",
        super::utils::encode_html_entities(&settings.image_alt_text)
    );
    html.push_str(" style=\"");
    if !img_style.is_empty() {
        html.push_str(img_style);
        html.push(';');
    }
    html.push_str(&format!("background-image: url({src});\""));
    if settings.use_lazy_loader {
        // native lazy loading: the image is not fetched while hidden or
        // far from the viewport
        html.push_str(" loading=\"lazy\"");
    }
    html.push_str("></div>");
    html
}

/// Captures the base artboard image in each configured format, returning
/// the embed code of the first.
fn capture_artboard_image(
    host: &mut dyn DocumentHost,
    plan: &LayerCapturePlan,
    settings: &DocSettings,
    assets: &mut RunAssets,
    report: &mut Report,
) -> Result<String> {
    if settings.image_format.is_empty() {
        report.warn_once(
            "No images were created because no image formats were specified.",
            None,
        );
        return Ok(String::new());
    }
    let first = settings.image_format[0];
    if first != ImageFormat::Auto && first != ImageFormat::Jpg && plan.contains_raster {
        report.warn_once(
            format!(
                "An artboard contains a raster image -- consider exporting to jpg instead of {first:?}."
            ),
            None,
        );
    }

    let mut img_html = String::new();
    for fmt in &settings.image_format {
        let resolved = match fmt {
            ImageFormat::Auto => {
                if plan.contains_raster {
                    ImageFormat::Jpg
                } else {
                    ImageFormat::Png
                }
            }
            other => *other,
        };
        let ctx = ExportContext {
            img_name: &plan.img_name,
            ab_rect: plan.ab_rect,
            ab_box: plan.ab_box,
            doc_dir: &plan.doc_dir,
            layer: None,
            tag_prefix: None,
            png_transparent: false,
        };
        let html = export_image(host, &ctx, resolved, settings, assets, report)?;
        if img_html.is_empty() {
            // embed code comes from the first of multiple formats
            img_html = html;
        }
    }
    Ok(img_html)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Generates the image/vector embeds for one artboard.
///
/// Fragments are ordered by ascending original z position, with the base
/// artboard image always first (it is the background). The document's
/// visibility state is restored before returning, even when a capture
/// fails.
pub fn convert_art_items(
    host: &mut dyn DocumentHost,
    ab_index: usize,
    text_frame_ids: &[String],
    settings: &DocSettings,
    assets: &mut RunAssets,
    report: &mut Report,
) -> Result<ImageData> {
    let hide_text = !settings.testing_mode
        && settings.render_text_as == crate::settings::RenderTextAs::Html;

    let mut plan = build_plan(host.document(), ab_index, text_frame_ids, settings, assets);
    if !hide_text {
        plan.text_to_hide.clear();
    }

    let mut log = VisibilityLog::default();
    let result = run_capture_passes(host, &plan, settings, assets, report, &mut log);
    log.restore(host);
    result
}

fn run_capture_passes(
    host: &mut dyn DocumentHost,
    plan: &LayerCapturePlan,
    settings: &DocSettings,
    assets: &mut RunAssets,
    report: &mut Report,
    log: &mut VisibilityLog,
) -> Result<ImageData> {
    // fragments accumulate with their z position; the stacking of tagged
    // layers must survive into the final HTML order
    let mut layer_html: Vec<(i64, String)> = Vec::new();

    for id in &plan.text_to_hide {
        log.set_item_hidden(host, id, true)?;
    }

    for pass in plan.symbol_passes.iter().chain(plan.snippet_passes.iter()) {
        layer_html.push((pass.z, pass.html.clone()));
        if pass.hide_items {
            for id in &pass.item_ids {
                log.set_item_hidden(host, id, true)?;
            }
        }
    }

    for pass in &plan.svg_passes {
        let ctx = ExportContext {
            img_name: &pass.uniq_name,
            ab_rect: plan.ab_rect,
            ab_box: plan.ab_box,
            doc_dir: &plan.doc_dir,
            layer: Some(pass),
            tag_prefix: Some("svg"),
            png_transparent: false,
        };
        let svg_html = export_image(host, &ctx, ImageFormat::Svg, settings, assets, report)?;
        if !svg_html.is_empty() {
            layer_html.push((pass.z, format!("{svg_html}\n")));
        }
        debug!("[convert_art_items] hiding exported svg layer {}", pass.layer_id);
        log.set_layer_visible(host, &pass.layer_id, false)?;
    }

    if !plan.png_passes.is_empty() {
        // hide everything else while each :png layer is captured alone
        let targets: Vec<&str> = plan
            .png_passes
            .iter()
            .map(|p| p.layer_id.as_str())
            .collect();
        let mut hidden_others: Vec<String> = Vec::new();
        for root_id in &plan.root_visible_layers {
            let is_target_or_parent = plan.png_ancestors.iter().any(|(target, ancestors)| {
                target == root_id || ancestors.iter().any(|a| a == root_id)
            });
            if targets.contains(&root_id.as_str()) || is_target_or_parent {
                continue;
            }
            log.set_layer_visible(host, root_id, false)?;
            hidden_others.push(root_id.clone());
        }

        let png_format = if settings.image_format.contains(&ImageFormat::Png24) {
            ImageFormat::Png24
        } else {
            ImageFormat::Png
        };
        for pass in &plan.png_passes {
            // show the target (and its ancestor chain), capture, re-hide
            if let Some((_, ancestors)) = plan
                .png_ancestors
                .iter()
                .find(|(target, _)| *target == pass.layer_id)
            {
                for ancestor in ancestors {
                    log.set_layer_visible(host, ancestor, true)?;
                }
            }
            log.set_layer_visible(host, &pass.layer_id, true)?;
            let ctx = ExportContext {
                img_name: &pass.base_name,
                ab_rect: plan.ab_rect,
                ab_box: plan.ab_box,
                doc_dir: &plan.doc_dir,
                layer: None,
                tag_prefix: Some("png"),
                png_transparent: true,
            };
            let png_html = export_image(host, &ctx, png_format, settings, assets, report)?;
            layer_html.push((pass.z, format!("{png_html}\n")));
            log.set_layer_visible(host, &pass.layer_id, false)?;
        }

        // the other layers come back before the base capture; the :png
        // targets stay hidden until the log unwinds
        for root_id in hidden_others.iter().rev() {
            log.set_layer_visible(host, root_id, true)?;
        }
    }

    for (_, layer_id) in &plan.snippet_z {
        log.set_layer_visible(host, layer_id, false)?;
    }

    layer_html.sort_by_key(|(z, _)| *z);

    let base_html = if settings.write_image_files {
        capture_artboard_image(host, plan, settings, assets, report)?
    } else {
        String::new()
    };

    let mut html = base_html;
    for (_, fragment) in layer_html {
        html.push_str(&fragment);
    }
    Ok(ImageData { html })
}
