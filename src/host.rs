//! The Document Model Adapter boundary.
//!
//! The pipeline never talks to the drawing application directly; it reads a
//! typed snapshot and performs its few mutations (visibility, locking) and
//! its long-running operations (captures, clip-content queries) through the
//! [`DocumentHost`] trait. Every mutator is revertible by the caller, which
//! is what makes the transactional hide/show discipline of the export
//! orchestrator possible.
//!
//! [`SnapshotHost`] is the in-crate reference implementation, backed by an
//! owned [`Document`]. Its captures fabricate deterministic vector markup in
//! the style of the drawing application's exporter (generated `_<n>_` ids,
//! hex-escaped name characters, effect-encoded names), which is what the
//! vector post-processor is specified against. A real host integration
//! implements this trait against the live application instead.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::converters::html::svg_post;
use crate::models::{
    Bounds, Color, Document, Layer, PageItem, PageItemKind, PathPoint,
};

/// Errors reported by a document host.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Unknown node id: {0}")]
    UnknownNode(String),

    #[error("I/O error during capture: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture failed: {0}")]
    Capture(String),
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Raster capture file types offered by the host's exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png8,
    Png24,
    Jpeg,
}

/// Parameters of one invocation of the host's export capability.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Where the exported file should land.
    pub file_path: PathBuf,

    /// The artboard rectangle being captured, in native coordinates.
    pub artboard_rect: Bounds,

    /// Raster or vector capture.
    pub format: CaptureFormat,

    /// Restrict the capture to these layers (by id); `None` captures every
    /// visible layer.
    pub layer_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub enum CaptureFormat {
    Raster {
        format: RasterFormat,
        /// Export scale as a percentage (100 = 1:1).
        scale_percent: f64,
        transparency: bool,
        /// Palette size for 8-bit PNG.
        color_count: u32,
        /// JPEG quality 0-100.
        quality: u32,
    },
    Vector {
        /// Embed raster content in the file instead of referencing
        /// sidecar image files.
        embed_images: bool,
        /// Encode opacity/multiply into exported item names so the
        /// exporter does not rasterize those items (the post-processor
        /// decodes them back into inline CSS).
        encode_effects: bool,
        /// Trim the output to the content bounds and report the offsets.
        trim_to_content: bool,
    },
}

/// What a capture produced: the file, and for trimmed vector output the
/// content geometry relative to the artboard's top-left (CSS orientation).
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub file_path: PathBuf,
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

/// Read/write facade over the host application's live document.
pub trait DocumentHost {
    /// The current state of the document tree. Mutations through the other
    /// methods are visible in subsequent reads.
    fn document(&self) -> &Document;

    /// Sets a layer's visibility flag. The caller restores the prior value.
    fn set_layer_visible(&mut self, layer_id: &str, visible: bool) -> HostResult<()>;

    /// Sets a page item's hidden flag. The caller restores the prior value.
    fn set_item_hidden(&mut self, item_id: &str, hidden: bool) -> HostResult<()>;

    /// Sets a page item's lock flag. The caller restores the prior value.
    fn set_item_locked(&mut self, item_id: &str, locked: bool) -> HostResult<()>;

    /// Returns the ids of the items clipped by the given clipping path.
    /// The mask must be unlocked first; lock toggling is the caller's
    /// responsibility (and is restored afterward).
    fn query_clip_contents(&mut self, mask_id: &str) -> HostResult<Vec<String>>;

    /// Exports the current visible state of the artboard to a file.
    /// Returns `None` when there was nothing to capture (an empty tagged
    /// layer); the base artboard capture always produces a file.
    fn capture(&mut self, request: &CaptureRequest) -> HostResult<Option<CaptureResult>>;
}

// ---------------------------------------------------------------------------
// SnapshotHost
// ---------------------------------------------------------------------------

/// Reference [`DocumentHost`] backed by an owned snapshot.
pub struct SnapshotHost {
    doc: Document,
}

impl SnapshotHost {
    pub fn new(doc: Document) -> SnapshotHost {
        SnapshotHost { doc }
    }

    /// Loads a snapshot from its JSON interchange form.
    pub fn from_json(json: &str) -> crate::errors::Result<SnapshotHost> {
        let doc: Document = serde_json::from_str(json)?;
        Ok(SnapshotHost::new(doc))
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    fn find_item_mut(&mut self, id: &str) -> Option<&mut PageItem> {
        fn walk_items<'a>(items: &'a mut [PageItem], id: &str) -> Option<&'a mut PageItem> {
            for item in items {
                if item.id == id {
                    return Some(item);
                }
                if let PageItemKind::Group(group) = &mut item.kind {
                    if let Some(found) = walk_items(&mut group.items, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        fn walk_layers<'a>(layers: &'a mut [Layer], id: &str) -> Option<&'a mut PageItem> {
            for layer in layers {
                if let Some(found) = walk_items(&mut layer.items, id) {
                    return Some(found);
                }
                if let Some(found) = walk_layers(&mut layer.layers, id) {
                    return Some(found);
                }
            }
            None
        }
        walk_layers(&mut self.doc.layers, id)
    }

    fn find_layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        fn walk<'a>(layers: &'a mut [Layer], id: &str) -> Option<&'a mut Layer> {
            for layer in layers {
                if layer.id == id {
                    return Some(layer);
                }
                if let Some(found) = walk(&mut layer.layers, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&mut self.doc.layers, id)
    }

    /// Collects the visible items to include in a capture: effectively
    /// unhidden, intersecting the artboard, drawn back to front.
    fn collect_capture_items(
        &self,
        rect: &Bounds,
        layer_ids: Option<&[String]>,
    ) -> Vec<&PageItem> {
        let mut out: Vec<&PageItem> = Vec::new();

        fn walk_items<'a>(items: &'a [PageItem], rect: &Bounds, out: &mut Vec<&'a PageItem>) {
            for item in items {
                if item.hidden {
                    continue;
                }
                match &item.kind {
                    PageItemKind::Group(group) => walk_items(&group.items, rect, out),
                    _ => {
                        if item.visible_bounds().intersects(rect) {
                            out.push(item);
                        }
                    }
                }
            }
        }
        fn walk_layer<'a>(layer: &'a Layer, rect: &Bounds, out: &mut Vec<&'a PageItem>) {
            if !layer.visible {
                return;
            }
            walk_items(&layer.items, rect, out);
            for sub in &layer.layers {
                walk_layer(sub, rect, out);
            }
        }

        match layer_ids {
            Some(ids) => {
                for id in ids {
                    if let Some(layer) = self.doc.find_layer(id) {
                        walk_layer(layer, rect, &mut out);
                    }
                }
            }
            None => {
                for layer in &self.doc.layers {
                    walk_layer(layer, rect, &mut out);
                }
            }
        }
        out.sort_by_key(|item| item.z);
        out
    }

    fn fabricate_svg(
        &self,
        items: &[&PageItem],
        rect: &Bounds,
        embed_images: bool,
        encode_effects: bool,
        trim: bool,
        sidecar_dir: &Path,
        file_stem: &str,
    ) -> HostResult<(String, CaptureResult)> {
        let ab = rect.to_css_box();

        // content bounds relative to the artboard, for trim metadata
        let mut content: Option<Bounds> = None;
        for item in items {
            let b = item.visible_bounds();
            content = Some(match content {
                None => *b,
                Some(c) => Bounds::new(
                    c.left.min(b.left),
                    c.top.max(b.top),
                    c.right.max(b.right),
                    c.bottom.min(b.bottom),
                ),
            });
        }

        let (left, top, width, height) = match content {
            Some(c) if trim => {
                let cb = c.to_css_box();
                let left = cb.left - ab.left;
                let top = cb.top - ab.top;
                if cb.width > ab.width || cb.height > ab.height {
                    // content spills past the artboard; fall back to the
                    // artboard frame, as the exporter's trim would
                    (0.0, 0.0, ab.width, ab.height)
                } else {
                    (left, top, cb.width, cb.height)
                }
            }
            _ => (0.0, 0.0, ab.width, ab.height),
        };

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<svg version=\"1.1\" id=\"Layer_1\" xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
        );

        let origin_x = ab.left + left;
        let origin_y = ab.top + top;
        let mut id_counter = 0usize;
        let mut image_counter = 0usize;

        for item in items {
            let id_attr = fabricated_id(item, encode_effects, &mut id_counter);
            match &item.kind {
                PageItemKind::Path(path) => {
                    let d = path_data(&path.points, path.closed, origin_x, origin_y);
                    let fill = if path.filled {
                        svg_hex_color(path.fill_color.as_ref())
                    } else {
                        "none".to_string()
                    };
                    let mut attrs = format!("{id_attr} fill=\"{fill}\"");
                    if path.stroked {
                        let _ = write!(
                            attrs,
                            " stroke=\"{}\" stroke-width=\"{}\"",
                            svg_hex_color(path.stroke_color.as_ref()),
                            path.stroke_width
                        );
                    }
                    let _ = writeln!(svg, "<path{} d=\"{}\"/>", attrs, d);
                }
                PageItemKind::Raster(raster) => {
                    image_counter += 1;
                    let b = item.visible_bounds().to_css_box();
                    let href = if embed_images {
                        "data:image/png;base64,".to_string()
                    } else {
                        let name = match &raster.href {
                            Some(h) => h.clone(),
                            None => format!("{file_stem}-image{image_counter}.png"),
                        };
                        // sidecar file the exporter would have written
                        fs::write(sidecar_dir.join(&name), b"raster sidecar")?;
                        name
                    };
                    let _ = writeln!(
                        svg,
                        "<image{} width=\"{}\" height=\"{}\" xlink:href=\"{}\"></image>",
                        id_attr, b.width, b.height, href
                    );
                }
                PageItemKind::Text(_) | PageItemKind::Group(_) => {
                    // text is hidden before vector capture; groups were
                    // flattened during collection
                }
            }
        }
        svg.push_str("</svg>\n");

        Ok((
            svg,
            CaptureResult {
                file_path: PathBuf::new(),
                width,
                height,
                left,
                top,
            },
        ))
    }
}

/// Id attribute for a fabricated element, in the exporter's style: named
/// items get `<name>_<n>_` ids with unsafe characters hex-escaped; items
/// with encoded effects carry the encoded name verbatim.
fn fabricated_id(item: &PageItem, encode_effects: bool, counter: &mut usize) -> String {
    let effects = if encode_effects {
        svg_post::encode_effects_name(item.opacity, item.blending_mode, item.name.as_deref())
    } else {
        None
    };
    if let Some(encoded) = effects {
        return format!(" id=\"{}\"", encoded);
    }
    match &item.name {
        Some(name) if !name.is_empty() => {
            *counter += 1;
            format!(" id=\"{}_{}_\"", hex_escape_id(name), counter)
        }
        _ => String::new(),
    }
}

/// Escapes characters outside `[A-Za-z0-9_-]` the way the exporter does:
/// `_xHH_` with an uppercase hex char code.
fn hex_escape_id(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            out.push(ch);
        } else {
            let code = ch as u32;
            if (0x10..0x80).contains(&code) {
                let _ = write!(out, "_x{:02X}_", code);
            } else {
                out.push('_');
            }
        }
    }
    out
}

fn svg_hex_color(color: Option<&Color>) -> String {
    match color.map(Color::resolved) {
        Some(Color::Rgb(rgb)) => format!(
            "#{:02X}{:02X}{:02X}",
            rgb.red.round() as u8,
            rgb.green.round() as u8,
            rgb.blue.round() as u8
        ),
        Some(Color::Gray(gray)) => {
            let v = ((100.0 - gray.gray) / 100.0 * 255.0).round() as u8;
            format!("#{v:02X}{v:02X}{v:02X}")
        }
        _ => "#000000".to_string(),
    }
}

/// Builds an SVG path `d` attribute from native-space anchor points,
/// converting to the y-down space with the given origin.
fn path_data(points: &[PathPoint], closed: bool, origin_x: f64, origin_y: f64) -> String {
    let px = |p: [f64; 2]| (p[0] - origin_x, -p[1] - origin_y);
    let mut d = String::new();
    for (i, point) in points.iter().enumerate() {
        let (x, y) = px(point.anchor);
        if i == 0 {
            let _ = write!(d, "M{x},{y}");
        } else {
            let prev = &points[i - 1];
            if prev.is_corner() && point.is_corner() {
                let _ = write!(d, "L{x},{y}");
            } else {
                let (c1x, c1y) = px(prev.right_direction);
                let (c2x, c2y) = px(point.left_direction);
                let _ = write!(d, "C{c1x},{c1y} {c2x},{c2y} {x},{y}");
            }
        }
    }
    if closed && !points.is_empty() {
        d.push('Z');
    }
    d
}

impl DocumentHost for SnapshotHost {
    fn document(&self) -> &Document {
        &self.doc
    }

    fn set_layer_visible(&mut self, layer_id: &str, visible: bool) -> HostResult<()> {
        match self.find_layer_mut(layer_id) {
            Some(layer) => {
                layer.visible = visible;
                Ok(())
            }
            None => Err(HostError::UnknownNode(layer_id.to_string())),
        }
    }

    fn set_item_hidden(&mut self, item_id: &str, hidden: bool) -> HostResult<()> {
        match self.find_item_mut(item_id) {
            Some(item) => {
                item.hidden = hidden;
                Ok(())
            }
            None => Err(HostError::UnknownNode(item_id.to_string())),
        }
    }

    fn set_item_locked(&mut self, item_id: &str, locked: bool) -> HostResult<()> {
        match self.find_item_mut(item_id) {
            Some(item) => {
                item.locked = locked;
                Ok(())
            }
            None => Err(HostError::UnknownNode(item_id.to_string())),
        }
    }

    fn query_clip_contents(&mut self, mask_id: &str) -> HostResult<Vec<String>> {
        // locate the mask's owning container: the clipped group it leads,
        // or the layer it sits on
        fn collect_ids(items: &[PageItem], skip: &str, out: &mut Vec<String>) {
            for item in items {
                if item.id == skip {
                    continue;
                }
                out.push(item.id.clone());
                if let PageItemKind::Group(group) = &item.kind {
                    collect_ids(&group.items, skip, out);
                }
            }
        }

        fn search_items(items: &[PageItem], mask_id: &str) -> Option<Vec<String>> {
            for item in items {
                if let PageItemKind::Group(group) = &item.kind {
                    if group.items.iter().any(|child| child.id == mask_id) {
                        let mut out = Vec::new();
                        collect_ids(&group.items, mask_id, &mut out);
                        return Some(out);
                    }
                    if let Some(found) = search_items(&group.items, mask_id) {
                        return Some(found);
                    }
                }
            }
            None
        }

        fn search_layers(layers: &[Layer], mask_id: &str) -> Option<Vec<String>> {
            for layer in layers {
                if let Some(mask) = layer.items.iter().find(|item| item.id == mask_id) {
                    // a layer-owned clipping path clips everything behind
                    // it on the same layer
                    let mask_z = mask.z;
                    let mut out = Vec::new();
                    collect_ids(&layer.items, mask_id, &mut out);
                    let layer_ref = layer;
                    out.retain(|id| {
                        layer_ref
                            .items
                            .iter()
                            .find(|item| &item.id == id)
                            .map(|item| item.z < mask_z)
                            .unwrap_or(true)
                    });
                    return Some(out);
                }
                if let Some(found) = search_items(&layer.items, mask_id) {
                    return Some(found);
                }
                if let Some(found) = search_layers(&layer.layers, mask_id) {
                    return Some(found);
                }
            }
            None
        }

        search_layers(&self.doc.layers, mask_id)
            .ok_or_else(|| HostError::UnknownNode(mask_id.to_string()))
    }

    fn capture(&mut self, request: &CaptureRequest) -> HostResult<Option<CaptureResult>> {
        let rect = request.artboard_rect;
        let items = self.collect_capture_items(&rect, request.layer_ids.as_deref());

        match &request.format {
            CaptureFormat::Vector {
                embed_images,
                encode_effects,
                trim_to_content,
            } => {
                // empty tagged layers produce no file at all
                if items.is_empty() && request.layer_ids.is_some() {
                    return Ok(None);
                }
                let dir = request
                    .file_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                fs::create_dir_all(&dir)?;
                let stem = request
                    .file_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("capture")
                    .to_string();
                let (svg, mut result) = self.fabricate_svg(
                    &items,
                    &rect,
                    *embed_images,
                    *encode_effects,
                    *trim_to_content,
                    &dir,
                    &stem,
                )?;
                fs::write(&request.file_path, svg)?;
                result.file_path = request.file_path.clone();
                Ok(Some(result))
            }
            CaptureFormat::Raster { scale_percent, .. } => {
                if let Some(dir) = request.file_path.parent() {
                    fs::create_dir_all(dir)?;
                }
                // a stand-in for the host's rasterizer: the pipeline only
                // needs the file to exist and the geometry to be reported
                fs::write(&request.file_path, b"artboard-tools raster placeholder\n")?;
                let ab = rect.to_css_box();
                let k = scale_percent / 100.0;
                Ok(Some(CaptureResult {
                    file_path: request.file_path.clone(),
                    width: ab.width * k,
                    height: ab.height * k,
                    left: 0.0,
                    top: 0.0,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Artboard, BlendMode, ColorSpace, GroupItem, PathItem, PointType};

    fn path(id: &str, clipping: bool, z: i64) -> PageItem {
        PageItem {
            id: id.to_string(),
            name: None,
            hidden: false,
            locked: false,
            opacity: 100.0,
            blending_mode: BlendMode::Normal,
            z,
            geometric_bounds: Bounds::new(0.0, 0.0, 50.0, -50.0),
            visible_bounds: None,
            kind: PageItemKind::Path(PathItem {
                points: vec![PathPoint {
                    anchor: [0.0, 0.0],
                    left_direction: [0.0, 0.0],
                    right_direction: [0.0, 0.0],
                    point_type: PointType::Corner,
                }],
                closed: true,
                clipping,
                guides: false,
                filled: true,
                fill_color: Some(Color::rgb(10.0, 200.0, 10.0)),
                stroked: false,
                stroke_color: None,
                stroke_width: 0.0,
            }),
        }
    }

    fn doc(layers: Vec<Layer>) -> Document {
        Document {
            name: "host.ai".to_string(),
            path: Some("/tmp".to_string()),
            saved: true,
            color_space: ColorSpace::Rgb,
            active_layer_name: None,
            artboards: vec![Artboard {
                name: "AB".to_string(),
                rect: Bounds::new(0.0, 0.0, 100.0, -100.0),
            }],
            layers,
        }
    }

    fn layer(id: &str, items: Vec<PageItem>) -> Layer {
        Layer {
            id: id.to_string(),
            name: id.to_string(),
            visible: true,
            locked: false,
            opacity: 100.0,
            blending_mode: BlendMode::Normal,
            z: 0,
            layers: vec![],
            items,
        }
    }

    #[test]
    fn clip_contents_of_a_clipped_group_are_its_other_items() {
        let group = PageItem {
            id: "grp".to_string(),
            name: None,
            hidden: false,
            locked: false,
            opacity: 100.0,
            blending_mode: BlendMode::Normal,
            z: 0,
            geometric_bounds: Bounds::new(0.0, 0.0, 50.0, -50.0),
            visible_bounds: None,
            kind: PageItemKind::Group(GroupItem {
                clipped: true,
                items: vec![path("mask", true, 3), path("a", false, 2), path("b", false, 1)],
            }),
        };
        let mut host = SnapshotHost::new(doc(vec![layer("L1", vec![group])]));
        let mut ids = host.query_clip_contents("mask").unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn a_layer_mask_clips_the_items_behind_it() {
        let items = vec![path("mask", true, 10), path("behind", false, 5), path("front", false, 20)];
        let mut host = SnapshotHost::new(doc(vec![layer("L1", items)]));
        let ids = host.query_clip_contents("mask").unwrap();
        assert_eq!(ids, vec!["behind".to_string()]);
    }

    #[test]
    fn visibility_mutations_are_readable_through_the_document() {
        let mut host = SnapshotHost::new(doc(vec![layer("L1", vec![path("p", false, 1)])]));
        host.set_item_hidden("p", true).unwrap();
        assert!(host.document().find_item("p").unwrap().hidden);
        host.set_layer_visible("L1", false).unwrap();
        assert!(!host.document().find_layer("L1").unwrap().visible);
        assert!(host.set_item_hidden("nope", true).is_err());
    }

    #[test]
    fn empty_tagged_layer_captures_produce_no_file() {
        let mut host = SnapshotHost::new(doc(vec![layer("L1", vec![]), layer("L2", vec![path("p", false, 1)])]));
        let out_dir = std::env::temp_dir().join(format!("artboard-tools-host-{}", std::process::id()));
        let request = CaptureRequest {
            file_path: out_dir.join("empty.svg"),
            artboard_rect: Bounds::new(0.0, 0.0, 100.0, -100.0),
            format: CaptureFormat::Vector {
                embed_images: false,
                encode_effects: false,
                trim_to_content: true,
            },
            layer_ids: Some(vec!["L1".to_string()]),
        };
        assert!(host.capture(&request).unwrap().is_none());

        let full = CaptureRequest {
            layer_ids: None,
            file_path: out_dir.join("full.svg"),
            ..request
        };
        let result = host.capture(&full).unwrap().expect("content captured");
        assert!(result.file_path.exists());
        let svg = std::fs::read_to_string(&result.file_path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<path"));
        let _ = std::fs::remove_dir_all(&out_dir);
    }
}
