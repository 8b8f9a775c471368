//! Visibility and mask resolution.
//!
//! Builds an index over the document tree (effective hidden state, computed
//! opacity, inherited blend mode, owning layer), discovers clipping masks
//! through the host, and selects the text frames eligible to render as HTML
//! on a given artboard.

use indexmap::IndexMap;

use super::constants::MASK_ARTBOARD_TOLERANCE;
use super::error::Result;
use crate::host::DocumentHost;
use crate::models::{
    BlendMode, Bounds, Document, Layer, PageItem, PageItemKind, TextKind,
};
use crate::report::Report;
use crate::settings::{DocSettings, RenderTextAs};

/// Per-item facts resolved against the full ancestor chain.
#[derive(Debug, Clone)]
pub struct IndexedItem<'a> {
    pub item: &'a PageItem,
    /// OR of the item's own hidden flag and every ancestor's.
    pub hidden: bool,
    /// Product of the opacities down the ancestor chain, 0-100.
    pub opacity: f64,
    /// The first non-normal blend mode found walking up from the item.
    pub blend: BlendMode,
    /// The layer the item ultimately sits on.
    pub layer_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct IndexedLayer<'a> {
    pub layer: &'a Layer,
    pub hidden: bool,
    /// Ancestor layer ids, outermost first (not including the layer).
    pub ancestors: Vec<&'a str>,
}

/// Lookup maps over every layer and page item in the document, built once
/// per compilation pass.
#[derive(Debug, Default)]
pub struct DocIndex<'a> {
    pub items: IndexMap<&'a str, IndexedItem<'a>>,
    pub layers: IndexMap<&'a str, IndexedLayer<'a>>,
}

impl<'a> DocIndex<'a> {
    pub fn item(&self, id: &str) -> Option<&IndexedItem<'a>> {
        self.items.get(id)
    }

    pub fn layer(&self, id: &str) -> Option<&IndexedLayer<'a>> {
        self.layers.get(id)
    }

    /// Layer path (root-most first, ending with the layer itself).
    fn layer_path(&self, id: &str) -> Vec<&'a str> {
        match self.layers.get(id) {
            Some(entry) => {
                let mut path = entry.ancestors.clone();
                path.push(entry.layer.id.as_str());
                path
            }
            None => Vec::new(),
        }
    }

    /// The deepest layer that is an ancestor (or owner) of every given
    /// item, or `None` if the items share no layer.
    pub fn common_ancestor_layer(&self, item_ids: &[String]) -> Option<&'a str> {
        let mut common: Option<Vec<&'a str>> = None;
        for id in item_ids {
            let entry = self.items.get(id.as_str())?;
            let path = self.layer_path(entry.layer_id);
            common = Some(match common {
                None => path,
                Some(prev) => {
                    let mut shared = Vec::new();
                    for (a, b) in prev.iter().zip(path.iter()) {
                        if a == b {
                            shared.push(*a);
                        } else {
                            break;
                        }
                    }
                    shared
                }
            });
        }
        common.and_then(|path| path.last().copied())
    }
}

/// Walks the document once and resolves ancestor-dependent state for every
/// layer and item.
pub fn build_doc_index(doc: &Document) -> DocIndex<'_> {
    let mut index = DocIndex::default();

    struct Scope<'a> {
        hidden: bool,
        opacity: f64,
        blend: BlendMode,
        layer_id: &'a str,
    }

    fn walk_items<'a>(
        items: &'a [PageItem],
        scope: &Scope<'a>,
        index: &mut DocIndex<'a>,
    ) {
        for item in items {
            let hidden = scope.hidden || item.hidden;
            let opacity = scope.opacity * item.opacity / 100.0;
            let blend = if item.blending_mode != BlendMode::Normal {
                item.blending_mode
            } else {
                scope.blend
            };
            index.items.insert(
                item.id.as_str(),
                IndexedItem {
                    item,
                    hidden,
                    opacity,
                    blend,
                    layer_id: scope.layer_id,
                },
            );
            if let PageItemKind::Group(group) = &item.kind {
                let inner = Scope {
                    hidden,
                    opacity,
                    blend,
                    layer_id: scope.layer_id,
                };
                walk_items(&group.items, &inner, index);
            }
        }
    }

    fn walk_layer<'a>(
        layer: &'a Layer,
        parent_hidden: bool,
        parent_opacity: f64,
        parent_blend: BlendMode,
        ancestors: &[&'a str],
        index: &mut DocIndex<'a>,
    ) {
        let hidden = parent_hidden || !layer.visible;
        let opacity = parent_opacity * layer.opacity / 100.0;
        let blend = if layer.blending_mode != BlendMode::Normal {
            layer.blending_mode
        } else {
            parent_blend
        };
        index.layers.insert(
            layer.id.as_str(),
            IndexedLayer {
                layer,
                hidden,
                ancestors: ancestors.to_vec(),
            },
        );
        let scope = Scope {
            hidden,
            opacity,
            blend,
            layer_id: layer.id.as_str(),
        };
        walk_items(&layer.items, &scope, index);
        let mut child_ancestors = ancestors.to_vec();
        child_ancestors.push(layer.id.as_str());
        for sub in &layer.layers {
            walk_layer(sub, hidden, opacity, blend, &child_ancestors, index);
        }
    }

    for layer in &doc.layers {
        walk_layer(layer, false, 100.0, BlendMode::Normal, &[], &mut index);
    }
    index
}

// ---------------------------------------------------------------------------
// Mask discovery
// ---------------------------------------------------------------------------

/// Who owns a clipping mask: the clipped group containing it, or the layer
/// whose items it clips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskOwner {
    Group(String),
    Layer(String),
}

/// One clipping mask and the content it clips. Built once per compilation
/// by [`find_masks`]; the host does not materialize this association
/// natively.
#[derive(Debug, Clone)]
pub struct MaskInfo {
    pub mask_id: String,
    pub bounds: Bounds,
    pub item_ids: Vec<String>,
    /// The subset of `item_ids` that are text frames.
    pub text_ids: Vec<String>,
    pub owner: MaskOwner,
}

struct MaskCandidate {
    id: String,
    bounds: Bounds,
    relevant: bool,
    group_owner: Option<String>,
    was_locked: bool,
}

/// Discovers all clipping masks and their contents.
///
/// Candidates are found by walking the snapshot for clipping paths; their
/// contents come from the host's clip-content query, which requires the
/// mask to be unlocked. Every lock flag touched here is restored before
/// returning. Group-owned masks clipping purely graphical content are
/// skipped to save the (expensive) content query.
pub fn find_masks(host: &mut dyn DocumentHost, report: &mut Report) -> Result<Vec<MaskInfo>> {
    let mut candidates: Vec<MaskCandidate> = Vec::new();
    {
        let doc = host.document();
        collect_mask_candidates(doc, &mut candidates);
    }

    // lock every mask, then unlock each in turn while its contents are
    // queried, so overlapping masks don't capture each other
    for candidate in &candidates {
        host.set_item_locked(&candidate.id, true)?;
    }

    let mut raw: Vec<(usize, Vec<String>)> = Vec::new();
    let mut query_result: Result<()> = Ok(());
    for (i, candidate) in candidates.iter().enumerate() {
        if !candidate.relevant {
            continue;
        }
        match host.set_item_locked(&candidate.id, false) {
            Ok(()) => {}
            Err(e) => {
                query_result = Err(e.into());
                break;
            }
        }
        match host.query_clip_contents(&candidate.id) {
            Ok(item_ids) => raw.push((i, item_ids)),
            Err(e) => {
                query_result = Err(e.into());
            }
        }
        if let Err(e) = host.set_item_locked(&candidate.id, true) {
            query_result = query_result.and(Err(e.into()));
        }
        if query_result.is_err() {
            break;
        }
    }

    // restore original lock state unconditionally
    for candidate in &candidates {
        let _ = host.set_item_locked(&candidate.id, candidate.was_locked);
    }
    query_result?;

    let doc = host.document();
    let index = build_doc_index(doc);
    let mut found = Vec::new();
    for (i, item_ids) in raw {
        let candidate = &candidates[i];
        let text_ids: Vec<String> = item_ids
            .iter()
            .filter(|id| {
                index
                    .item(id)
                    .map(|entry| entry.item.is_text())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        let owner = match &candidate.group_owner {
            Some(group_id) => Some(MaskOwner::Group(group_id.clone())),
            None => index
                .common_ancestor_layer(&item_ids)
                .map(|id| MaskOwner::Layer(id.to_string())),
        };
        match owner {
            Some(owner) if !item_ids.is_empty() => found.push(MaskInfo {
                mask_id: candidate.id.clone(),
                bounds: candidate.bounds,
                item_ids,
                text_ids,
                owner,
            }),
            Some(_) => {}
            None => report.message(format!(
                "Could not attribute clipping mask \"{}\" to a group or layer",
                candidate.id
            )),
        }
    }
    Ok(found)
}

fn collect_mask_candidates(doc: &Document, out: &mut Vec<MaskCandidate>) {
    fn walk_items(
        items: &[PageItem],
        enclosing_group: Option<&PageItem>,
        out: &mut Vec<MaskCandidate>,
    ) {
        for item in items {
            if let PageItemKind::Group(group) = &item.kind {
                walk_items(&group.items, Some(item), out);
                continue;
            }
            let is_clipping = item
                .as_path()
                .map(|path| path.clipping && !path.guides)
                .unwrap_or(false);
            if !is_clipping || item.hidden {
                continue;
            }
            // a mask inside a group that contains no text frames clips
            // purely graphical content and can be skipped
            let (relevant, group_owner) = match enclosing_group {
                Some(parent) => match &parent.kind {
                    PageItemKind::Group(g) => (g.contains_text(), Some(parent.id.clone())),
                    _ => (true, None),
                },
                None => (true, None),
            };
            out.push(MaskCandidate {
                id: item.id.clone(),
                bounds: item.geometric_bounds,
                relevant,
                group_owner,
                was_locked: item.locked,
            });
        }
    }
    fn walk_layer(layer: &Layer, out: &mut Vec<MaskCandidate>) {
        if !layer.visible {
            return;
        }
        walk_items(&layer.items, None, out);
        for sub in &layer.layers {
            walk_layer(sub, out);
        }
    }
    for layer in &doc.layers {
        walk_layer(layer, out);
    }
}

// ---------------------------------------------------------------------------
// Text frame selection
// ---------------------------------------------------------------------------

/// Whether a text frame can be rendered as HTML on the given artboard.
fn text_frame_is_renderable(entry: &IndexedItem, ab_rect: &Bounds) -> bool {
    let frame = match entry.item.as_text() {
        Some(frame) => frame,
        None => return false,
    };
    if !entry.item.visible_bounds().intersects(ab_rect) {
        return false;
    }
    if !matches!(frame.kind, TextKind::Point | TextKind::Area) {
        return false;
    }
    if entry.hidden {
        return false;
    }
    if frame.contents().is_empty() {
        return false;
    }
    true
}

/// Text frames that overlap the artboard but are hidden by a clipping
/// mask. The mask's bounding box approximates its clip area: a frame
/// counts as masked out when it intersects the artboard while falling
/// outside the mask box, or while the mask box itself misses the artboard.
fn clipped_text_frames<'a>(
    index: &DocIndex<'a>,
    masks: &[MaskInfo],
    ab_rect: &Bounds,
) -> Vec<&'a str> {
    let mut excluded = Vec::new();
    for mask in masks {
        if mask.bounds.similar_to(ab_rect, MASK_ARTBOARD_TOLERANCE) {
            // the mask clips the artboard itself; skip the test
            continue;
        }
        if !mask.bounds.intersects(ab_rect) {
            continue; // mask belongs to another artboard
        }
        for id in &mask.text_ids {
            if let Some(entry) = index.item(id) {
                let item_rect = entry.item.geometric_bounds;
                let item_in_artboard = item_rect.intersects(ab_rect);
                let mask_in_artboard = mask.bounds.intersects(ab_rect);
                let item_in_mask = item_rect.intersects(&mask.bounds);
                if item_in_artboard && (!mask_in_artboard || !item_in_mask) {
                    excluded.push(entry.item.id.as_str());
                }
            }
        }
    }
    excluded
}

/// The ordered list of text frames eligible to render as HTML on one
/// artboard: renderable, not masked out, optionally excluding rotated
/// frames (left to image capture), sorted top-to-bottom then
/// left-to-right for deterministic output.
pub fn text_frames_for_artboard<'a>(
    index: &DocIndex<'a>,
    masks: &[MaskInfo],
    ab_rect: &Bounds,
    settings: &DocSettings,
) -> Vec<&'a PageItem> {
    let excluded = clipped_text_frames(index, masks, ab_rect);
    let mut selected: Vec<&IndexedItem<'a>> = index
        .items
        .values()
        .filter(|entry| entry.item.is_text())
        .filter(|entry| text_frame_is_renderable(entry, ab_rect))
        .filter(|entry| !excluded.contains(&entry.item.id.as_str()))
        .collect();

    if settings.render_rotated_skewed_text_as == RenderTextAs::Image {
        selected.retain(|entry| {
            entry
                .item
                .as_text()
                .map(|frame| !frame.is_rotated())
                .unwrap_or(true)
        });
    }

    selected.sort_by(|a, b| {
        let (ab_, bb) = (a.item.geometric_bounds, b.item.geometric_bounds);
        bb.top
            .partial_cmp(&ab_.top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                ab_.left
                    .partial_cmp(&bb.left)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    selected.into_iter().map(|entry| entry.item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Artboard, CharacterRange, ColorSpace, Color, Matrix, Paragraph, TextFrame,
    };

    fn text_item(id: &str, bounds: Bounds) -> PageItem {
        text_item_with_matrix(id, bounds, Matrix::default())
    }

    fn text_item_with_matrix(id: &str, bounds: Bounds, matrix: Matrix) -> PageItem {
        PageItem {
            id: id.to_string(),
            name: None,
            hidden: false,
            locked: false,
            opacity: 100.0,
            blending_mode: BlendMode::Normal,
            z: 0,
            geometric_bounds: bounds,
            visible_bounds: None,
            kind: PageItemKind::Text(TextFrame {
                kind: TextKind::Area,
                matrix,
                note: None,
                paragraphs: vec![Paragraph {
                    justification: Default::default(),
                    leading: 14.0,
                    space_before: 0.0,
                    space_after: 0.0,
                    ranges: vec![CharacterRange {
                        text: "hello".to_string(),
                        font: "Georgia".to_string(),
                        size: 12.0,
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

    fn doc_with_items(items: Vec<PageItem>) -> Document {
        Document {
            name: "t.ai".to_string(),
            path: Some("/tmp".to_string()),
            saved: true,
            color_space: ColorSpace::Rgb,
            active_layer_name: None,
            artboards: vec![Artboard {
                name: "AB".to_string(),
                rect: Bounds::new(0.0, 0.0, 100.0, -100.0),
            }],
            layers: vec![Layer {
                id: "L1".to_string(),
                name: "Layer 1".to_string(),
                visible: true,
                locked: false,
                opacity: 100.0,
                blending_mode: BlendMode::Normal,
                z: 0,
                layers: vec![],
                items,
            }],
        }
    }

    #[test]
    fn frames_outside_mask_bbox_are_excluded() {
        let ab_rect = Bounds::new(0.0, 0.0, 100.0, -100.0);
        let mask_bounds = Bounds::new(0.0, 0.0, 50.0, -100.0);
        let outside = text_item("t-out", Bounds::new(60.0, 0.0, 90.0, -30.0));
        let inside = text_item("t-in", Bounds::new(10.0, 0.0, 40.0, -30.0));
        let doc = doc_with_items(vec![outside, inside]);
        let index = build_doc_index(&doc);

        let masks = vec![MaskInfo {
            mask_id: "m".to_string(),
            bounds: mask_bounds,
            item_ids: vec!["t-out".to_string(), "t-in".to_string()],
            text_ids: vec!["t-out".to_string(), "t-in".to_string()],
            owner: MaskOwner::Layer("L1".to_string()),
        }];

        let frames =
            text_frames_for_artboard(&index, &masks, &ab_rect, &DocSettings::default());
        let ids: Vec<&str> = frames.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["t-in"]);
    }

    #[test]
    fn masks_covering_the_artboard_are_skipped() {
        let ab_rect = Bounds::new(0.0, 0.0, 100.0, -100.0);
        // within the 5-unit tolerance of the artboard rect on every side
        let mask_bounds = Bounds::new(-2.0, 3.0, 103.0, -101.0);
        let frame = text_item("t1", Bounds::new(60.0, 0.0, 90.0, -30.0));
        let doc = doc_with_items(vec![frame]);
        let index = build_doc_index(&doc);
        let masks = vec![MaskInfo {
            mask_id: "m".to_string(),
            bounds: mask_bounds,
            item_ids: vec!["t1".to_string()],
            text_ids: vec!["t1".to_string()],
            owner: MaskOwner::Layer("L1".to_string()),
        }];
        let frames =
            text_frames_for_artboard(&index, &masks, &ab_rect, &DocSettings::default());
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn rotated_frames_can_be_left_to_image_capture() {
        let ab_rect = Bounds::new(0.0, 0.0, 100.0, -100.0);
        let rotated = Matrix {
            a: 0.94,
            b: 0.34,
            c: -0.34,
            d: 0.94,
            tx: 0.0,
            ty: 0.0,
        };
        let doc = doc_with_items(vec![
            text_item_with_matrix("t-rot", Bounds::new(0.0, 0.0, 30.0, -10.0), rotated),
            text_item("t-straight", Bounds::new(0.0, -20.0, 30.0, -30.0)),
        ]);
        let index = build_doc_index(&doc);

        let mut settings = DocSettings::default();
        settings.render_rotated_skewed_text_as = RenderTextAs::Image;
        let frames = text_frames_for_artboard(&index, &[], &ab_rect, &settings);
        let ids: Vec<&str> = frames.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["t-straight"]);
    }

    #[test]
    fn selection_is_ordered_top_to_bottom_left_to_right() {
        let ab_rect = Bounds::new(0.0, 0.0, 100.0, -100.0);
        let doc = doc_with_items(vec![
            text_item("low", Bounds::new(10.0, -50.0, 30.0, -60.0)),
            text_item("top-right", Bounds::new(40.0, -5.0, 70.0, -15.0)),
            text_item("top-left", Bounds::new(5.0, -5.0, 25.0, -15.0)),
        ]);
        let index = build_doc_index(&doc);
        let frames = text_frames_for_artboard(&index, &[], &ab_rect, &DocSettings::default());
        let ids: Vec<&str> = frames.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["top-left", "top-right", "low"]);
    }

    #[test]
    fn hidden_ancestry_hides_descendants() {
        let mut doc = doc_with_items(vec![text_item("t1", Bounds::new(0.0, 0.0, 10.0, -10.0))]);
        doc.layers[0].visible = false;
        let index = build_doc_index(&doc);
        assert!(index.item("t1").unwrap().hidden);
    }
}
