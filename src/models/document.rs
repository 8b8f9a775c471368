use serde::{Deserialize, Serialize};

use crate::models::artboard::Artboard;
use crate::models::item::{PageItem, PageItemKind};
use crate::models::layer::Layer;

/// The color space a document was authored in. Only RGB documents can be
/// converted; anything else is a fatal precondition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Cmyk,
    Grayscale,
}

/// A snapshot of the host application's drawing document.
///
/// The tree is read once at compilation start. Visibility and lock flags are
/// the only state the pipeline mutates, and those writes go through the
/// adapter so they can be reverted (see `host::DocumentHost`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The document's file name, including its extension.
    pub name: String,

    /// The directory containing the saved document. `None` for a document
    /// that has never been saved (a fatal precondition).
    pub path: Option<String>,

    /// Whether the document has been saved since its last modification.
    #[serde(default = "default_true")]
    pub saved: bool,

    /// The document color mode.
    #[serde(default)]
    pub color_space: ColorSpace,

    /// The name of the active layer, used to detect isolation-mode editing
    /// states the converter cannot run in.
    pub active_layer_name: Option<String>,

    /// The named output rectangles of the document.
    pub artboards: Vec<Artboard>,

    /// The root layer stack, front-most first (the host's layer panel order).
    pub layers: Vec<Layer>,
}

fn default_true() -> bool {
    true
}

impl Document {
    /// The document name without its drawing-file extension.
    pub fn raw_name(&self) -> &str {
        let known = [".ai", ".ait", ".eps", ".pdf", ".svg"];
        for ext in known {
            if let Some(stripped) = self.name.strip_suffix(ext) {
                return stripped;
            }
        }
        &self.name
    }

    /// Visits every page item in the document, depth first, including items
    /// nested in sublayers and groups.
    pub fn for_each_item<'a>(&'a self, f: &mut dyn FnMut(&'a PageItem)) {
        fn walk_items<'a>(items: &'a [PageItem], f: &mut dyn FnMut(&'a PageItem)) {
            for item in items {
                f(item);
                if let PageItemKind::Group(group) = &item.kind {
                    walk_items(&group.items, f);
                }
            }
        }
        fn walk_layer<'a>(layer: &'a Layer, f: &mut dyn FnMut(&'a PageItem)) {
            walk_items(&layer.items, f);
            for sub in &layer.layers {
                walk_layer(sub, f);
            }
        }
        for layer in &self.layers {
            walk_layer(layer, f);
        }
    }

    /// Looks up a page item anywhere in the tree by its id.
    pub fn find_item(&self, id: &str) -> Option<&PageItem> {
        let mut found = None;
        self.for_each_item(&mut |item| {
            if found.is_none() && item.id == id {
                found = Some(item);
            }
        });
        found
    }

    /// Looks up a layer (at any depth) by its id.
    pub fn find_layer(&self, id: &str) -> Option<&Layer> {
        fn walk<'a>(layers: &'a [Layer], id: &str) -> Option<&'a Layer> {
            for layer in layers {
                if layer.id == id {
                    return Some(layer);
                }
                if let Some(found) = walk(&layer.layers, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.layers, id)
    }
}
