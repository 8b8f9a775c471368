use serde::{Deserialize, Serialize};

use crate::models::color::BlendMode;
use crate::models::item::PageItem;
use crate::models::name::{self, LayerTag, ObjectSettings};

/// A node in the document's layer tree.
///
/// A layer's effective visibility is the AND of its own `visible` flag and
/// every ancestor's; that resolution happens in the visibility index, not
/// here. Layer names may carry a rendering tag (`terrain:svg`) and settings
/// (`map:png,inline`), parsed through `models::name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Stable node handle assigned by the adapter. Ids share one namespace
    /// with page item ids.
    pub id: String,

    pub name: String,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default)]
    pub locked: bool,

    /// Layer opacity, 0-100.
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    #[serde(default)]
    pub blending_mode: BlendMode,

    /// Absolute stacking position within the document; larger is closer to
    /// the front.
    #[serde(default)]
    pub z: i64,

    /// Sublayers, front-most first.
    #[serde(default)]
    pub layers: Vec<Layer>,

    /// Page items directly on this layer, front-most first.
    #[serde(default)]
    pub items: Vec<PageItem>,
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    100.0
}

impl Layer {
    /// The annotation-free, keyword-safe layer name.
    pub fn clean_name(&self) -> String {
        name::clean_object_name(&self.name)
    }

    /// The rendering tag carried by the layer name, if any.
    pub fn tag(&self) -> Option<LayerTag> {
        name::layer_tag(&self.name)
    }

    /// The logical group identifier before the tag suffix (`map:svg` →
    /// `map`). Falls back to `None` when the layer carries no such suffix.
    pub fn tag_base(&self, tag: LayerTag) -> Option<String> {
        name::tag_base_name(&self.name, tag)
    }

    /// Settings parsed from the layer name annotation.
    pub fn settings(&self) -> ObjectSettings {
        name::parse_object_name(&self.name)
    }
}
