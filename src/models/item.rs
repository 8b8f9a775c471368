use serde::{Deserialize, Serialize};

use crate::models::color::{BlendMode, Color};
use crate::models::common::Bounds;
use crate::models::text::TextFrame;

/// A drawable object on a layer.
///
/// The common fields (bounds, hidden flag, opacity, blend mode, stacking
/// position) live here; the variant payload is flattened from the snapshot
/// JSON under a `path` / `group` / `text` / `raster` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageItem {
    /// Stable node handle assigned by the adapter.
    pub id: String,

    /// The item's name in the layers panel, if it was given one.
    pub name: Option<String>,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub locked: bool,

    /// Item opacity, 0-100. Effective opacity multiplies down the ancestor
    /// chain.
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    #[serde(default)]
    pub blending_mode: BlendMode,

    /// Absolute stacking position within the document; larger is closer to
    /// the front.
    #[serde(default)]
    pub z: i64,

    /// The item's geometric bounds (ignoring stroke width and effects).
    pub geometric_bounds: Bounds,

    /// The item's visible bounds (including stroke width); defaults to the
    /// geometric bounds when the host reports no difference.
    pub visible_bounds: Option<Bounds>,

    #[serde(flatten)]
    pub kind: PageItemKind,
}

fn default_opacity() -> f64 {
    100.0
}

impl PageItem {
    pub fn visible_bounds(&self) -> &Bounds {
        self.visible_bounds.as_ref().unwrap_or(&self.geometric_bounds)
    }

    pub fn as_path(&self) -> Option<&PathItem> {
        match &self.kind {
            PageItemKind::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextFrame> {
        match &self.kind {
            PageItemKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, PageItemKind::Text(_))
    }
}

/// The closed set of page item variants the converter models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageItemKind {
    /// A vector path.
    Path(PathItem),
    /// A group of items, optionally acting as a clipping group.
    Group(GroupItem),
    /// A text frame.
    Text(TextFrame),
    /// A placed or embedded raster image. Only its presence matters: it
    /// drives the automatic jpg-versus-png format choice and the
    /// raster-reference warnings.
    Raster(RasterItem),
}

/// Whether an anchor point is a hard corner or a smoothed vertex, as
/// reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointType {
    Corner,
    Smooth,
}

/// One anchor point of a path, with its incoming and outgoing control
/// points. Coordinates are `[x, y]` in the native y-up space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPoint {
    pub anchor: [f64; 2],
    pub left_direction: [f64; 2],
    pub right_direction: [f64; 2],
    #[serde(default = "default_point_type")]
    pub point_type: PointType,
}

fn default_point_type() -> PointType {
    PointType::Corner
}

impl PathPoint {
    /// True when both control points coincide with the anchor, i.e. the
    /// path is not curved at this point. Polyline vertices are often
    /// reported as SMOOTH by the host, so the control points are checked
    /// instead of the point type.
    pub fn is_corner(&self) -> bool {
        self.anchor[0] == self.left_direction[0]
            && self.anchor[0] == self.right_direction[0]
            && self.anchor[1] == self.left_direction[1]
            && self.anchor[1] == self.right_direction[1]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathItem {
    #[serde(default)]
    pub points: Vec<PathPoint>,

    #[serde(default)]
    pub closed: bool,

    /// True when this path clips the other items of its group or layer.
    #[serde(default)]
    pub clipping: bool,

    /// Guide paths never render.
    #[serde(default)]
    pub guides: bool,

    #[serde(default)]
    pub filled: bool,

    pub fill_color: Option<Color>,

    #[serde(default)]
    pub stroked: bool,

    pub stroke_color: Option<Color>,

    #[serde(default)]
    pub stroke_width: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupItem {
    /// True when the group's first path clips its contents.
    #[serde(default)]
    pub clipped: bool,

    /// Child items, front-most first.
    #[serde(default)]
    pub items: Vec<PageItem>,
}

impl GroupItem {
    /// Whether any descendant of the group is a text frame.
    pub fn contains_text(&self) -> bool {
        self.items.iter().any(|item| match &item.kind {
            PageItemKind::Text(_) => true,
            PageItemKind::Group(g) => g.contains_text(),
            _ => false,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterItem {
    /// Reference to the source file for linked rasters, if known.
    pub href: Option<String>,
}
