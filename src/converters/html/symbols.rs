//! Recognition of simple vector shapes and their promotion to native
//! HTML/CSS primitives.
//!
//! Rectangles, circles, and orthogonal line segments among the path items
//! of a tagged layer render as absolutely positioned divs instead of being
//! rasterized. Anything that fails the heuristics is skipped here and falls
//! through to image capture.

use super::utils::{convert_color, fmt_number, format_css_pct, round_to};
use crate::models::{
    BlendMode, Bounds, CssBox, Layer, PageItem, PageItemKind, PathItem, PathPoint, PointType,
};
use crate::models::name::make_keyword;
use crate::settings::DocSettings;

use super::visibility::DocIndex;

/// A matched primitive, centered in native coordinates until
/// [`export_symbols`] rebases it onto the artboard.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolGeometry {
    Rectangle {
        center: [f64; 2],
        width: f64,
        height: f64,
    },
    Circle {
        center: [f64; 2],
        radius: f64,
    },
    Line {
        center: [f64; 2],
        width: f64,
        height: f64,
    },
}

fn path_bbox(points: &[PathPoint]) -> Bounds {
    let mut left = f64::INFINITY;
    let mut bottom = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    let mut top = f64::NEG_INFINITY;
    for p in points {
        left = left.min(p.anchor[0]);
        right = right.max(p.anchor[0]);
        bottom = bottom.min(p.anchor[1]);
        top = top.max(p.anchor[1]);
    }
    Bounds::new(left, top, right, bottom)
}

fn bbox_center(bbox: &Bounds) -> [f64; 2] {
    [
        (bbox.left + bbox.right) / 2.0,
        (bbox.top + bbox.bottom) / 2.0,
    ]
}

/// Rectangle heuristic: 4 points (closed) or 5 points (open), every point
/// a hard corner sitting on the bounding box edge along at least one axis.
pub fn rectangle_data(points: &[PathPoint]) -> Option<SymbolGeometry> {
    if points.len() < 4 || points.len() > 5 {
        return None;
    }
    let bbox = path_bbox(points);
    for p in &points[..4] {
        if !p.is_corner() {
            return None;
        }
        let [x, y] = p.anchor;
        let on_edge = x == bbox.left || x == bbox.right || y == bbox.top || y == bbox.bottom;
        if !on_edge {
            return None;
        }
    }
    Some(SymbolGeometry::Rectangle {
        center: bbox_center(&bbox),
        width: bbox.width(),
        height: bbox.height(),
    })
}

/// Circle heuristic: exactly 4 smooth points, each sitting on exactly one
/// bounding box edge (the cardinal points of an ellipse). Ellipses are
/// coerced to circles by averaging the two half-extents.
pub fn circle_data(points: &[PathPoint]) -> Option<SymbolGeometry> {
    if points.len() != 4 {
        return None;
    }
    let bbox = path_bbox(points);
    for p in points {
        if p.point_type != PointType::Smooth {
            return None;
        }
        let [x, y] = p.anchor;
        let mut edges = 0;
        if x == bbox.left || x == bbox.right {
            edges += 1;
        }
        if y == bbox.top || y == bbox.bottom {
            edges += 1;
        }
        if edges != 1 {
            return None;
        }
    }
    Some(SymbolGeometry::Circle {
        center: bbox_center(&bbox),
        radius: (bbox.width() + bbox.height()) / 4.0,
    })
}

/// Line heuristic: every point a hard corner, each consecutive pair either
/// a double vertex (skipped) or a segment with near-zero extent on one
/// axis. A pair extending more than one unit on both axes is a diagonal
/// and rejects the whole path.
pub fn line_geometry(points: &[PathPoint]) -> Option<Vec<SymbolGeometry>> {
    let mut lines = Vec::new();
    for (i, p) in points.iter().enumerate() {
        if !p.is_corner() {
            return None;
        }
        if i == 0 {
            continue;
        }
        let bbox = path_bbox(&points[i - 1..=i]);
        let w = bbox.width();
        let h = bbox.height();
        if w < 1.0 && h < 1.0 {
            continue;
        }
        if w > 1.0 && h > 1.0 {
            return None;
        }
        lines.push(SymbolGeometry::Line {
            center: bbox_center(&bbox),
            width: w,
            height: h,
        });
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}

/// Paint and effect attributes shared by all geometries of one path item.
#[derive(Debug, Clone, Default)]
pub struct SymbolStyle {
    pub opacity: f64,
    pub multiply: bool,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
}

pub fn basic_symbol_style(item: &PageItem, path: &PathItem, index: &DocIndex) -> SymbolStyle {
    let entry = index.item(&item.id);
    let opacity = entry.map(|e| e.opacity).unwrap_or(item.opacity);
    let blend = entry.map(|e| e.blend).unwrap_or(item.blending_mode);
    let mut style = SymbolStyle {
        opacity: round_to(opacity / 100.0, 2),
        multiply: blend == BlendMode::Multiply,
        ..SymbolStyle::default()
    };
    if path.filled {
        style.fill = Some(convert_color(path.fill_color.as_ref(), None).css);
    }
    if path.stroked {
        style.stroke = Some(convert_color(path.stroke_color.as_ref(), None).css);
        // borders thinner than 1px flicker or vanish while resizing
        style.stroke_width = if path.stroke_width < 1.0 {
            1.0
        } else {
            path.stroke_width.round()
        };
    }
    style
}

/// Options controlling symbol emission for one tagged layer.
pub struct SymbolOptions {
    /// Percentage-based geometry (div/snippet layers) versus fixed pixels
    /// (symbol layers).
    pub scaled: bool,
    /// The tag word used in ids and the layer-wrapper class.
    pub tag_prefix: &'static str,
    /// The tag's base name (`map:div` -> `map`), or the snippet prop.
    pub id_name: String,
    /// Inner markup placed inside each emitted div (snippet placeholder).
    pub inner_block: String,
}

/// Inline CSS for one matched geometry.
fn basic_symbol_css(
    geom: &SymbolGeometry,
    style: &SymbolStyle,
    ab_box: &CssBox,
    opts: &SymbolOptions,
) -> String {
    let mut styles: Vec<String> = Vec::new();
    // fixed-size symbols round to integers so pixel snapping cannot turn
    // squares and circles into rectangles and ovals
    let mut precision: u32 = if opts.scaled { 1 } else { 0 };
    let mut center;
    let (mut width, mut height);

    match geom {
        SymbolGeometry::Line {
            center: c,
            width: w,
            height: h,
        } => {
            precision = 2;
            center = *c;
            width = *w;
            height = *h;
            if width > height {
                // minimizes gaps between consecutive horizontal segments
                width += style.stroke_width * 0.5;
                center[0] += style.stroke_width * 0.333;
            }
        }
        SymbolGeometry::Rectangle {
            center: c,
            width: w,
            height: h,
        } => {
            center = *c;
            width = *w;
            height = *h;
        }
        SymbolGeometry::Circle { center: c, radius } => {
            center = *c;
            width = radius * 2.0;
            height = width;
            styles.push("border-radius: 50%".to_string());
        }
    }

    width = round_to(width, precision);
    height = round_to(height, precision);

    if opts.scaled {
        styles.push(format!("width: {}", format_css_pct(width, ab_box.width)));
        styles.push(format!("height: {}", format_css_pct(height, ab_box.height)));
        styles.push(format!(
            "margin-left: {}",
            format_css_pct(-width / 2.0, ab_box.width)
        ));
        // vertical margin percentage is relative to the width
        styles.push(format!(
            "margin-top: {}",
            format_css_pct(-height / 2.0, ab_box.width)
        ));
    } else {
        styles.push(format!("width: {}px", fmt_number(width)));
        styles.push(format!("height: {}px", fmt_number(height)));
        styles.push(format!("margin-top: {}px", fmt_number(-height / 2.0)));
        styles.push(format!("margin-left: {}px", fmt_number(-width / 2.0)));
    }

    if let Some(stroke) = &style.stroke {
        let border = match geom {
            SymbolGeometry::Line { .. } if width > height => "border-top",
            SymbolGeometry::Line { .. } => "border-right",
            _ => "border",
        };
        styles.push(format!(
            "{}: {}px solid {}",
            border,
            fmt_number(style.stroke_width),
            stroke
        ));
    }
    if let Some(fill) = &style.fill {
        styles.push(format!("background-color: {fill}"));
    }
    if style.opacity > 0.0 && style.opacity < 1.0 {
        styles.push(format!("opacity: {}", fmt_number(style.opacity)));
    }
    if style.multiply {
        styles.push("mix-blend-mode: multiply".to_string());
    }
    styles.push(format!("left: {}", format_css_pct(center[0], ab_box.width)));
    styles.push(format!("top: {}", format_css_pct(center[1], ab_box.height)));
    format!("style=\"{};\"", styles.join("; "))
}

pub fn symbol_class(namespace: &str) -> String {
    format!("{namespace}symbol")
}

fn symbol_div_id(item: &PageItem, opts: &SymbolOptions, namespace: &str) -> String {
    match opts.tag_prefix {
        "snippet" => format!("id=\"{}snippet-{}\" ", namespace, opts.id_name),
        "div" | "symbol" => match &item.name {
            Some(name) if !name.is_empty() => format!(
                "id=\"{}{}-{}-{}\" ",
                namespace,
                opts.tag_prefix,
                opts.id_name,
                make_keyword(name)
            ),
            _ => String::new(),
        },
        _ => String::new(),
    }
}

fn export_symbol_as_html(
    item: &PageItem,
    path: &PathItem,
    geometries: &[SymbolGeometry],
    ab_box: &CssBox,
    index: &DocIndex,
    opts: &SymbolOptions,
    settings: &DocSettings,
) -> String {
    let namespace = &settings.namespace;
    let style = basic_symbol_style(item, path, index);
    let mut symbol_class = symbol_class(namespace);
    let mut properties = match &item.name {
        Some(name) if !name.is_empty() => format!("data-name=\"{}\" ", make_keyword(name)),
        _ => String::new(),
    };
    if opts.tag_prefix == "snippet" {
        symbol_class.push_str(&format!(" {namespace}snippet"));
        properties = format!("data-name=\"{}\" ", opts.id_name);
    }
    let div_id = symbol_div_id(item, opts, namespace);

    let mut html = String::new();
    for geom in geometries {
        // rebase the center onto the artboard's top-left
        let rebased = match geom {
            SymbolGeometry::Rectangle {
                center,
                width,
                height,
            } => SymbolGeometry::Rectangle {
                center: [center[0] - ab_box.left, -center[1] - ab_box.top],
                width: *width,
                height: *height,
            },
            SymbolGeometry::Circle { center, radius } => SymbolGeometry::Circle {
                center: [center[0] - ab_box.left, -center[1] - ab_box.top],
                radius: *radius,
            },
            SymbolGeometry::Line {
                center,
                width,
                height,
            } => SymbolGeometry::Line {
                center: [center[0] - ab_box.left, -center[1] - ab_box.top],
                width: *width,
                height: *height,
            },
        };
        html.push_str(&format!(
            "\n\t\t\t<div class=\"{}\" {}{}{}>\n{}\n</div>",
            symbol_class,
            div_id,
            properties,
            basic_symbol_css(&rebased, &style, ab_box, opts),
            opts.inner_block
        ));
    }
    html
}

/// What one tagged layer's symbol pass produced: the wrapped HTML and the
/// ids of the converted items (to be hidden during the raster captures and
/// restored afterwards).
pub struct SymbolExport {
    pub html: String,
    pub item_ids: Vec<String>,
}

/// Converts the classifiable path items of a tagged layer into HTML.
/// Items that match no heuristic are left for image capture.
pub fn export_symbols(
    layer: &Layer,
    ab_rect: &Bounds,
    index: &DocIndex,
    opts: &SymbolOptions,
    settings: &DocSettings,
) -> SymbolExport {
    let ab_box = ab_rect.to_css_box();
    let mut html = String::new();
    let mut item_ids = Vec::new();

    fn walk_items(
        items: &[PageItem],
        ab_rect: &Bounds,
        ab_box: &CssBox,
        index: &DocIndex,
        opts: &SymbolOptions,
        settings: &DocSettings,
        html: &mut String,
        item_ids: &mut Vec<String>,
    ) {
        for item in items {
            if item.hidden {
                continue;
            }
            if let PageItemKind::Group(group) = &item.kind {
                walk_items(
                    &group.items,
                    ab_rect,
                    ab_box,
                    index,
                    opts,
                    settings,
                    html,
                    item_ids,
                );
                continue;
            }
            let path = match item.as_path() {
                Some(path) => path,
                None => continue,
            };
            if path.guides || !item.visible_bounds().intersects(ab_rect) {
                continue;
            }
            // note: filled shapes are not necessarily closed
            let geometries = match rectangle_data(&path.points).or_else(|| circle_data(&path.points))
            {
                Some(single) => vec![single],
                None => {
                    if opts.scaled && path.stroked && !path.closed {
                        match line_geometry(&path.points) {
                            Some(lines) => lines,
                            None => continue,
                        }
                    } else {
                        continue;
                    }
                }
            };
            html.push_str(&export_symbol_as_html(
                item, path, &geometries, ab_box, index, opts, settings,
            ));
            item_ids.push(item.id.clone());
        }
    }

    fn walk_layer(
        layer: &Layer,
        ab_rect: &Bounds,
        ab_box: &CssBox,
        index: &DocIndex,
        opts: &SymbolOptions,
        settings: &DocSettings,
        html: &mut String,
        item_ids: &mut Vec<String>,
    ) {
        if !layer.visible {
            return;
        }
        walk_items(
            &layer.items,
            ab_rect,
            ab_box,
            index,
            opts,
            settings,
            html,
            item_ids,
        );
        for sub in &layer.layers {
            walk_layer(sub, ab_rect, ab_box, index, opts, settings, html, item_ids);
        }
    }

    walk_layer(
        layer,
        ab_rect,
        &ab_box,
        index,
        opts,
        settings,
        &mut html,
        &mut item_ids,
    );

    if !html.is_empty() {
        html = format!(
            "\t\t<div class=\"{}{}-layer {}{}\">{}\n\t\t</div>\n",
            settings.namespace,
            opts.tag_prefix,
            settings.namespace,
            layer.clean_name(),
            html
        );
    }

    SymbolExport { html, item_ids }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner(x: f64, y: f64) -> PathPoint {
        PathPoint {
            anchor: [x, y],
            left_direction: [x, y],
            right_direction: [x, y],
            point_type: PointType::Corner,
        }
    }

    fn smooth(x: f64, y: f64, dx: f64, dy: f64) -> PathPoint {
        PathPoint {
            anchor: [x, y],
            left_direction: [x - dx, y - dy],
            right_direction: [x + dx, y + dy],
            point_type: PointType::Smooth,
        }
    }

    #[test]
    fn four_corner_points_on_the_bbox_classify_as_rectangle() {
        let points = vec![
            corner(0.0, 0.0),
            corner(40.0, 0.0),
            corner(40.0, -30.0),
            corner(0.0, -30.0),
        ];
        match rectangle_data(&points) {
            Some(SymbolGeometry::Rectangle {
                center,
                width,
                height,
            }) => {
                assert_eq!(center, [20.0, -15.0]);
                assert_eq!(width, 40.0);
                assert_eq!(height, 30.0);
            }
            other => panic!("expected a rectangle, got {other:?}"),
        }
    }

    #[test]
    fn a_perturbed_point_defeats_both_shape_tests() {
        // one vertex smoothed and pulled strictly inside the bbox
        let points = vec![
            corner(0.0, 0.0),
            corner(40.0, 0.0),
            smooth(25.0, -12.0, 3.0, 0.0),
            corner(0.0, -30.0),
        ];
        assert!(rectangle_data(&points).is_none());
        assert!(circle_data(&points).is_none());
    }

    #[test]
    fn cardinal_smooth_points_classify_as_circle() {
        // an ellipse: 4 smooth points at the cardinal positions
        let points = vec![
            smooth(20.0, 0.0, 11.0, 0.0),   // top
            smooth(40.0, -12.0, 0.0, -6.6), // right
            smooth(20.0, -24.0, -11.0, 0.0), // bottom
            smooth(0.0, -12.0, 0.0, 6.6),   // left
        ];
        match circle_data(&points) {
            Some(SymbolGeometry::Circle { center, radius }) => {
                assert_eq!(center, [20.0, -12.0]);
                // ellipse coerced to a circle: mean of half-extents
                assert_eq!(radius, (40.0 + 24.0) / 4.0);
            }
            other => panic!("expected a circle, got {other:?}"),
        }
    }

    #[test]
    fn orthogonal_polyline_yields_segments_but_diagonals_reject() {
        let stair = vec![corner(0.0, 0.0), corner(30.0, 0.0), corner(30.0, -20.0)];
        let lines = line_geometry(&stair).expect("orthogonal polyline");
        assert_eq!(lines.len(), 2);

        let diagonal = vec![corner(0.0, 0.0), corner(30.0, -20.0)];
        assert!(line_geometry(&diagonal).is_none());
    }

    #[test]
    fn double_vertices_are_skipped() {
        let points = vec![
            corner(0.0, 0.0),
            corner(0.3, 0.2),
            corner(30.0, 0.2),
        ];
        let lines = line_geometry(&points).expect("one segment");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn stroke_width_is_floored_to_one_pixel() {
        let geom = SymbolGeometry::Rectangle {
            center: [10.0, 10.0],
            width: 20.0,
            height: 10.0,
        };
        let style = SymbolStyle {
            opacity: 1.0,
            multiply: false,
            fill: None,
            stroke: Some("rgb(0,0,0)".to_string()),
            stroke_width: 1.0,
        };
        let ab_box = CssBox {
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 100.0,
        };
        let opts = SymbolOptions {
            scaled: false,
            tag_prefix: "symbol",
            id_name: "demo".to_string(),
            inner_block: String::new(),
        };
        let css = basic_symbol_css(&geom, &style, &ab_box, &opts);
        assert!(css.contains("border: 1px solid rgb(0,0,0)"));
        assert!(css.contains("width: 20px"));
    }
}
