//! Artboard grouping and responsiveness planning.
//!
//! Groups usable artboards into output units and computes, per artboard,
//! the container-width band over which it is the visible rendition. The
//! bands of one group partition `[0, ∞)` exactly: no gaps, no overlaps.

use crate::models::{Artboard, Document};
use crate::models::name;
use crate::report::Report;
use crate::settings::{DocSettings, OutputMode, Responsiveness};

/// One output unit: a named group of artboards sharing a single generated
/// file. Artboards are referenced by their index in the document.
#[derive(Debug, Clone)]
pub struct ArtboardGroup {
    pub name: String,
    pub artboards: Vec<usize>,
}

/// An inclusive pixel-width band. `max` is `f64::INFINITY` for the widest
/// artboard of a group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthRange {
    pub min: f64,
    pub max: f64,
}

impl WidthRange {
    pub fn is_unbounded(&self) -> bool {
        self.max.is_infinite()
    }

    pub fn is_fixed_point(&self) -> bool {
        self.min == self.max
    }
}

/// Iterates the document's usable artboards (names not starting with the
/// `-` suppression marker) with their indices.
pub fn usable_artboards(doc: &Document) -> impl Iterator<Item = (usize, &Artboard)> {
    doc.artboards
        .iter()
        .enumerate()
        .filter(|(_, ab)| ab.is_usable())
}

/// The document slug: raw name with spaces collapsed into dashes,
/// keyword-sanitized.
pub fn document_slug(doc: &Document) -> String {
    let collapsed = doc
        .raw_name()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    name::make_keyword(&collapsed)
}

/// `<slug>-<artboard name>`, the document-qualified artboard name.
pub fn document_artboard_name(doc: &Document, ab: &Artboard) -> String {
    format!("{}-{}", document_slug(doc), ab.clean_name())
}

/// The document-qualified artboard name, disambiguated with the rounded
/// width when duplicate artboard names were detected.
pub fn artboard_unique_name(doc: &Document, ab: &Artboard, settings: &DocSettings) -> String {
    let mut unique = document_artboard_name(doc, ab);
    if settings.grouped_artboards {
        unique.push_str(&format!("-{}", ab.rect.to_css_box().width.round() as i64));
    }
    unique
}

/// The id of the group's outer container element.
pub fn group_container_id(namespace: &str, group_name: &str) -> String {
    format!("{namespace}{group_name}-box")
}

/// Groups usable artboards into output units: a single shared group in
/// one-file mode, one group per document-qualified artboard name in
/// multiple-files mode.
pub fn group_artboards_for_output(doc: &Document, settings: &DocSettings) -> Vec<ArtboardGroup> {
    let mut groups: Vec<ArtboardGroup> = Vec::new();
    for (index, ab) in usable_artboards(doc) {
        let group_name = match settings.output {
            OutputMode::OneFile => document_slug(doc),
            OutputMode::MultipleFiles => document_artboard_name(doc, ab),
        };
        match groups.iter_mut().find(|g| g.name == group_name) {
            Some(group) => group.artboards.push(index),
            None => groups.push(ArtboardGroup {
                name: group_name,
                artboards: vec![index],
            }),
        }
    }
    groups
}

/// Warns about duplicate artboard names and flips the internal flag that
/// makes downstream image/container ids carry a width suffix.
pub fn validate_artboard_names(doc: &Document, settings: &mut DocSettings, report: &mut Report) {
    let mut names: Vec<String> = Vec::new();
    for (_, ab) in usable_artboards(doc) {
        let name = ab.clean_name();
        if names.contains(&name) {
            settings.grouped_artboards = true;
            match settings.output {
                OutputMode::OneFile => report.warn_once(
                    format!("Artboards should have unique names. \"{name}\" is duplicated."),
                    None,
                ),
                OutputMode::MultipleFiles => report.warn_once(
                    format!("Found a group of artboards named \"{name}\"."),
                    None,
                ),
            }
        }
        names.push(name);
    }
}

/// The artboard's resolved responsiveness: the document default, overridden
/// by a `dynamic` or `fixed` flag in the artboard name.
pub fn artboard_responsiveness(ab: &Artboard, settings: &DocSettings) -> Responsiveness {
    let opts = ab.settings();
    let mut r = settings.responsiveness;
    if opts.flag("dynamic") {
        r = Responsiveness::Dynamic;
    }
    if opts.flag("fixed") {
        r = Responsiveness::Fixed;
    }
    r
}

/// The container-width band over which this artboard is the visible one.
///
/// The narrowest artboard's band starts at 0; each band ends one pixel
/// below the next strictly wider artboard, and the widest band is
/// unbounded. When several artboards share one effective width the first
/// of them (in document order) owns the band and the later duplicates get
/// `None` (they are never shown), keeping the group's bands disjoint.
pub fn visibility_range(
    doc: &Document,
    group: &ArtboardGroup,
    ab_index: usize,
) -> Option<WidthRange> {
    let this_width = doc.artboards[ab_index].effective_width();
    let mut min_width = f64::INFINITY;
    let mut next_width: Option<f64> = None;
    let mut first_with_this_width: Option<usize> = None;

    for &index in &group.artboards {
        let w = doc.artboards[index].effective_width();
        if w > this_width && next_width.map_or(true, |n| w < n) {
            next_width = Some(w);
        }
        min_width = min_width.min(w);
        if w == this_width && first_with_this_width.is_none() {
            first_with_this_width = Some(index);
        }
    }

    // duplicate-width artboards after the first never become visible
    if first_with_this_width != Some(ab_index) {
        return None;
    }

    Some(WidthRange {
        min: if this_width == min_width { 0.0 } else { this_width },
        max: next_width.map_or(f64::INFINITY, |n| n - 1.0),
    })
}

/// The band of widths the artboard may be *sized* to. Fixed artboards
/// collapse to their own width (the narrowest keeps 0 as its lower bound
/// so small containers still get content); dynamic artboards size across
/// their whole visibility band.
pub fn width_range(
    doc: &Document,
    group: &ArtboardGroup,
    ab_index: usize,
    settings: &DocSettings,
) -> Option<WidthRange> {
    let visible = visibility_range(doc, group, ab_index)?;
    let ab = &doc.artboards[ab_index];
    match artboard_responsiveness(ab, settings) {
        Responsiveness::Fixed => {
            let w = ab.effective_width();
            Some(WidthRange {
                min: if visible.min == 0.0 { 0.0 } else { w },
                max: w,
            })
        }
        Responsiveness::Dynamic => Some(visible),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bounds, ColorSpace};

    fn doc_with_artboards(names_and_widths: &[(&str, f64)]) -> Document {
        Document {
            name: "Test Doc.ai".to_string(),
            path: Some("/tmp".to_string()),
            saved: true,
            color_space: ColorSpace::Rgb,
            active_layer_name: None,
            artboards: names_and_widths
                .iter()
                .map(|(name, w)| Artboard {
                    name: name.to_string(),
                    rect: Bounds::new(0.0, 0.0, *w, -400.0),
                })
                .collect(),
            layers: vec![],
        }
    }

    fn one_file_group(doc: &Document) -> ArtboardGroup {
        group_artboards_for_output(doc, &DocSettings::default())
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn two_artboards_split_at_the_larger_width() {
        let doc = doc_with_artboards(&[("Desktop", 800.0), ("Mobile", 400.0)]);
        let group = one_file_group(&doc);
        let desktop = visibility_range(&doc, &group, 0).unwrap();
        let mobile = visibility_range(&doc, &group, 1).unwrap();
        assert_eq!(mobile, WidthRange { min: 0.0, max: 799.0 });
        assert_eq!(desktop.min, 800.0);
        assert!(desktop.is_unbounded());
    }

    #[test]
    fn suppressed_artboards_do_not_join_groups() {
        let doc = doc_with_artboards(&[("Main", 600.0), ("-scratch", 300.0)]);
        let group = one_file_group(&doc);
        assert_eq!(group.artboards, vec![0]);
        let only = visibility_range(&doc, &group, 0).unwrap();
        assert_eq!(only.min, 0.0);
        assert!(only.is_unbounded());
    }

    #[test]
    fn ranges_partition_the_axis_for_any_width_set() {
        // table-driven property check, duplicate widths included
        let width_sets: Vec<Vec<f64>> = vec![
            vec![400.0],
            vec![400.0, 800.0],
            vec![800.0, 400.0, 600.0],
            vec![300.0, 300.0, 900.0],
            vec![500.0, 500.0],
            vec![120.0, 340.0, 340.0, 1000.0, 715.0],
            // a seeded pseudo-random batch
            {
                let mut widths = Vec::new();
                let mut seed: u64 = 0x2545F491;
                for _ in 0..12 {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    widths.push(((seed >> 33) % 1200 + 50) as f64);
                }
                widths
            },
        ];

        for widths in width_sets {
            let named: Vec<(String, f64)> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| (format!("AB{i}"), *w))
                .collect();
            let doc = doc_with_artboards(
                &named
                    .iter()
                    .map(|(n, w)| (n.as_str(), *w))
                    .collect::<Vec<_>>(),
            );
            let group = one_file_group(&doc);

            let mut ranges: Vec<WidthRange> = group
                .artboards
                .iter()
                .filter_map(|&i| visibility_range(&doc, &group, i))
                .collect();
            ranges.sort_by(|a, b| a.min.partial_cmp(&b.min).unwrap());

            assert_eq!(ranges.first().map(|r| r.min), Some(0.0), "widths: {widths:?}");
            assert!(ranges.last().unwrap().is_unbounded(), "widths: {widths:?}");
            for pair in ranges.windows(2) {
                // contiguous, no gap and no overlap
                assert_eq!(pair[0].max + 1.0, pair[1].min, "widths: {widths:?}");
            }
        }
    }

    #[test]
    fn fixed_responsiveness_collapses_the_sizing_range() {
        let doc = doc_with_artboards(&[("Small:fixed", 400.0), ("Large:fixed", 800.0)]);
        let group = one_file_group(&doc);
        let settings = DocSettings::default();
        let small = width_range(&doc, &group, 0, &settings).unwrap();
        let large = width_range(&doc, &group, 1, &settings).unwrap();
        // narrowest keeps 0 so undersized containers still get content
        assert_eq!(small, WidthRange { min: 0.0, max: 400.0 });
        assert_eq!(large, WidthRange { min: 800.0, max: 800.0 });
    }

    #[test]
    fn duplicate_names_warn_and_set_the_grouping_flag() {
        let doc = doc_with_artboards(&[("Panel", 400.0), ("Panel", 800.0)]);
        let mut settings = DocSettings::default();
        settings.output = OutputMode::MultipleFiles;
        let mut report = Report::new();
        validate_artboard_names(&doc, &mut settings, &mut report);
        assert!(settings.grouped_artboards);
        assert!(report.warnings().iter().any(|w| w.contains("Panel")));

        let unique = artboard_unique_name(&doc, &doc.artboards[0], &settings);
        assert!(unique.ends_with("-400"));
    }

    #[test]
    fn multiple_files_mode_groups_by_name() {
        let doc = doc_with_artboards(&[("Panel", 400.0), ("Panel", 800.0), ("Other", 500.0)]);
        let mut settings = DocSettings::default();
        settings.output = OutputMode::MultipleFiles;
        let groups = group_artboards_for_output(&doc, &settings);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].artboards, vec![0, 1]);
    }
}
