use std::fs;

use artboard_tools::converters::html::planner;
use artboard_tools::settings::DocSettings;
use artboard_tools::Document;

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let doc_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "document.json".to_string());
    let json_string = fs::read_to_string(&doc_path).expect("Should have been able to read the file");
    let document: Document =
        serde_json::from_str(&json_string).expect("Failed to deserialize document JSON");

    let settings = DocSettings::default();
    let groups = planner::group_artboards_for_output(&document, &settings);
    println!("{} ({} groups)", document.raw_name(), groups.len());
    for group in &groups {
        println!("  group {}", group.name);
        for &ab_index in &group.artboards {
            let ab = &document.artboards[ab_index];
            let range = planner::visibility_range(&document, group, ab_index);
            match range {
                Some(range) if range.is_unbounded() => {
                    println!("    {} (w={}) visible from {}px up", ab.clean_name(), ab.effective_width(), range.min)
                }
                Some(range) => println!(
                    "    {} (w={}) visible {}..{}px",
                    ab.clean_name(),
                    ab.effective_width(),
                    range.min,
                    range.max
                ),
                None => println!("    {} (duplicate width, never shown)", ab.clean_name()),
            }
        }
    }
}
