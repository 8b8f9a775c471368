use std::fs;
use std::path::Path;

use artboard_tools::converters::html::{convert_document, ConvertOptions};
use artboard_tools::converters::html::constants::SCRIPT_VERSION;
use artboard_tools::settings::DocSettings;
use artboard_tools::{Document, Report, SnapshotHost};

fn main() {
    // Reads RUST_LOG to configure logging levels; defaults to Info
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let mut args = std::env::args().skip(1);
    let doc_path = args.next().unwrap_or_else(|| "document.json".to_string());
    let settings_path = args.next();

    log::info!("Loading document snapshot from {doc_path}...");
    let json_string = fs::read_to_string(&doc_path).expect("Should have been able to read the file");
    let document: Document =
        serde_json::from_str(&json_string).expect("Failed to deserialize document JSON");
    log::info!(
        "Document loaded: {} artboards, {} root layers.",
        document.artboards.len(),
        document.layers.len()
    );

    let mut report = Report::new();
    let mut settings = match settings_path {
        Some(path) => {
            let settings_json =
                fs::read_to_string(&path).expect("Should have been able to read the settings file");
            let values = serde_json::from_str(&settings_json)
                .expect("Failed to deserialize settings JSON");
            DocSettings::from_values(&values, &mut report)
        }
        None => DocSettings::default(),
    };

    let html_output_path = settings.html_output_path.clone();
    let doc_dir = document.path.clone().unwrap_or_else(|| ".".to_string());

    let mut host = SnapshotHost::new(document);
    log::info!("Starting HTML conversion...");
    let outcome = convert_document(&mut host, &mut settings, &ConvertOptions::default());
    log::info!("Conversion finished with {} output file(s).", outcome.outputs.len());

    let out_dir = Path::new(&doc_dir).join(&html_output_path);
    fs::create_dir_all(&out_dir).expect("Unable to create the output folder");
    for output in &outcome.outputs {
        let path = out_dir.join(&output.file_name);
        fs::write(&path, &output.contents)
            .unwrap_or_else(|e| panic!("Unable to write {}: {e}", path.display()));
        log::info!("Wrote {}", path.display());
    }

    // warnings from settings parsing belong in the same summary
    for warning in report.warnings() {
        log::warn!("{warning}");
    }
    print!("{}", outcome.report.summary(SCRIPT_VERSION));
    if outcome.report.has_errors() {
        std::process::exit(1);
    }
}
