//! Converts vector-drawing documents (artboards of layered paths, text,
//! and clipping masks) into responsive HTML/CSS and companion script
//! stubs.
//!
//! The host application supplies a typed document snapshot and a
//! [`host::DocumentHost`] implementation; [`convert_document`] runs the
//! compilation pipeline and returns one markup artifact per artboard
//! group plus an end-of-run report.

pub mod converters;
pub mod errors;
pub mod host;
pub mod models;
pub mod report;
pub mod settings;

pub use converters::html::{convert_document, ConvertOptions, OutputFile, RunOutcome};
pub use errors::{PipelineError, Result};
pub use host::{DocumentHost, SnapshotHost};
pub use models::Document;
pub use report::Report;
pub use settings::{CustomBlocks, DocSettings};
