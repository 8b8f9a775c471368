//! Converters from the document snapshot to output formats.

pub mod html;
