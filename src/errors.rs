use thiserror::Error;

/// Errors that can occur at the crate boundary: loading a document
/// snapshot, driving the pipeline, or writing output.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error occurred while deserializing a document snapshot or settings.
    #[error("Failed to deserialize JSON: {0}")]
    JsonDeserialization(#[from] serde_json::Error),

    /// An I/O error, typically while reading a snapshot or writing output
    /// or captured image files.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// An error raised inside the HTML conversion pipeline.
    #[error(transparent)]
    Conversion(#[from] crate::converters::html::HtmlConversionError),

    /// Invalid input was provided to a crate function.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A type alias for `Result<T, PipelineError>` for convenience within the
/// crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
