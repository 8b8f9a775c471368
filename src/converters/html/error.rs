use thiserror::Error;

/// Errors that can occur during the document-to-HTML conversion process.
#[derive(Error, Debug)]
pub enum HtmlConversionError {
    /// A fatal precondition failure (unsaved document, wrong color mode,
    /// no usable artboards, ...). The message is user-facing and is shown
    /// verbatim in the end-of-run report.
    #[error("{0}")]
    UserError(String),

    #[error("Formatting error during HTML generation: {0}")]
    FormatError(#[from] std::fmt::Error),

    #[error("I/O error while post-processing an exported file: {0}")]
    IoError(#[from] std::io::Error),

    /// An error reported by the document host.
    #[error("Host error: {0}")]
    Host(#[from] crate::host::HostError),

    #[error("An internal error occurred during conversion: {0}")]
    Internal(String),
}

/// A specialized Result type for HTML conversion operations.
pub type Result<T> = std::result::Result<T, HtmlConversionError>;

/// Raises a fatal precondition failure.
pub(crate) fn user_error<T>(msg: impl Into<String>) -> Result<T> {
    Err(HtmlConversionError::UserError(msg.into()))
}

/// Formats an error for the end-of-run report: user errors appear verbatim,
/// anything else is surfaced as a runtime error with its message.
pub(crate) fn format_error(err: &HtmlConversionError) -> String {
    match err {
        HtmlConversionError::UserError(msg) => msg.clone(),
        other => format!("RuntimeError: {other}"),
    }
}
