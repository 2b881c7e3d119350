//! Error types for the label date rewriter

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the label date rewriter
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Content could not be interpreted as a label document
    #[error("Cannot decode document: {0}")]
    Decode(String),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {0}")]
    EmptyPdf(String),

    /// Date parsing error
    #[error("Invalid date expression: {0}")]
    InvalidDateExpression(String),

    /// Best-by date falls outside the supported calendar
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    /// Malformed product configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Cannot parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A document store operation failed
    #[error("Store {op} failed for {id}: {reason}")]
    Store {
        op: &'static str,
        id: String,
        reason: String,
    },

    /// Entry or location not present in the document store
    #[error("Not found in store: {0}")]
    NotFound(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Shorthand for a [`Error::Store`] failure
    pub fn store(op: &'static str, id: impl Into<String>, reason: impl ToString) -> Self {
        Error::Store {
            op,
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must stop a run before any document is touched
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config(_) | Error::ConfigParse(_) | Error::DateOutOfRange(_))
    }
}
