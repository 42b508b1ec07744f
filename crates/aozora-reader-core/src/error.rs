//! Error types for the reader core.

use miette::Diagnostic;
use thiserror::Error;

use crate::line_model::ContainerKind;

/// Main error type for reader operations.
///
/// None of these are fatal to a session: each one degrades a single feature
/// (a container that won't render, an import that is refused) and leaves the
/// rest of the reader usable.
#[derive(Debug, Error, Diagnostic)]
pub enum ReaderError {
    /// Original and translated blocks disagree on line count.
    #[error("{container} has {original} original lines but {translated} translated lines")]
    #[diagnostic(
        code(aozora::line_model::line_count_mismatch),
        help("both preformatted blocks of a container must have the same number of lines")
    )]
    LineCountMismatch {
        container: ContainerKind,
        original: usize,
        translated: usize,
    },

    /// Imported edit data was not a JSON object of row -> text.
    #[error("edit data is not a valid file: {0}")]
    #[diagnostic(code(aozora::overlay::malformed_import))]
    MalformedImport(#[source] serde_json::Error),

    /// A row number that has no rendered element.
    #[error("row {0} has no rendered element")]
    #[diagnostic(code(aozora::render::no_such_row))]
    NoSuchRow(u32),

    /// An element the page shell expects is missing.
    #[error("expected element not found: {0}")]
    #[diagnostic(code(aozora::document::missing_element))]
    MissingElement(String),

    /// The header fragment could not be loaded.
    #[error("failed to load header fragment {path}: {reason}")]
    #[diagnostic(code(aozora::page::fragment_load))]
    FragmentLoad { path: String, reason: String },

    /// The key-value store refused a read or write.
    #[error("storage error: {0}")]
    #[diagnostic(code(aozora::persist::storage))]
    Storage(String),

    /// Serialization error.
    #[error(transparent)]
    #[diagnostic(code(aozora::json))]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error(transparent)]
    #[diagnostic(code(aozora::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ReaderError> = std::result::Result<T, E>;
