//! Error types for djvu2pdf library.
//!
//! The tree walkers never return these: malformed nodes are logged and
//! skipped. Errors only surface at the boundaries (parsing source text,
//! talking to djvulibre, writing the PDF).

use std::io;
use thiserror::Error;

/// Result type alias for djvu2pdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during conversion.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as DjVu.
    #[error("Unknown file format: not a valid DjVu document")]
    UnknownFormat,

    /// S-expression text could not be parsed.
    #[error("S-expression syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset in the input where parsing failed
        offset: usize,
        /// What went wrong
        message: String,
    },

    /// The document source (djvulibre tools, background images) failed.
    #[error("Document source error: {0}")]
    Source(String),

    /// Error building or serializing the PDF.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The text backend refused to draw a run.
    #[error("Rendering error: {0}")]
    Render(String),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            offset,
            message: message.into(),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Pdf(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownFormat;
        assert_eq!(
            err.to_string(),
            "Unknown file format: not a valid DjVu document"
        );

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_syntax_error_display() {
        let err = Error::syntax(12, "unterminated string");
        assert_eq!(
            err.to_string(),
            "S-expression syntax error at byte 12: unterminated string"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
