//! Error types for pdfparts.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pdfparts operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting raw elements.
#[derive(Error, Debug)]
pub enum Error {
    /// The input path is missing or could not be read.
    #[error("Cannot access {}: {source}", .path.display())]
    Access {
        /// Path that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The bytes could not be opened as a PDF document.
    #[error("Corrupt or non-PDF document: {0}")]
    CorruptDocument(String),

    /// The PDF header names a version we do not understand.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The document is encrypted and cannot be decrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Content could not be extracted from an otherwise valid document.
    #[error("Extraction error{}: {message}", .page.map(|p| format!(" on page {p}")).unwrap_or_default())]
    Extraction {
        /// Page being processed, if known
        page: Option<u32>,
        /// Description of the failure
        message: String,
    },

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// I/O error while writing output (images, JSON).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization failed.
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Coarse classification of an [`Error`].
///
/// Callers use this to separate "could not access the file" from "could not
/// parse its content", e.g. retry on access errors and skip corrupt files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The path was missing or unreadable.
    Access,
    /// The file is not a PDF the backend can open.
    CorruptDocument,
    /// Any other failure surfaced while extracting content.
    Extraction,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Access => "access error",
            ErrorKind::CorruptDocument => "corrupt document",
            ErrorKind::Extraction => "extraction error",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Build an extraction error for a page.
    pub fn extraction(page: u32, message: impl Into<String>) -> Self {
        Error::Extraction {
            page: Some(page),
            message: message.into(),
        }
    }

    /// Description of the failure without the kind prefix.
    pub fn detail(&self) -> String {
        match self {
            Error::CorruptDocument(message) | Error::Serialize(message) => message.clone(),
            Error::Extraction { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Build an access error for a path.
    pub fn access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Access {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Access { .. } => ErrorKind::Access,
            Error::CorruptDocument(_) | Error::UnsupportedVersion(_) => ErrorKind::CorruptDocument,
            Error::Encrypted
            | Error::Extraction { .. }
            | Error::PageOutOfRange(..)
            | Error::InvalidPageRange(_)
            | Error::Io(_)
            | Error::Serialize(_) => ErrorKind::Extraction,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::CorruptDocument(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialize(err.to_string())
    }
}
