//! # pdfparts
//!
//! Extract typed raw elements from PDF documents.
//!
//! A parse turns a PDF into an ordered list of [`RawElement`]s (text blocks,
//! tables and image references) with page numbers and bounding boxes, plus
//! document-level metadata. It is the document-parsing step of a retrieval
//! pipeline; everything downstream consumes the [`ParseResult`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfparts::{parse_document, RawElement};
//!
//! fn main() -> pdfparts::Result<()> {
//!     let result = parse_document("document.pdf")?;
//!     println!("{} pages", result.metadata.page_count);
//!
//!     for element in &result.raw_elements {
//!         match element {
//!             RawElement::Text { content, .. } => println!("{}", content),
//!             RawElement::Table { content, .. } => {
//!                 println!("table {}x{}", content.row_count(), content.column_count())
//!             }
//!             RawElement::ImageRef { content, .. } => println!("image {}", content),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Element order
//!
//! Elements are grouped by page in ascending order. Within a page, text
//! blocks come first (top to bottom, column by column), then image
//! references in resource order, then tables top to bottom. This is not a
//! guaranteed visual reading order.

pub mod batch;
pub mod detect;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use batch::{parse_documents, parse_documents_with_progress, BatchEvent, BatchItem};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use error::{Error, ErrorKind, Result};
pub use export::{save_json, to_json, JsonFormat};
pub use model::{
    BoundingBox, DocumentMetadata, ElementCounts, ElementKind, ImageFormat, ImageMetadata,
    ParseResult, RawElement, TableGrid, TableMetadata, TextMetadata,
};
pub use parser::{
    DocumentParser, ErrorMode, ExtractSet, ImageOutput, PageSelection, ParseOptions,
    TableDetectorConfig,
};

use std::path::Path;

/// Parse a PDF file into raw elements.
///
/// # Errors
///
/// * [`ErrorKind::Access`] when the path cannot be opened or read
/// * [`ErrorKind::CorruptDocument`] when the file is not a PDF
/// * [`ErrorKind::Extraction`] for failures while reading its content
///
/// # Example
///
/// ```no_run
/// use pdfparts::parse_document;
///
/// let result = parse_document("document.pdf").unwrap();
/// println!("Pages: {}", result.page_count());
/// ```
pub fn parse_document<P: AsRef<Path>>(path: P) -> Result<ParseResult> {
    parse_document_with_options(path, ParseOptions::default())
}

/// Parse a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use pdfparts::{parse_document_with_options, PageSelection, ParseOptions};
///
/// let options = ParseOptions::new()
///     .lenient()
///     .with_pages(PageSelection::Range(1..=3))
///     .with_temp_images();
/// let result = parse_document_with_options("document.pdf", options).unwrap();
/// for (name, meta) in result.images() {
///     println!("{} -> {:?}", name, meta.temp_image_path);
/// }
/// ```
pub fn parse_document_with_options<P: AsRef<Path>>(
    path: P,
    options: ParseOptions,
) -> Result<ParseResult> {
    let parser = DocumentParser::open_with_options(path, options)?;
    parser.parse()
}

/// Parse a PDF from bytes.
///
/// # Example
///
/// ```no_run
/// use pdfparts::parse_bytes;
///
/// let data = std::fs::read("document.pdf").unwrap();
/// let result = parse_bytes(&data).unwrap();
/// ```
pub fn parse_bytes(data: &[u8]) -> Result<ParseResult> {
    parse_bytes_with_options(data, ParseOptions::default())
}

/// Parse a PDF from bytes with custom options.
pub fn parse_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<ParseResult> {
    let parser = DocumentParser::from_bytes_with_options(data, options)?;
    parser.parse()
}

/// Extract the text blocks of a PDF file, separated by blank lines.
///
/// ```no_run
/// let text = pdfparts::extract_text("document.pdf").unwrap();
/// println!("{}", text);
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let result = parse_document_with_options(path, ParseOptions::new().text_only())?;
    Ok(result.plain_text())
}
