//! Parse result and document-level metadata.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use super::{ElementKind, ImageMetadata, RawElement, TableGrid, TableMetadata};

/// Document-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path of the parsed file, or `<memory>` for in-memory input
    pub source: String,

    /// Total number of pages, independent of page selection
    pub page_count: u32,

    /// PDF version (e.g., "1.7")
    #[serde(default)]
    pub pdf_version: String,

    /// Document title
    #[serde(default)]
    pub title: Option<String>,

    /// Document author
    #[serde(default)]
    pub author: Option<String>,

    /// Document subject
    #[serde(default)]
    pub subject: Option<String>,

    /// Keywords
    #[serde(default)]
    pub keywords: Option<String>,

    /// Creator application
    #[serde(default)]
    pub creator: Option<String>,

    /// PDF producer
    #[serde(default)]
    pub producer: Option<String>,

    /// Creation date
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,

    /// Whether the document declares encryption
    #[serde(default)]
    pub encrypted: bool,
}

impl DocumentMetadata {
    /// Create metadata for a source with a known page count.
    pub fn new(source: impl Into<String>, page_count: u32) -> Self {
        Self {
            source: source.into(),
            page_count,
            ..Default::default()
        }
    }
}

/// Element counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ElementCounts {
    pub text: usize,
    pub tables: usize,
    pub images: usize,
}

impl ElementCounts {
    /// Total number of elements.
    pub fn total(&self) -> usize {
        self.text + self.tables + self.images
    }
}

/// Output of parsing one document.
///
/// Elements are ordered by page; within a page text blocks come first, then
/// image references, then tables. When images were written to a temporary
/// directory the result owns it and the files live as long as the result
/// (or any clone of it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseResult {
    pub raw_elements: Vec<RawElement>,
    pub metadata: DocumentMetadata,
    #[serde(skip)]
    image_dir: Option<Arc<TempDir>>,
}

impl PartialEq for ParseResult {
    fn eq(&self, other: &Self) -> bool {
        self.raw_elements == other.raw_elements && self.metadata == other.metadata
    }
}

impl ParseResult {
    /// Create an empty result.
    pub fn new(metadata: DocumentMetadata) -> Self {
        Self {
            raw_elements: Vec::new(),
            metadata,
            image_dir: None,
        }
    }

    pub(crate) fn set_image_dir(&mut self, dir: Option<Arc<TempDir>>) {
        self.image_dir = dir;
    }

    /// Append an element.
    pub fn push(&mut self, element: RawElement) {
        self.raw_elements.push(element);
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.raw_elements.len()
    }

    /// Check whether no element was found.
    pub fn is_empty(&self) -> bool {
        self.raw_elements.is_empty()
    }

    /// Total number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.metadata.page_count
    }

    /// Temporary directory holding materialized images, if any.
    pub fn image_dir(&self) -> Option<&Path> {
        self.image_dir.as_deref().map(TempDir::path)
    }

    /// Elements found on a page (1-indexed).
    pub fn elements_on_page(&self, page_number: u32) -> impl Iterator<Item = &RawElement> {
        self.raw_elements
            .iter()
            .filter(move |e| e.page_number() == page_number)
    }

    /// Text block contents in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.raw_elements.iter().filter_map(RawElement::as_text)
    }

    /// Tables in order.
    pub fn tables(&self) -> impl Iterator<Item = (&TableGrid, &TableMetadata)> {
        self.raw_elements.iter().filter_map(RawElement::as_table)
    }

    /// Image references in order.
    pub fn images(&self) -> impl Iterator<Item = (&str, &ImageMetadata)> {
        self.raw_elements.iter().filter_map(RawElement::as_image)
    }

    /// Count elements by kind.
    pub fn counts(&self) -> ElementCounts {
        let mut counts = ElementCounts::default();
        for element in &self.raw_elements {
            match element.kind() {
                ElementKind::Text => counts.text += 1,
                ElementKind::Table => counts.tables += 1,
                ElementKind::ImageRef => counts.images += 1,
            }
        }
        counts
    }

    /// All text joined with blank lines, in element order.
    pub fn plain_text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n\n")
    }
}
