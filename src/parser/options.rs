//! Parsing options and configuration.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use super::table_detector::TableDetectorConfig;
use crate::error::{Error, Result};

/// Options for parsing PDF documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Which element kinds to extract
    pub extract: ExtractSet,

    /// Page selection (which pages to parse)
    pub pages: PageSelection,

    /// Where image bytes are written, if anywhere
    pub image_output: ImageOutput,

    /// Table detection tuning
    pub table_detection: TableDetectorConfig,

    /// Apply Unicode NFC normalization to extracted text
    pub normalize_unicode: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip pages whose content cannot be read).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set which element kinds are extracted.
    pub fn with_extract(mut self, extract: ExtractSet) -> Self {
        self.extract = extract;
        self
    }

    /// Extract text blocks only.
    pub fn text_only(mut self) -> Self {
        self.extract = ExtractSet::text_only();
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set where images are written.
    pub fn with_image_output(mut self, output: ImageOutput) -> Self {
        self.image_output = output;
        self
    }

    /// Write images into a temporary directory owned by the result.
    pub fn with_temp_images(self) -> Self {
        self.with_image_output(ImageOutput::TempDir)
    }

    /// Write images into a directory, creating it if needed.
    pub fn with_image_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_image_output(ImageOutput::Directory(dir.into()))
    }

    /// Set table detection configuration.
    pub fn with_table_detection(mut self, config: TableDetectorConfig) -> Self {
        self.table_detection = config;
        self
    }

    /// Enable or disable NFC normalization.
    pub fn with_unicode_normalization(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            extract: ExtractSet::default(),
            pages: PageSelection::All,
            image_output: ImageOutput::None,
            table_detection: TableDetectorConfig::default(),
            normalize_unicode: true,
        }
    }
}

/// Error handling mode during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on the first page that cannot be read
    #[default]
    Strict,
    /// Log a warning, skip the page's content and continue
    Lenient,
}

impl ErrorMode {
    /// Apply the mode to a failure inside a page.
    ///
    /// Strict mode returns the error. Lenient mode logs it and yields `None`
    /// so the caller skips the affected content.
    pub fn recover<T>(self, result: Result<T>, context: impl FnOnce() -> String) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self == ErrorMode::Lenient => {
                log::warn!("{}: {}", context(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Which element kinds to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSet {
    pub text: bool,
    pub tables: bool,
    pub images: bool,
}

impl ExtractSet {
    /// Extract every element kind.
    pub fn all() -> Self {
        Self {
            text: true,
            tables: true,
            images: true,
        }
    }

    /// Extract text blocks only.
    pub fn text_only() -> Self {
        Self {
            text: true,
            tables: false,
            images: false,
        }
    }

    /// Whether page content streams need to be interpreted.
    pub(crate) fn needs_content(&self) -> bool {
        self.text || self.tables || self.images
    }
}

impl Default for ExtractSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Where image bytes go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageOutput {
    /// Record image references only; `temp_image_path` stays `None`
    #[default]
    None,
    /// Write into a fresh temporary directory owned by the result
    TempDir,
    /// Write into the given directory
    Directory(PathBuf),
}

/// Page selection for parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Parse all pages
    #[default]
    All,
    /// Parse a range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Parse specific pages (1-indexed)
    Pages(Vec<u32>),
    /// Specific pages plus ranges, as written in `"1,4-6"`
    List {
        pages: Vec<u32>,
        ranges: Vec<RangeInclusive<u32>>,
    },
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
            PageSelection::List { pages, ranges } => {
                pages.contains(&page) || ranges.iter().any(|r| r.contains(&page))
            }
        }
    }

    /// Check the selection against a document's page count.
    ///
    /// Explicit page numbers must exist; ranges are clipped to the document.
    pub fn validate(&self, page_count: u32) -> Result<()> {
        let pages = match self {
            PageSelection::Pages(pages) | PageSelection::List { pages, .. } => pages,
            PageSelection::All | PageSelection::Range(_) => return Ok(()),
        };
        match pages.iter().find(|&&p| p == 0 || p > page_count) {
            Some(&page) => Err(Error::PageOutOfRange(page, page_count)),
            None => Ok(()),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let (start, end) = parse_bounds(start, end, s)?;
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let (start, end) = parse_bounds(start, end, s)?;
                ranges.push(start..=end);
            } else {
                pages.push(parse_page(part, s)?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        if ranges.is_empty() {
            return Ok(PageSelection::Pages(pages));
        }
        ranges.sort_by_key(|r| *r.start());
        Ok(PageSelection::List { pages, ranges })
    }
}

fn parse_page(part: &str, whole: &str) -> Result<u32> {
    match part.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::InvalidPageRange(whole.to_string())),
        Ok(p) => Ok(p),
    }
}

fn parse_bounds(start: &str, end: &str, whole: &str) -> Result<(u32, u32)> {
    let start = parse_page(start, whole)?;
    let end = parse_page(end, whole)?;
    if start > end {
        return Err(Error::InvalidPageRange(whole.to_string()));
    }
    Ok((start, end))
}
