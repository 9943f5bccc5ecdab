//! PDF document parser producing raw elements.

use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use unicode_normalization::UnicodeNormalization;

use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::error::{Error, Result};
use crate::model::{
    BoundingBox, DocumentMetadata, ImageFormat, ImageMetadata, ParseResult, RawElement,
};

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::content::{interpret_page, PageContent};
use super::images::{
    collect_page_images, encode_image, image_file_name, planned_format, ImageSink, PageImage,
};
use super::layout::{FontStatistics, LayoutAnalyzer, PdfRect};
use super::options::{ErrorMode, ParseOptions};
use super::table_detector::TableDetector;

/// Source label for documents parsed from memory.
const MEMORY_SOURCE: &str = "<memory>";

/// PDF document parser.
///
/// Elements are emitted page by page. Within a page, text blocks come first,
/// then image references, then tables. This is not a guaranteed visual
/// reading order.
pub struct DocumentParser<B: PdfBackend = LopdfBackend> {
    backend: B,
    options: ParseOptions,
    source: String,
}

impl DocumentParser<LopdfBackend> {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();

        // Verify it's a PDF before handing it to lopdf
        detect_format_from_path(path)?;
        let backend = LopdfBackend::load_file(path)?;

        Ok(Self::with_backend(
            backend,
            path.display().to_string(),
            options,
        ))
    }

    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        detect_format_from_bytes(data)?;
        let backend = LopdfBackend::load_bytes(data)?;
        Ok(Self::with_backend(backend, MEMORY_SOURCE, options))
    }
}

impl<B: PdfBackend> DocumentParser<B> {
    /// Wrap an already opened backend.
    pub fn with_backend(backend: B, source: impl Into<String>, options: ParseOptions) -> Self {
        Self {
            backend,
            options,
            source: source.into(),
        }
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> u32 {
        self.backend.pages().len() as u32
    }

    /// Get PDF version.
    pub fn version(&self) -> String {
        self.backend.version()
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.backend.is_encrypted()
    }

    /// Parse the document into raw elements.
    ///
    /// Each call builds a fresh [`ParseResult`]. If the call fails, image
    /// files it wrote are removed again.
    pub fn parse(&self) -> Result<ParseResult> {
        let pages = self.backend.pages();
        let page_count = pages.len() as u32;
        self.options.pages.validate(page_count)?;

        if self.backend.is_encrypted() {
            return Err(Error::Encrypted);
        }

        let metadata = self.extract_metadata(page_count);
        let mut result = ParseResult::new(metadata);

        // First pass: interpret every selected page so body text size is
        // judged over the whole document.
        let mut contents = Vec::new();
        for (&page_num, &page_id) in &pages {
            if !self.options.pages.includes(page_num) {
                continue;
            }
            let content = self.page_content(page_num, page_id)?;
            contents.push((page_num, page_id, content));
        }
        let font_stats = FontStatistics::from_spans(contents.iter().flat_map(|(_, _, c)| &c.spans));
        log::debug!("body font size: {:.1}pt", font_stats.body_size);

        let analyzer = LayoutAnalyzer::new(font_stats);
        let detector = TableDetector::with_config(self.options.table_detection.clone());
        let mut sink = ImageSink::new(&self.options.image_output);

        for (page_num, page_id, content) in contents {
            self.emit_page(
                &mut result,
                page_num,
                page_id,
                content,
                &analyzer,
                &detector,
                &mut sink,
            )?;
        }

        result.set_image_dir(sink.finish());

        let counts = result.counts();
        log::info!(
            "{}: {} pages, {} text blocks, {} tables, {} images",
            self.source,
            page_count,
            counts.text,
            counts.tables,
            counts.images
        );

        Ok(result)
    }

    /// Interpret one page, applying the error mode.
    fn page_content(&self, page_num: u32, page_id: PageId) -> Result<PageContent> {
        if !self.options.extract.needs_content() {
            return Ok(PageContent::default());
        }

        let mut content = match interpret_page(&self.backend, page_id, self.options.error_mode) {
            Ok(content) => content,
            Err(e) => {
                let err = page_error(page_num, e);
                if self.options.error_mode == ErrorMode::Strict {
                    return Err(err);
                }
                // In lenient mode, skip this page's text
                log::warn!("{}", err);
                PageContent::default()
            }
        };

        if self.options.normalize_unicode {
            for span in &mut content.spans {
                span.text = span.text.nfc().collect();
            }
        }

        Ok(content)
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_page(
        &self,
        result: &mut ParseResult,
        page_num: u32,
        page_id: PageId,
        mut content: PageContent,
        analyzer: &LayoutAnalyzer,
        detector: &TableDetector,
        sink: &mut ImageSink,
    ) -> Result<()> {
        let extract = &self.options.extract;
        let media_box = self.backend.media_box(page_id);
        let to_bbox =
            |(x0, y0, x1, y1): PdfRect| BoundingBox::from_pdf_rect(x0, y0, x1, y1, media_box);

        let spans = std::mem::take(&mut content.spans);
        let (tables, spans) = if extract.tables {
            detector.detect(spans)
        } else {
            (Vec::new(), spans)
        };

        if extract.text {
            for block in analyzer.analyze(spans) {
                let Some(extent) = block.extent() else {
                    continue;
                };
                if let Some(element) = RawElement::text(block.text(), page_num, to_bbox(extent)) {
                    result.push(element);
                }
            }
        }

        if extract.images {
            let images = collect_page_images(&self.backend, page_id, self.options.error_mode)
                .map_err(|e| page_error(page_num, e))?;
            for (index, image) in images.into_iter().enumerate() {
                let bbox = content
                    .placement_of(image.id)
                    .map(|p| to_bbox((p.rect[0], p.rect[1], p.rect[2], p.rect[3])));
                if let Some(element) = self.image_element(page_num, index, image, bbox, sink)? {
                    result.push(element);
                }
            }
        }

        if extract.tables {
            let mut table_index = 0u32;
            for table in &tables {
                let Some(grid) = detector.to_grid(table) else {
                    continue;
                };
                result.push(RawElement::table(
                    grid,
                    page_num,
                    to_bbox(table.extent),
                    table_index,
                ));
                table_index += 1;
            }
        }

        Ok(())
    }

    fn image_element(
        &self,
        page_num: u32,
        index: usize,
        image: PageImage,
        bbox: Option<BoundingBox>,
        sink: &mut ImageSink,
    ) -> Result<Option<RawElement>> {
        let (format, path): (ImageFormat, _) = if sink.is_enabled() {
            let data = match self.backend.image_data(image.id) {
                Ok(data) => data,
                Err(e) => {
                    let err = page_error(page_num, e);
                    if self.options.error_mode == ErrorMode::Strict {
                        return Err(err);
                    }
                    log::warn!("skipping image {}: {}", image.id.0, err);
                    return Ok(None);
                }
            };
            let encoded = encode_image(data);
            let name = image_file_name(page_num, index, encoded.format);
            let path = sink
                .write(&name, &encoded.bytes)
                .map_err(|e| Error::extraction(page_num, format!("cannot write {name}: {e}")))?;
            (encoded.format, Some(path))
        } else {
            (planned_format(&image.info), None)
        };

        if format == ImageFormat::Raw {
            log::warn!(
                "page {}: image {} stored without a standard container",
                page_num,
                image.id.0
            );
        }

        let metadata = ImageMetadata {
            page_number: page_num,
            xref: image.id.0,
            temp_image_path: path,
            bbox,
            width: Some(image.info.width).filter(|&w| w > 0),
            height: Some(image.info.height).filter(|&h| h > 0),
            format,
        };
        Ok(Some(RawElement::image_ref(
            image_file_name(page_num, index, format),
            metadata,
        )))
    }

    /// Extract document metadata.
    fn extract_metadata(&self, page_count: u32) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::new(self.source.clone(), page_count);
        metadata.pdf_version = self.backend.version();
        metadata.title = self.backend.info_entry(b"Title");
        metadata.author = self.backend.info_entry(b"Author");
        metadata.subject = self.backend.info_entry(b"Subject");
        metadata.keywords = self.backend.info_entry(b"Keywords");
        metadata.creator = self.backend.info_entry(b"Creator");
        metadata.producer = self.backend.info_entry(b"Producer");
        metadata.created = self
            .backend
            .info_entry(b"CreationDate")
            .and_then(|d| parse_pdf_date(&d));
        metadata.modified = self
            .backend
            .info_entry(b"ModDate")
            .and_then(|d| parse_pdf_date(&d));
        metadata.encrypted = self.backend.is_encrypted();
        metadata
    }
}

/// Turn an error raised while reading page content into an extraction error
/// for that page.
fn page_error(page_num: u32, err: Error) -> Error {
    match err {
        err @ Error::Extraction { page: Some(_), .. } => err,
        other => Error::extraction(page_num, other.detail()),
    }
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
pub(crate) fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let field = |range: std::ops::Range<usize>, default: u32| -> Option<u32> {
        match s.get(range) {
            Some(v) if v.bytes().all(|b| b.is_ascii_digit()) => v.parse().ok(),
            _ => Some(default),
        }
    };
    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month = field(4..6, 1)?;
    let day = field(6..8, 1)?;
    let hour = field(8..10, 0)?;
    let minute = field(10..12, 0)?;
    let second = field(12..14, 0)?;

    let local = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    let offset = s.get(14..).map(parse_utc_offset).unwrap_or(Some(0))?;
    let tz = FixedOffset::east_opt(offset)?;
    tz.from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Offset in seconds from a `Z`, `+HH'mm'` or `-HH'mm` suffix.
fn parse_utc_offset(s: &str) -> Option<i32> {
    let mut chars = s.chars();
    let sign = match chars.next() {
        None | Some('Z') => return Some(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };
    let digits: String = chars.filter(char::is_ascii_digit).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
    Some(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementKind;
    use crate::parser::options::{ExtractSet, PageSelection};
    use crate::test_support::{
        single_page, FixtureForm, FixtureImage, FixturePage, UNDECODABLE_FILTER,
    };
    use chrono::{Datelike, Timelike};

    fn parser(content: &str, images: &[FixtureImage], options: ParseOptions) -> DocumentParser {
        DocumentParser::with_backend(single_page(content, images), "fixture.pdf", options)
    }

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240115103045").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
        assert_eq!(date.hour(), 10);
    }

    #[test]
    fn test_parse_pdf_date_minimal() {
        let date = parse_pdf_date("D:2024").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 1);
    }

    #[test]
    fn test_parse_pdf_date_with_offset() {
        let date = parse_pdf_date("D:20240115103045+02'00'").unwrap();
        assert_eq!(date.hour(), 8);
        assert_eq!(date.minute(), 30);

        let date = parse_pdf_date("D:20240115103045Z").unwrap();
        assert_eq!(date.hour(), 10);

        assert!(parse_pdf_date("D:20").is_none());
        assert!(parse_pdf_date("D:20241399").is_none());
    }

    #[test]
    fn test_text_block_element() {
        let result = parser(
            "BT /F1 12 Tf 72 700 Td (Hello) Tj ET",
            &[],
            ParseOptions::default(),
        )
        .parse()
        .unwrap();

        assert_eq!(result.page_count(), 1);
        assert_eq!(result.len(), 1);
        let element = &result.raw_elements[0];
        assert_eq!(element.kind(), ElementKind::Text);
        assert_eq!(element.as_text(), Some("Hello"));

        let bbox = element.bbox().unwrap();
        assert!((bbox.left - 72.0).abs() < 0.01);
        // top = 792 - (700 + 0.8 * 12)
        assert!((bbox.top - 82.4).abs() < 0.01);
    }

    #[test]
    fn test_images_after_text() {
        let result = parser(
            "BT /F1 12 Tf 72 700 Td (Caption) Tj ET q 200 0 0 150 100 300 cm /Im0 Do Q",
            &[FixtureImage::jpeg("Im0", 4, 4)],
            ParseOptions::default(),
        )
        .parse()
        .unwrap();

        let kinds: Vec<_> = result.raw_elements.iter().map(RawElement::kind).collect();
        assert_eq!(kinds, vec![ElementKind::Text, ElementKind::ImageRef]);

        let (name, meta) = result.images().next().unwrap();
        assert_eq!(name, "Image_1_0.jpeg");
        assert_eq!(meta.format, ImageFormat::Jpeg);
        assert_eq!(meta.width, Some(4));
        assert!(meta.temp_image_path.is_none());
        let bbox = meta.bbox.unwrap();
        assert!((bbox.left - 100.0).abs() < 0.01);
        assert!((bbox.top - 342.0).abs() < 0.01);
        assert!((bbox.bottom - 492.0).abs() < 0.01);
    }

    #[test]
    fn test_temp_images_written() {
        let result = parser(
            "q 2 0 0 2 0 0 cm /Im0 Do Q",
            &[FixtureImage::rgb("Im0", 2, 2)],
            ParseOptions::default().with_temp_images(),
        )
        .parse()
        .unwrap();

        let (name, meta) = result.images().next().unwrap();
        assert_eq!(name, "Image_1_0.png");
        let path = meta.temp_image_path.clone().unwrap();
        assert!(path.exists());
        assert!(path.starts_with(result.image_dir().unwrap()));

        drop(result);
        assert!(!path.exists());
    }

    #[test]
    fn test_extract_set_respected() {
        let options = ParseOptions::default().with_extract(ExtractSet {
            text: false,
            tables: false,
            images: true,
        });
        let result = parser(
            "BT /F1 12 Tf 72 700 Td (Hello) Tj ET",
            &[FixtureImage::jpeg("Im0", 4, 4)],
            options,
        )
        .parse()
        .unwrap();
        assert_eq!(result.counts().text, 0);
        assert_eq!(result.counts().images, 1);

        let result = parser(
            "BT /F1 12 Tf 72 700 Td (Hello) Tj ET",
            &[FixtureImage::jpeg("Im0", 4, 4)],
            ParseOptions::default().text_only(),
        )
        .parse()
        .unwrap();
        assert_eq!(result.counts().images, 0);
        assert_eq!(result.counts().text, 1);
    }

    #[test]
    fn test_page_selection_out_of_range() {
        let err = parser("", &[], ParseOptions::default().with_pages(PageSelection::Pages(vec![3])))
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::PageOutOfRange(3, 1)));
    }

    fn fixture_parser(page: FixturePage<'_>, options: ParseOptions) -> DocumentParser {
        DocumentParser::with_backend(page.load(), "fixture.pdf", options)
    }

    #[test]
    fn test_undecodable_page_content() {
        let page = || {
            FixturePage::new("BT /F1 12 Tf 72 700 Td (Hello) Tj ET")
                .content_filter(UNDECODABLE_FILTER)
        };

        let err = fixture_parser(page(), ParseOptions::default())
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { page: Some(1), .. }), "{err}");

        let result = fixture_parser(page(), ParseOptions::default().lenient())
            .parse()
            .unwrap();
        assert_eq!(result.page_count(), 1);
        assert!(result.is_empty());
    }

    #[test]
    fn test_undecodable_form_content() {
        let forms = [
            FixtureForm::new("Fm0", "BT /F1 12 Tf 72 600 Td (Hidden) Tj ET")
                .with_filter(UNDECODABLE_FILTER),
        ];
        let content = "BT /F1 12 Tf 72 700 Td (Visible) Tj ET /Fm0 Do";

        let err = fixture_parser(FixturePage::new(content).forms(&forms), ParseOptions::default())
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { page: Some(1), .. }), "{err}");
        assert_eq!(err.kind(), crate::ErrorKind::Extraction);

        let result = fixture_parser(
            FixturePage::new(content).forms(&forms),
            ParseOptions::default().lenient(),
        )
        .parse()
        .unwrap();
        assert_eq!(result.plain_text(), "Visible");
    }

    #[test]
    fn test_page_error_attaches_page() {
        let err = page_error(4, Error::CorruptDocument("bad".into()));
        assert!(matches!(err, Error::Extraction { page: Some(4), .. }));
        assert_eq!(err.to_string(), "Extraction error on page 4: bad");

        let err = page_error(
            2,
            Error::Extraction {
                page: None,
                message: "x".into(),
            },
        );
        assert!(matches!(err, Error::Extraction { page: Some(2), .. }));
    }

    #[test]
    fn test_metadata_defaults() {
        let parser = parser("", &[], ParseOptions::default());
        assert_eq!(parser.page_count(), 1);
        assert!(!parser.is_encrypted());
        let result = parser.parse().unwrap();
        assert_eq!(result.metadata.source, "fixture.pdf");
        assert_eq!(result.metadata.page_count, 1);
        assert!(result.metadata.title.is_none());
        assert!(result.is_empty());
    }
}
