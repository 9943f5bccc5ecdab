//! Error classification for unreadable and invalid inputs.

mod common;

use std::fs;

use common::PdfBuilder;
use pdfparts::{
    parse_bytes_with_options, parse_document, parse_document_with_options, DocumentParser, Error,
    ErrorKind, PageSelection, ParseOptions,
};

#[test]
fn test_missing_path_is_access_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse_document(dir.path().join("does-not-exist.pdf")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Access);
    assert!(matches!(err, Error::Access { .. }));
}

#[test]
fn test_directory_is_access_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse_document(dir.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Access);
}

#[test]
fn test_renamed_text_file_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    fs::write(&path, "These are plain text notes, not a PDF.\n").unwrap();

    let err = parse_document(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptDocument);
}

#[test]
fn test_empty_file_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.pdf");
    fs::write(&path, b"").unwrap();

    let err = DocumentParser::open(&path).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::CorruptDocument);
}

#[test]
fn test_bad_version_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odd.pdf");
    fs::write(&path, b"%PDF-x.y\n").unwrap();

    let err = parse_document(&path).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion(_)));
    assert_eq!(err.kind(), ErrorKind::CorruptDocument);
}

#[test]
fn test_page_out_of_range_is_extraction_error() {
    let data = PdfBuilder::new().page("").page("").build();
    let options = ParseOptions::new().with_pages(PageSelection::Pages(vec![1, 5]));

    let err = parse_bytes_with_options(&data, options).unwrap_err();
    assert!(matches!(err, Error::PageOutOfRange(5, 2)));
    assert_eq!(err.kind(), ErrorKind::Extraction);
}

#[test]
fn test_range_past_end_is_clipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two.pdf");
    PdfBuilder::new()
        .page(common::text_at(72.0, 700.0, 12.0, "one"))
        .page(common::text_at(72.0, 700.0, 12.0, "two"))
        .write_to(&path);

    let options = ParseOptions::new().with_pages(PageSelection::parse("2-10").unwrap());
    let result = parse_document_with_options(&path, options).unwrap();
    assert_eq!(result.plain_text(), "two");
}

#[test]
fn test_invalid_page_range_string() {
    for input in ["0", "3-1", "a-b", "1,,x"] {
        let err = PageSelection::parse(input).unwrap_err();
        assert!(matches!(err, Error::InvalidPageRange(_)), "{input}");
    }
}

#[test]
fn test_error_messages_name_the_problem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.pdf");
    let err = parse_document(&path).unwrap_err();
    assert!(err.to_string().contains("gone.pdf"));
    assert_eq!(err.kind().to_string(), "access error");
}
