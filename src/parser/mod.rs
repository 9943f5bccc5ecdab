//! PDF parsing module.

pub mod backend;
mod content;
mod images;
mod layout;
mod options;
mod pdf_parser;
mod table_detector;

pub use backend::{LopdfBackend, PdfBackend};
pub use content::{interpret_page, ImagePlacement, Matrix, PageContent};
pub use images::{image_file_name, planned_format};
pub use layout::{Column, FontStatistics, LayoutAnalyzer, TextBlock, TextLine, TextSpan};
pub use options::{ErrorMode, ExtractSet, ImageOutput, PageSelection, ParseOptions};
pub use pdf_parser::DocumentParser;
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig, TableRowData};
