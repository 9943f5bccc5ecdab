//! Raw element types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Rectangle occupied by an element on a page.
///
/// Coordinates are PDF points with the origin at the top-left corner of the
/// page's MediaBox, so `top <= bottom`. Serialized as `[left, top, right, bottom]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    /// Create a bounding box, swapping coordinates as needed so that
    /// `left <= right` and `top <= bottom`.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// Convert a rectangle in PDF user space (origin bottom-left) into
    /// top-left page coordinates.
    ///
    /// `media_box` is `[x0, y0, x1, y1]` of the page.
    pub fn from_pdf_rect(x0: f32, y0: f32, x1: f32, y1: f32, media_box: [f32; 4]) -> Self {
        let origin_x = media_box[0].min(media_box[2]);
        let page_top = media_box[1].max(media_box[3]);
        Self::new(x0 - origin_x, page_top - y1, x1 - origin_x, page_top - y0)
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.left, b.top, b.right, b.bottom]
    }
}

/// Row-major table content. Empty cells are `None`.
///
/// A grid always has at least one row and one column, and every row has the
/// same number of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableGrid {
    rows: Vec<Vec<Option<String>>>,
}

impl TableGrid {
    /// Build a grid from rows, padding short rows with empty cells.
    ///
    /// Returns `None` when there is no row or no column.
    pub fn new(mut rows: Vec<Vec<Option<String>>>) -> Option<Self> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.is_empty() || width == 0 {
            return None;
        }
        for row in &mut rows {
            row.resize(width, None);
        }
        Some(Self { rows })
    }

    /// Build a grid from plain strings; blank strings become empty cells.
    pub fn from_strings<R, C, S>(rows: R) -> Option<Self>
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        let cell = cell.into();
                        if cell.trim().is_empty() {
                            None
                        } else {
                            Some(cell)
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(rows)
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// The rows of the grid.
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Cell text, `None` for empty or out-of-range cells.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}

/// Encoding of an extracted image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// DCT-encoded stream, written as-is
    Jpeg,
    /// Decoded samples re-encoded as PNG
    Png,
    /// JPEG 2000 stream, written as-is
    Jpeg2000,
    /// JBIG2 stream, written as-is
    Jbig2,
    /// CCITT fax stream, written as-is
    Ccitt,
    /// Samples we could not convert, written as stored
    Raw,
}

impl ImageFormat {
    /// File extension used in generated image names.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg2000 => "jpx",
            ImageFormat::Jbig2 => "jb2",
            ImageFormat::Ccitt => "fax",
            ImageFormat::Raw => "bin",
        }
    }

    /// MIME type of the written file.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg2000 => "image/jp2",
            ImageFormat::Jbig2 => "image/x-jbig2",
            ImageFormat::Ccitt => "image/g3fax",
            ImageFormat::Raw => "application/octet-stream",
        }
    }
}

/// Metadata of a text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMetadata {
    /// 1-based page number
    pub page_number: u32,
    pub bbox: BoundingBox,
}

/// Metadata of a detected table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// 1-based page number
    pub page_number: u32,
    pub bbox: BoundingBox,
    /// 0-based index of the table on its page
    pub table_index: u32,
}

/// Metadata of an image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// 1-based page number
    pub page_number: u32,
    /// Object number of the image XObject
    pub xref: u32,
    /// Where the image was written, if it was materialized
    pub temp_image_path: Option<PathBuf>,
    /// Placement on the page, when the page draws the image
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    /// Width in pixels
    #[serde(default)]
    pub width: Option<u32>,
    /// Height in pixels
    #[serde(default)]
    pub height: Option<u32>,
    pub format: ImageFormat,
}

/// One discrete content unit discovered during parsing.
///
/// Serialized with a `type` tag (`text`, `table`, `image_ref`) next to its
/// `content` and `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawElement {
    /// A block of text; lines are separated by `\n`.
    Text {
        content: String,
        metadata: TextMetadata,
    },
    /// A detected table.
    Table {
        content: TableGrid,
        metadata: TableMetadata,
    },
    /// A reference to an embedded image; `content` is the generated file name.
    ImageRef {
        content: String,
        metadata: ImageMetadata,
    },
}

/// Discriminant of a [`RawElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Text,
    Table,
    ImageRef,
}

impl RawElement {
    /// Create a text element. Returns `None` for whitespace-only content.
    pub fn text(content: impl Into<String>, page_number: u32, bbox: BoundingBox) -> Option<Self> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }
        let content = if trimmed.len() == content.len() {
            content
        } else {
            trimmed.to_string()
        };
        Some(RawElement::Text {
            content,
            metadata: TextMetadata { page_number, bbox },
        })
    }

    /// Create a table element.
    pub fn table(grid: TableGrid, page_number: u32, bbox: BoundingBox, table_index: u32) -> Self {
        RawElement::Table {
            content: grid,
            metadata: TableMetadata {
                page_number,
                bbox,
                table_index,
            },
        }
    }

    /// Create an image reference.
    pub fn image_ref(file_name: impl Into<String>, metadata: ImageMetadata) -> Self {
        RawElement::ImageRef {
            content: file_name.into(),
            metadata,
        }
    }

    /// The element's discriminant.
    pub fn kind(&self) -> ElementKind {
        match self {
            RawElement::Text { .. } => ElementKind::Text,
            RawElement::Table { .. } => ElementKind::Table,
            RawElement::ImageRef { .. } => ElementKind::ImageRef,
        }
    }

    /// 1-based page number the element was found on.
    pub fn page_number(&self) -> u32 {
        match self {
            RawElement::Text { metadata, .. } => metadata.page_number,
            RawElement::Table { metadata, .. } => metadata.page_number,
            RawElement::ImageRef { metadata, .. } => metadata.page_number,
        }
    }

    /// Bounding box, if the element has one.
    pub fn bbox(&self) -> Option<BoundingBox> {
        match self {
            RawElement::Text { metadata, .. } => Some(metadata.bbox),
            RawElement::Table { metadata, .. } => Some(metadata.bbox),
            RawElement::ImageRef { metadata, .. } => metadata.bbox,
        }
    }

    /// Text content, if this is a text element.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawElement::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Table grid and metadata, if this is a table element.
    pub fn as_table(&self) -> Option<(&TableGrid, &TableMetadata)> {
        match self {
            RawElement::Table { content, metadata } => Some((content, metadata)),
            _ => None,
        }
    }

    /// File name and metadata, if this is an image reference.
    pub fn as_image(&self) -> Option<(&str, &ImageMetadata)> {
        match self {
            RawElement::ImageRef { content, metadata } => Some((content, metadata)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_normalizes() {
        let bbox = BoundingBox::new(100.0, 50.0, 10.0, 20.0);
        assert_eq!(bbox.left, 10.0);
        assert_eq!(bbox.right, 100.0);
        assert_eq!(bbox.top, 20.0);
        assert_eq!(bbox.bottom, 50.0);
        assert_eq!(bbox.width(), 90.0);
        assert_eq!(bbox.height(), 30.0);
    }

    #[test]
    fn test_bbox_from_pdf_rect_flips_y() {
        let media_box = [0.0, 0.0, 612.0, 792.0];
        let bbox = BoundingBox::from_pdf_rect(72.0, 700.0, 200.0, 712.0, media_box);
        assert_eq!(bbox.left, 72.0);
        assert_eq!(bbox.top, 80.0);
        assert_eq!(bbox.right, 200.0);
        assert_eq!(bbox.bottom, 92.0);
    }

    #[test]
    fn test_bbox_serializes_as_array() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bbox);
    }

    #[test]
    fn test_table_grid_pads_rows() {
        let grid = TableGrid::from_strings(vec![vec!["a", "b", "c"], vec!["d"]]).unwrap();
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.cell(1, 0), Some("d"));
        assert_eq!(grid.cell(1, 2), None);
        assert!(grid.rows().iter().all(|r| r.len() == 3));
    }

    #[test]
    fn test_table_grid_rejects_empty() {
        assert!(TableGrid::new(vec![]).is_none());
        assert!(TableGrid::new(vec![vec![], vec![]]).is_none());
    }

    #[test]
    fn test_text_element_rejects_blank() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(RawElement::text("  \n\t ", 1, bbox).is_none());

        let el = RawElement::text("  Hello\nworld ", 2, bbox).unwrap();
        assert_eq!(el.as_text(), Some("Hello\nworld"));
        assert_eq!(el.page_number(), 2);
        assert_eq!(el.kind(), ElementKind::Text);
    }

    #[test]
    fn test_element_json_shape() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let grid = TableGrid::from_strings(vec![vec!["CCCD", ""]]).unwrap();
        let el = RawElement::table(grid, 1, bbox, 0);
        let value = serde_json::to_value(&el).unwrap();

        assert_eq!(value["type"], "table");
        assert_eq!(value["content"][0][0], "CCCD");
        assert!(value["content"][0][1].is_null());
        assert_eq!(value["metadata"]["table_index"], 0);
        assert_eq!(value["metadata"]["page_number"], 1);

        let image = RawElement::image_ref(
            "Image_2_0.jpeg",
            ImageMetadata {
                page_number: 2,
                xref: 12,
                temp_image_path: None,
                bbox: None,
                width: Some(4),
                height: Some(4),
                format: ImageFormat::Jpeg,
            },
        );
        let value = serde_json::to_value(&image).unwrap();
        assert_eq!(value["type"], "image_ref");
        assert_eq!(value["content"], "Image_2_0.jpeg");
        assert_eq!(value["metadata"]["xref"], 12);
        assert!(value["metadata"]["temp_image_path"].is_null());
    }

    #[test]
    fn test_image_format_extension() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpeg");
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Raw.mime_type(), "application/octet-stream");
    }
}
