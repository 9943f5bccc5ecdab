//! PDF fixtures built in memory with lopdf.

#![allow(dead_code)]

use std::path::Path;

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// An image XObject placed on a fixture page.
#[derive(Clone)]
pub struct FixtureImage {
    name: String,
    stream: Stream,
}

impl FixtureImage {
    /// DCT-encoded image with a minimal SOI/EOI payload.
    pub fn jpeg(name: &str, width: i64, height: i64) -> Self {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        Self {
            name: name.to_string(),
            stream: Stream::new(dict, vec![0xFF, 0xD8, 0xFF, 0xD9]),
        }
    }

    /// Flate-compressed 8-bit RGB image.
    pub fn rgb(name: &str, width: i64, height: i64) -> Self {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        let samples = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
        let mut stream = Stream::new(dict, samples);
        stream.compress().expect("image stream compresses");
        Self {
            name: name.to_string(),
            stream,
        }
    }
}

struct FixturePage {
    content: String,
    images: Vec<FixtureImage>,
}

/// Builder for small multi-page documents. Pages carry font `F1`
/// (Helvetica) and font `F2`, a Type0 font for [`unicode_text_at`].
#[derive(Default)]
pub struct PdfBuilder {
    pages: Vec<FixturePage>,
    info: Vec<(String, String)>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, content: impl Into<String>) -> Self {
        self.page_with_images(content, Vec::new())
    }

    pub fn page_with_images(mut self, content: impl Into<String>, images: Vec<FixtureImage>) -> Self {
        self.pages.push(FixturePage {
            content: content.into(),
            images,
        });
        self
    }

    pub fn info(mut self, key: &str, value: &str) -> Self {
        self.info.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let unicode_font_id = add_unicode_font(&mut doc);

        let mut kids = Vec::new();
        for page in &self.pages {
            let mut xobjects = Dictionary::new();
            for image in &page.images {
                let id = doc.add_object(image.stream.clone());
                xobjects.set(image.name.as_str(), Object::Reference(id));
            }
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                page.content.as_bytes().to_vec(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id, "F2" => unicode_font_id },
                    "XObject" => xobjects,
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if !self.info.is_empty() {
            let mut info = Dictionary::new();
            for (key, value) in &self.info {
                info.set(key.as_str(), Object::string_literal(value.as_str()));
            }
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture serializes");
        bytes
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("fixture written");
    }
}

/// Character code whose ToUnicode entry is the decomposed `a` + U+0306.
const DECOMPOSED_A_BREVE: u16 = 0x0103;

/// Type0 font with two-byte Identity-H codes. Each code maps to the BMP
/// character of the same value, except that `ă` maps to its decomposed form.
fn add_unicode_font(doc: &mut Document) -> lopdf::ObjectId {
    let cmap = format!(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo\n\
         << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n\
         1 beginbfrange\n\
         <0000> <FFFF> <0000>\n\
         endbfrange\n\
         1 beginbfchar\n\
         <{DECOMPOSED_A_BREVE:04X}> <00610306>\n\
         endbfchar\n\
         endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n"
    );
    let to_unicode = doc.add_object(Stream::new(Dictionary::new(), cmap.into_bytes()));
    let descendant = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "Arial",
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "DW" => 500,
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "Arial",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(descendant)],
        "ToUnicode" => to_unicode,
    })
}

/// One line of text at an absolute position.
pub fn text_at(x: f32, y: f32, size: f32, text: &str) -> String {
    format!("BT /F1 {size} Tf 1 0 0 1 {x} {y} Tm ({text}) Tj ET\n")
}

/// One line of text in font `F2`, shown as a hex string of two-byte codes.
///
/// Text must stay within the BMP.
pub fn unicode_text_at(x: f32, y: f32, size: f32, text: &str) -> String {
    let hex: String = text.encode_utf16().map(|unit| format!("{unit:04X}")).collect();
    format!("BT /F2 {size} Tf 1 0 0 1 {x} {y} Tm <{hex}> Tj ET\n")
}

/// Grid of single-word cells, 100pt apart, rows 20pt apart from `top` down.
pub fn table_content(rows: &[&[&str]], top: f32) -> String {
    let mut content = String::new();
    for (r, row) in rows.iter().enumerate() {
        let y = top - r as f32 * 20.0;
        for (c, cell) in row.iter().enumerate() {
            content.push_str(&text_at(72.0 + c as f32 * 100.0, y, 10.0, cell));
        }
    }
    content
}

/// Draw an image XObject into a rectangle.
pub fn draw_image(name: &str, x: f32, y: f32, width: f32, height: f32) -> String {
    format!("q {width} 0 0 {height} {x} {y} cm /{name} Do Q\n")
}

pub const REPORT_TABLE: &[&[&str]] = &[
    &["Region", "Revenue", "Cost", "Margin"],
    &["North", "120", "80", "40"],
    &["South", "90", "70", "20"],
];

/// Last row of the report table, set in the Type0 font.
pub const REPORT_ID_ROW: [&str; 4] = ["CCCD", "Căn cước công dân", "bắt buộc", "1"];

/// Nine pages: a title and a 3x4 table on page 1, then a caption and one
/// image per page, JPEG on even pages and PNG-convertible RGB on odd pages.
///
/// The table is the first two rows of [`REPORT_TABLE`] followed by
/// [`REPORT_ID_ROW`].
pub fn nine_page_report() -> PdfBuilder {
    let mut first = text_at(72.0, 740.0, 18.0, "Quarterly Report");
    first.push_str(&table_content(&REPORT_TABLE[..2], 700.0));
    for (c, cell) in REPORT_ID_ROW.iter().enumerate() {
        first.push_str(&unicode_text_at(72.0 + c as f32 * 100.0, 660.0, 10.0, cell));
    }

    let mut builder = PdfBuilder::new()
        .info("Title", "Quarterly Report")
        .info("Author", "Finance")
        .info("CreationDate", "D:20240115103045Z")
        .page(first);

    for page in 2..=9 {
        let image = if page % 2 == 0 {
            FixtureImage::jpeg("Im0", 8, 6)
        } else {
            FixtureImage::rgb("Im0", 4, 3)
        };
        let mut content = text_at(72.0, 720.0, 11.0, &format!("Figure {page}"));
        content.push_str(&draw_image("Im0", 72.0, 400.0, 240.0, 180.0));
        builder = builder.page_with_images(content, vec![image]);
    }
    builder
}
