//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from content interpretation, layout
//! analysis and image extraction.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

/// Object identifier: (object number, generation number).
pub type ObjectId = (u32, u16);

/// Page identifier.
pub type PageId = ObjectId;

/// US Letter, used when a page declares no usable MediaBox.
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Where named resources (fonts, XObjects) are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    /// The page's (possibly inherited) resource dictionary
    Page(PageId),
    /// The resource dictionary of a Form XObject
    Form(ObjectId),
}

/// Glyph advance widths of a font, in thousandths of text space.
#[derive(Debug, Clone, PartialEq)]
pub enum GlyphWidths {
    /// Single-byte font with a `/Widths` array
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing_width: f32,
    },
    /// Composite (Type0) font with two-byte codes
    Composite {
        default_width: f32,
        widths: HashMap<u32, f32>,
    },
    /// No width information; glyphs are estimated at half an em
    Unknown,
}

/// Estimated glyph width when a font carries no metrics.
const ESTIMATED_GLYPH_WIDTH: f32 = 500.0;

/// Measurement of a shown string.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextMeasure {
    /// Sum of glyph widths in thousandths of text space
    pub glyph_width: f32,
    /// Number of glyphs shown
    pub glyphs: usize,
    /// Number of single-byte spaces (subject to word spacing)
    pub spaces: usize,
}

impl GlyphWidths {
    /// Measure a string of character codes.
    pub fn measure(&self, bytes: &[u8]) -> TextMeasure {
        match self {
            GlyphWidths::Simple {
                first_char,
                widths,
                missing_width,
            } => {
                let mut m = TextMeasure::default();
                for &b in bytes {
                    let idx = (b as u32).checked_sub(*first_char);
                    let w = idx
                        .and_then(|i| widths.get(i as usize))
                        .copied()
                        .unwrap_or(*missing_width);
                    m.glyph_width += w;
                    m.glyphs += 1;
                    if b == b' ' {
                        m.spaces += 1;
                    }
                }
                m
            }
            GlyphWidths::Composite {
                default_width,
                widths,
            } => {
                let mut m = TextMeasure::default();
                for pair in bytes.chunks(2) {
                    let code = match pair {
                        [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                        [single] => u32::from(*single),
                        _ => continue,
                    };
                    m.glyph_width += widths.get(&code).copied().unwrap_or(*default_width);
                    m.glyphs += 1;
                }
                m
            }
            GlyphWidths::Unknown => TextMeasure {
                glyph_width: bytes.len() as f32 * ESTIMATED_GLYPH_WIDTH,
                glyphs: bytes.len(),
                spaces: bytes.iter().filter(|&&b| b == b' ').count(),
            },
        }
    }
}

/// Font information returned by the backend.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// Font resource name (key in the font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// Glyph metrics
    pub widths: GlyphWidths,
}

/// Color space of an image XObject.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette-based; `lookup` holds `hival + 1` base-space entries
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
    /// Anything we cannot convert (Separation, DeviceN, Lab, ...)
    Other(String),
}

impl ColorSpace {
    /// Number of color components per sample.
    pub fn components(&self) -> Option<usize> {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => Some(1),
            ColorSpace::Rgb => Some(3),
            ColorSpace::Cmyk => Some(4),
            ColorSpace::Other(_) => None,
        }
    }
}

/// Image XObject properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    /// Filter chain in application order
    pub filters: Vec<String>,
    /// Stencil mask (1-bit, no color space)
    pub image_mask: bool,
}

impl ImageInfo {
    /// Last filter in the chain, which determines the stored encoding.
    pub fn final_filter(&self) -> Option<&str> {
        self.filters.last().map(String::as_str)
    }
}

/// Image stream contents.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub info: ImageInfo,
    /// Stream bytes as stored in the file
    pub raw: Vec<u8>,
    /// Samples after undoing general-purpose filters, when possible
    pub decoded: Option<Vec<u8>>,
}

/// Kind of an XObject resource.
#[derive(Debug, Clone, PartialEq)]
pub enum XObjectKind {
    Image,
    /// Form XObject with its `/Matrix`
    Form { matrix: [f32; 6] },
    Other,
}

/// An entry of a resource dictionary's `/XObject` map.
#[derive(Debug, Clone, PartialEq)]
pub struct XObjectEntry {
    /// Resource name (e.g., `Im0`)
    pub name: Vec<u8>,
    pub id: ObjectId,
    pub kind: XObjectKind,
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, resources, content stream
/// decoding, text decoding and image data without exposing any concrete
/// PDF library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Page MediaBox as `[x0, y0, x1, y1]`, following inheritance.
    fn media_box(&self, page: PageId) -> [f32; 4];

    /// Fonts available in a resource scope.
    fn fonts(&self, scope: ResourceScope) -> Result<Vec<BackendFontInfo>>;

    /// XObjects available in a resource scope, in dictionary order.
    fn xobjects(&self, scope: ResourceScope) -> Result<Vec<XObjectEntry>>;

    /// Raw (decompressed) content stream bytes of a page or form.
    fn content(&self, scope: ResourceScope) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding in the scope.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, scope: ResourceScope, font_name: &[u8], bytes: &[u8]) -> String;

    /// Properties of an image XObject.
    fn image_info(&self, id: ObjectId) -> Result<ImageInfo>;

    /// Properties and stream bytes of an image XObject.
    fn image_data(&self, id: ObjectId) -> Result<ImageData>;

    /// PDF version string.
    fn version(&self) -> String;

    /// Whether the document declares encryption.
    fn is_encrypted(&self) -> bool;

    /// A text entry of the document information dictionary.
    fn info_entry(&self, key: &[u8]) -> Option<String>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::IO(io) => Error::access(path, io),
            other => Error::from(other),
        })?;
        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self { doc })
    }

    /// Follow a single indirect reference.
    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, walking up `/Parent` links.
    fn inherited<'a>(&'a self, page: PageId, key: &[u8]) -> Option<&'a Object> {
        let mut current = page;
        // Bounded walk guards against cyclic page trees.
        for _ in 0..64 {
            let dict = self.doc.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }

    fn stream(&self, id: ObjectId) -> Result<&Stream> {
        match self.doc.get_object(id)? {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::CorruptDocument(format!(
                "object {} {} is not a stream",
                id.0, id.1
            ))),
        }
    }

    /// Resource dictionary of a scope, if it has one.
    fn resources(&self, scope: ResourceScope) -> Result<Option<&Dictionary>> {
        match scope {
            ResourceScope::Page(page) => Ok(self
                .inherited(page, b"Resources")
                .and_then(|obj| self.resolve_dict(obj))),
            ResourceScope::Form(id) => {
                let stream = self.stream(id)?;
                Ok(stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|obj| self.resolve_dict(obj)))
            }
        }
    }

    /// Font dictionaries of a scope keyed by resource name.
    fn font_dicts(&self, scope: ResourceScope) -> Result<BTreeMap<Vec<u8>, &Dictionary>> {
        if let ResourceScope::Page(page) = scope {
            return Ok(self.doc.get_page_fonts(page)?);
        }
        let mut fonts = BTreeMap::new();
        let font_map = self
            .resources(scope)?
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|obj| self.resolve_dict(obj));
        if let Some(font_map) = font_map {
            for (name, obj) in font_map.iter() {
                if let Some(dict) = self.resolve_dict(obj) {
                    fonts.insert(name.clone(), dict);
                }
            }
        }
        Ok(fonts)
    }

    fn glyph_widths(&self, font: &Dictionary) -> GlyphWidths {
        let subtype = font.get(b"Subtype").and_then(Object::as_name).unwrap_or(b"");
        if subtype == b"Type0" {
            return self.composite_widths(font);
        }

        let first_char = font
            .get(b"FirstChar")
            .and_then(Object::as_i64)
            .unwrap_or(0)
            .max(0) as u32;
        let widths: Vec<f32> = font
            .get(b"Widths")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| self.resolve(w).and_then(|w| w.as_float().ok()).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        if widths.is_empty() {
            return GlyphWidths::Unknown;
        }
        let missing_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
            .and_then(|fd| fd.get(b"MissingWidth").ok())
            .and_then(|w| w.as_float().ok())
            .unwrap_or(ESTIMATED_GLYPH_WIDTH);

        GlyphWidths::Simple {
            first_char,
            widths,
            missing_width,
        }
    }

    fn composite_widths(&self, font: &Dictionary) -> GlyphWidths {
        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|obj| self.resolve_dict(obj));
        let Some(descendant) = descendant else {
            return GlyphWidths::Unknown;
        };

        let default_width = descendant
            .get(b"DW")
            .and_then(Object::as_float)
            .unwrap_or(1000.0);
        let mut widths = HashMap::new();
        let w_array = descendant
            .get(b"W")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok());

        if let Some(items) = w_array {
            // Entries are either `c [w1 w2 ...]` or `c_first c_last w`.
            let mut i = 0;
            while i < items.len() {
                let Ok(first) = items[i].as_i64() else { break };
                let first = first.max(0) as u32;
                match items.get(i + 1).and_then(|o| self.resolve(o)) {
                    Some(Object::Array(list)) => {
                        for (offset, w) in list.iter().enumerate() {
                            if let Ok(w) = w.as_float() {
                                widths.insert(first + offset as u32, w);
                            }
                        }
                        i += 2;
                    }
                    Some(last) => {
                        let (Ok(last), Some(Ok(w))) =
                            (last.as_i64(), items.get(i + 2).map(Object::as_float))
                        else {
                            break;
                        };
                        let last = (last.max(0) as u32).min(first.saturating_add(0xFFFF));
                        for code in first..=last {
                            widths.insert(code, w);
                        }
                        i += 3;
                    }
                    None => break,
                }
            }
        }

        GlyphWidths::Composite {
            default_width,
            widths,
        }
    }

    fn color_space(&self, obj: &Object, depth: usize) -> ColorSpace {
        let Some(obj) = self.resolve(obj) else {
            return ColorSpace::Other("unresolved".to_string());
        };
        match obj {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"CalGray" | b"G" => ColorSpace::Gray,
                b"DeviceRGB" | b"CalRGB" | b"RGB" => ColorSpace::Rgb,
                b"DeviceCMYK" | b"CMYK" => ColorSpace::Cmyk,
                other => ColorSpace::Other(String::from_utf8_lossy(other).to_string()),
            },
            Object::Array(arr) => {
                let family = arr.first().and_then(|o| o.as_name().ok()).unwrap_or(b"");
                match family {
                    b"ICCBased" => {
                        let n = arr
                            .get(1)
                            .and_then(|o| self.resolve_dict(o))
                            .and_then(|d| d.get(b"N").ok())
                            .and_then(|n| n.as_i64().ok());
                        match n {
                            Some(1) => ColorSpace::Gray,
                            Some(3) => ColorSpace::Rgb,
                            Some(4) => ColorSpace::Cmyk,
                            _ => ColorSpace::Other("ICCBased".to_string()),
                        }
                    }
                    b"CalGray" => ColorSpace::Gray,
                    b"CalRGB" => ColorSpace::Rgb,
                    b"Indexed" | b"I" if depth == 0 && arr.len() >= 4 => {
                        let base = arr
                            .get(1)
                            .map(|b| self.color_space(b, depth + 1))
                            .unwrap_or(ColorSpace::Other("Indexed".to_string()));
                        let hival = arr[2].as_i64().unwrap_or(0).clamp(0, 255) as u8;
                        let lookup = match self.resolve(&arr[3]) {
                            Some(Object::String(bytes, _)) => bytes.clone(),
                            Some(Object::Stream(s)) => decode_stream(s).unwrap_or_default(),
                            _ => Vec::new(),
                        };
                        ColorSpace::Indexed {
                            base: Box::new(base),
                            hival,
                            lookup,
                        }
                    }
                    other => ColorSpace::Other(String::from_utf8_lossy(other).to_string()),
                }
            }
            _ => ColorSpace::Other("unknown".to_string()),
        }
    }

    fn image_info_from_dict(&self, dict: &Dictionary) -> ImageInfo {
        let int = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|o| o.as_i64().ok())
        };
        let image_mask = dict
            .get(b"ImageMask")
            .and_then(Object::as_bool)
            .unwrap_or(false);
        let color_space = if image_mask {
            ColorSpace::Gray
        } else {
            dict.get(b"ColorSpace")
                .map(|cs| self.color_space(cs, 0))
                .unwrap_or(ColorSpace::Other("none".to_string()))
        };

        ImageInfo {
            width: int(b"Width").unwrap_or(0).max(0) as u32,
            height: int(b"Height").unwrap_or(0).max(0) as u32,
            bits_per_component: if image_mask {
                1
            } else {
                int(b"BitsPerComponent").unwrap_or(8).clamp(0, 16) as u8
            },
            color_space,
            filters: stream_filters(dict),
            image_mask,
        }
    }
}

/// Filter names of a stream in application order.
fn stream_filters(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).to_string()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Decompress a stream if it declares a filter.
fn decode_stream(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8, else Latin-1).
fn decode_text_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn media_box(&self, page: PageId) -> [f32; 4] {
        let values: Option<Vec<f32>> = self
            .inherited(page, b"MediaBox")
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| self.resolve(v).and_then(|v| v.as_float().ok()))
                    .collect()
            });
        match values.as_deref() {
            Some([x0, y0, x1, y1, ..]) if x0 != x1 && y0 != y1 => [*x0, *y0, *x1, *y1],
            _ => DEFAULT_MEDIA_BOX,
        }
    }

    fn fonts(&self, scope: ResourceScope) -> Result<Vec<BackendFontInfo>> {
        let fonts = self.font_dicts(scope)?;
        let mut result = Vec::with_capacity(fonts.len());
        for (name, font_dict) in &fonts {
            let base_font = font_dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            result.push(BackendFontInfo {
                name: name.clone(),
                base_font,
                widths: self.glyph_widths(font_dict),
            });
        }
        Ok(result)
    }

    fn xobjects(&self, scope: ResourceScope) -> Result<Vec<XObjectEntry>> {
        let xobject_map = self
            .resources(scope)?
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|obj| self.resolve_dict(obj));
        let Some(xobject_map) = xobject_map else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for (name, obj) in xobject_map.iter() {
            // Direct (inline) XObject streams have no object number to report.
            let Ok(id) = obj.as_reference() else {
                continue;
            };
            let Ok(Object::Stream(stream)) = self.doc.get_object(id) else {
                continue;
            };
            let kind = match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => XObjectKind::Image,
                Ok(b"Form") => XObjectKind::Form {
                    matrix: form_matrix(&stream.dict),
                },
                _ => XObjectKind::Other,
            };
            entries.push(XObjectEntry {
                name: name.clone(),
                id,
                kind,
            });
        }
        Ok(entries)
    }

    fn content(&self, scope: ResourceScope) -> Result<Vec<u8>> {
        let page_id = match scope {
            ResourceScope::Form(id) => return decode_stream(self.stream(id)?),
            ResourceScope::Page(page) => page,
        };
        let page_dict = self.doc.get_dictionary(page_id)?;

        let Ok(contents) = page_dict.get(b"Contents") else {
            // Page with no content
            return Ok(Vec::new());
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r)? {
                Object::Stream(s) => decode_stream(s),
                Object::Array(arr) => self.concat_streams(arr),
                _ => Err(Error::CorruptDocument("invalid content stream".to_string())),
            },
            Object::Array(arr) => self.concat_streams(arr),
            _ => Err(Error::CorruptDocument("invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content = lopdf::content::Content::decode(data)?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, scope: ResourceScope, font_name: &[u8], bytes: &[u8]) -> String {
        if let Ok(fonts) = self.font_dicts(scope) {
            if let Some(font_dict) = fonts.get(font_name) {
                if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn image_info(&self, id: ObjectId) -> Result<ImageInfo> {
        let stream = self.stream(id)?;
        Ok(self.image_info_from_dict(&stream.dict))
    }

    fn image_data(&self, id: ObjectId) -> Result<ImageData> {
        let stream = self.stream(id)?;
        let info = self.image_info_from_dict(&stream.dict);
        let decoded = match info.final_filter() {
            Some("DCTDecode" | "JPXDecode" | "JBIG2Decode" | "CCITTFaxDecode") => None,
            _ => match decode_stream(stream) {
                Ok(data) => Some(data),
                Err(e) => {
                    log::debug!("image {} {}: cannot decode stream: {}", id.0, id.1, e);
                    None
                }
            },
        };
        Ok(ImageData {
            info,
            raw: stream.content.clone(),
            decoded,
        })
    }

    fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    fn info_entry(&self, key: &[u8]) -> Option<String> {
        let info = self.doc.trailer.get(b"Info").ok()?;
        let info = self.resolve_dict(info)?;
        let value = self.resolve(info.get(key).ok()?)?;
        decode_text_string(value).filter(|s| !s.trim().is_empty())
    }
}

impl LopdfBackend {
    fn concat_streams(&self, items: &[Object]) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        for item in items {
            if let Some(Object::Stream(s)) = self.resolve(item) {
                let data = decode_stream(s)?;
                if !content.is_empty() {
                    content.push(b' ');
                }
                content.extend_from_slice(&data);
            }
        }
        Ok(content)
    }
}

fn form_matrix(dict: &Dictionary) -> [f32; 6] {
    let values: Vec<f32> = dict
        .get(b"Matrix")
        .and_then(Object::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_float().ok()).collect())
        .unwrap_or_default();
    match values.as_slice() {
        [a, b, c, d, e, f] => [*a, *b, *c, *d, *e, *f],
        _ => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_get_number_from_value() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(42)), Some(42.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(2.5)), Some(2.5));
        assert_eq!(get_number_from_value(&PdfValue::Other), None);
    }

    #[test]
    fn test_simple_widths_measure() {
        let widths = GlyphWidths::Simple {
            first_char: 32,
            widths: vec![250.0, 300.0, 400.0],
            missing_width: 100.0,
        };
        let m = widths.measure(b" !\"#");
        assert_eq!(m.glyphs, 4);
        assert_eq!(m.spaces, 1);
        assert_eq!(m.glyph_width, 250.0 + 300.0 + 400.0 + 100.0);
    }

    #[test]
    fn test_composite_widths_measure() {
        let mut map = HashMap::new();
        map.insert(0x0041, 600.0);
        let widths = GlyphWidths::Composite {
            default_width: 1000.0,
            widths: map,
        };
        let m = widths.measure(&[0x00, 0x41, 0x4E, 0x2D]);
        assert_eq!(m.glyphs, 2);
        assert_eq!(m.glyph_width, 1600.0);
    }

    #[test]
    fn test_unknown_widths_estimate() {
        let m = GlyphWidths::Unknown.measure(b"ab c");
        assert_eq!(m.glyphs, 4);
        assert_eq!(m.spaces, 1);
        assert_eq!(m.glyph_width, 2000.0);
    }

    #[test]
    fn test_stream_filters() {
        let dict = dictionary! { "Filter" => "DCTDecode" };
        assert_eq!(stream_filters(&dict), vec!["DCTDecode".to_string()]);

        let dict = dictionary! {
            "Filter" => vec![Object::Name(b"FlateDecode".to_vec()), Object::Name(b"DCTDecode".to_vec())],
        };
        assert_eq!(stream_filters(&dict).len(), 2);
        assert!(stream_filters(&Dictionary::new()).is_empty());
    }

    #[test]
    fn test_form_matrix_default() {
        assert_eq!(
            form_matrix(&Dictionary::new()),
            [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
        );
        let dict = dictionary! {
            "Matrix" => vec![2.into(), 0.into(), 0.into(), 2.into(), 10.into(), 20.into()],
        };
        assert_eq!(form_matrix(&dict), [2.0, 0.0, 0.0, 2.0, 10.0, 20.0]);
    }
}
