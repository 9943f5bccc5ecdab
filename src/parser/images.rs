//! Image XObject discovery, classification and materialization.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::model::ImageFormat;

use super::backend::{
    ColorSpace, ImageData, ImageInfo, ObjectId, PageId, PdfBackend, ResourceScope, XObjectKind,
};
use super::options::{ErrorMode, ImageOutput};

/// Forms nested deeper than this are not searched for images.
const MAX_FORM_DEPTH: usize = 12;

/// An image XObject reachable from a page's resources.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub id: ObjectId,
    pub info: ImageInfo,
}

/// List the images a page references, in resource order.
///
/// Images inside Form XObjects are included. Each image appears once per page
/// even when several resource names point at it. Unreadable resources fail
/// the call in strict mode and are skipped in lenient mode.
pub fn collect_page_images<B: PdfBackend + ?Sized>(
    backend: &B,
    page: PageId,
    mode: ErrorMode,
) -> Result<Vec<PageImage>> {
    let mut collector = ImageCollector {
        backend,
        mode,
        images: Vec::new(),
        seen_images: HashSet::new(),
        seen_forms: HashSet::new(),
    };
    collector.collect(ResourceScope::Page(page), 0)?;
    Ok(collector.images)
}

struct ImageCollector<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    mode: ErrorMode,
    images: Vec<PageImage>,
    seen_images: HashSet<ObjectId>,
    seen_forms: HashSet<ObjectId>,
}

impl<B: PdfBackend + ?Sized> ImageCollector<'_, B> {
    fn collect(&mut self, scope: ResourceScope, depth: usize) -> Result<()> {
        let entries = self
            .mode
            .recover(self.backend.xobjects(scope), || {
                format!("cannot read XObjects of {scope:?}")
            })?
            .unwrap_or_default();

        for entry in entries {
            match entry.kind {
                XObjectKind::Image => {
                    if !self.seen_images.insert(entry.id) {
                        continue;
                    }
                    let info = self.mode.recover(self.backend.image_info(entry.id), || {
                        format!("skipping image {} {}", entry.id.0, entry.id.1)
                    })?;
                    if let Some(info) = info {
                        self.images.push(PageImage { id: entry.id, info });
                    }
                }
                XObjectKind::Form { .. } => {
                    if depth < MAX_FORM_DEPTH && self.seen_forms.insert(entry.id) {
                        self.collect(ResourceScope::Form(entry.id), depth + 1)?;
                    }
                }
                XObjectKind::Other => {}
            }
        }
        Ok(())
    }
}

/// File name of the `index`-th image on a page.
pub fn image_file_name(page_number: u32, index: usize, format: ImageFormat) -> String {
    format!("Image_{}_{}.{}", page_number, index, format.extension())
}

/// The format an image will be written in, judged from its properties.
pub fn planned_format(info: &ImageInfo) -> ImageFormat {
    let codec = match info.final_filter() {
        Some("DCTDecode") => Some(ImageFormat::Jpeg),
        Some("JPXDecode") => Some(ImageFormat::Jpeg2000),
        Some("JBIG2Decode") => Some(ImageFormat::Jbig2),
        Some("CCITTFaxDecode") => Some(ImageFormat::Ccitt),
        _ => None,
    };
    if let Some(codec) = codec {
        // Codec data wrapped in another filter is not a usable file as stored.
        return if info.filters.len() == 1 {
            codec
        } else {
            ImageFormat::Raw
        };
    }

    if png_layout(info).is_some() {
        ImageFormat::Png
    } else {
        ImageFormat::Raw
    }
}

/// Encoded image file contents.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Produce the bytes to write for an image.
///
/// Images that cannot be converted fall back to their stored bytes in
/// [`ImageFormat::Raw`].
pub fn encode_image(data: ImageData) -> EncodedImage {
    let format = planned_format(&data.info);
    match format {
        ImageFormat::Png => {
            let result = match &data.decoded {
                Some(samples) => encode_png(&data.info, samples),
                None => Err(Error::Extraction {
                    page: None,
                    message: "image samples could not be decoded".to_string(),
                }),
            };
            match result {
                Ok(bytes) => EncodedImage { format, bytes },
                Err(e) => {
                    log::warn!("writing image as raw bytes: {}", e);
                    EncodedImage {
                        format: ImageFormat::Raw,
                        bytes: data.decoded.unwrap_or(data.raw),
                    }
                }
            }
        }
        ImageFormat::Raw => EncodedImage {
            format,
            bytes: data.decoded.unwrap_or(data.raw),
        },
        _ => EncodedImage {
            format,
            bytes: data.raw,
        },
    }
}

/// How samples map onto a PNG.
#[derive(Debug, Clone, PartialEq)]
enum PngLayout {
    Gray(png::BitDepth),
    Rgb(png::BitDepth),
    /// 8-bit CMYK converted to RGB
    CmykToRgb,
    Indexed(png::BitDepth, Vec<u8>),
}

fn png_layout(info: &ImageInfo) -> Option<PngLayout> {
    if info.width == 0 || info.height == 0 {
        return None;
    }
    let depth = png::BitDepth::from_u8(info.bits_per_component)?;
    match &info.color_space {
        ColorSpace::Gray => Some(PngLayout::Gray(depth)),
        ColorSpace::Rgb if matches!(depth, png::BitDepth::Eight | png::BitDepth::Sixteen) => {
            Some(PngLayout::Rgb(depth))
        }
        ColorSpace::Cmyk if depth == png::BitDepth::Eight => Some(PngLayout::CmykToRgb),
        ColorSpace::Indexed {
            base,
            hival,
            lookup,
        } if depth != png::BitDepth::Sixteen => {
            palette_rgb(base, *hival, lookup).map(|palette| PngLayout::Indexed(depth, palette))
        }
        _ => None,
    }
}

/// Expand an indexed color space's lookup table into an RGB palette.
fn palette_rgb(base: &ColorSpace, hival: u8, lookup: &[u8]) -> Option<Vec<u8>> {
    let entries = hival as usize + 1;
    let components = base.components()?;
    let table = lookup.get(..entries * components)?;
    match base {
        ColorSpace::Rgb => Some(table.to_vec()),
        ColorSpace::Gray => Some(table.iter().flat_map(|&g| [g, g, g]).collect()),
        ColorSpace::Cmyk => Some(table.chunks_exact(4).flat_map(cmyk_to_rgb).collect()),
        _ => None,
    }
}

fn cmyk_to_rgb(px: &[u8]) -> [u8; 3] {
    let k = 255 - u16::from(px[3]);
    let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
    [channel(px[0]), channel(px[1]), channel(px[2])]
}

fn encode_png(info: &ImageInfo, samples: &[u8]) -> Result<Vec<u8>> {
    let layout = png_layout(info).ok_or_else(|| Error::Extraction {
        page: None,
        message: "image cannot be represented as PNG".to_string(),
    })?;

    let components = info.color_space.components().unwrap_or(1);
    let expected = (info.width as usize)
        .checked_mul(components * info.bits_per_component as usize)
        .and_then(|bits| bits.checked_add(7))
        .map(|bits| bits / 8)
        .and_then(|row_bytes| row_bytes.checked_mul(info.height as usize))
        .ok_or_else(|| Error::Extraction {
            page: None,
            message: format!("image dimensions {}x{} too large", info.width, info.height),
        })?;
    let samples = samples.get(..expected).ok_or_else(|| Error::Extraction {
        page: None,
        message: format!(
            "image data too short ({} bytes, expected {})",
            samples.len(),
            expected
        ),
    })?;

    let (color, depth, data, palette) = match layout {
        PngLayout::Gray(depth) => (png::ColorType::Grayscale, depth, samples.to_vec(), None),
        PngLayout::Rgb(depth) => (png::ColorType::Rgb, depth, samples.to_vec(), None),
        PngLayout::CmykToRgb => (
            png::ColorType::Rgb,
            png::BitDepth::Eight,
            samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect(),
            None,
        ),
        PngLayout::Indexed(depth, palette) => {
            (png::ColorType::Indexed, depth, samples.to_vec(), Some(palette))
        }
    };

    let png_error = |e: png::EncodingError| Error::Extraction {
        page: None,
        message: format!("PNG encoding failed: {e}"),
    };

    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, info.width, info.height);
    encoder.set_color(color);
    encoder.set_depth(depth);
    if let Some(palette) = palette {
        encoder.set_palette(palette);
    }
    let mut writer = encoder.write_header().map_err(png_error)?;
    writer.write_image_data(&data).map_err(png_error)?;
    writer.finish().map_err(png_error)?;

    Ok(buf)
}

/// Destination for image files during one parse.
///
/// Files written into a caller directory are removed again if the parse does
/// not complete, and files they replaced are put back. A temporary directory
/// is removed with its owner.
#[derive(Debug)]
pub struct ImageSink {
    output: ImageOutput,
    temp: Option<TempDir>,
    written: Vec<PathBuf>,
    /// Holds files replaced in a caller directory until the parse completes
    backup: Option<TempDir>,
    /// (original path, saved copy)
    replaced: Vec<(PathBuf, PathBuf)>,
    committed: bool,
}

impl ImageSink {
    /// Create a sink for the configured output.
    pub fn new(output: &ImageOutput) -> Self {
        Self {
            output: output.clone(),
            temp: None,
            written: Vec::new(),
            backup: None,
            replaced: Vec::new(),
            committed: false,
        }
    }

    /// Whether image bytes are written at all.
    pub fn is_enabled(&self) -> bool {
        self.output != ImageOutput::None
    }

    fn directory(&mut self) -> Result<PathBuf> {
        match &self.output {
            ImageOutput::None => Err(Error::Extraction {
                page: None,
                message: "image output is disabled".to_string(),
            }),
            ImageOutput::Directory(dir) => {
                fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            ImageOutput::TempDir => {
                if self.temp.is_none() {
                    let dir = tempfile::Builder::new().prefix("pdfparts-").tempdir()?;
                    log::debug!("image temp dir: {}", dir.path().display());
                    self.temp = Some(dir);
                }
                self.temp
                    .as_ref()
                    .map(|d| d.path().to_path_buf())
                    .ok_or_else(|| Error::Extraction {
                        page: None,
                        message: "temporary image directory unavailable".to_string(),
                    })
            }
        }
    }

    /// Write one image file and return its path.
    pub fn write(&mut self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.directory()?;
        let path = dir.join(file_name);
        if matches!(self.output, ImageOutput::Directory(_)) && path.is_file() {
            self.set_aside(&dir, &path, file_name)?;
        }
        fs::write(&path, bytes)?;
        self.written.push(path.clone());
        Ok(path)
    }

    /// Move a file this parse is about to overwrite into the backup directory.
    fn set_aside(&mut self, dir: &Path, path: &Path, file_name: &str) -> Result<()> {
        if self.backup.is_none() {
            let backup = tempfile::Builder::new()
                .prefix(".pdfparts-replaced-")
                .tempdir_in(dir)?;
            self.backup = Some(backup);
        }
        let Some(backup) = &self.backup else {
            return Ok(());
        };
        let saved = backup.path().join(file_name);
        fs::rename(path, &saved)?;
        self.replaced.push((path.to_path_buf(), saved));
        Ok(())
    }

    /// Keep the written files; hand over the temporary directory, if any.
    pub fn finish(mut self) -> Option<Arc<TempDir>> {
        self.committed = true;
        self.temp.take().map(Arc::new)
    }
}

impl Drop for ImageSink {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // TempDir removes itself; only caller directories need cleanup.
        if matches!(self.output, ImageOutput::Directory(_)) {
            for path in &self.written {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("cannot remove {}: {}", path.display(), e);
                }
            }
            for (original, saved) in &self.replaced {
                if let Err(e) = fs::rename(saved, original) {
                    log::warn!("cannot restore {}: {}", original.display(), e);
                }
            }
        }
    }
}
