//! Content stream interpretation.
//!
//! Walks a page's operators while tracking the graphics state (CTM, text
//! parameters) and the text matrices, and records every shown string as a
//! positioned [`TextSpan`] and every painted image XObject as an
//! [`ImagePlacement`]. Form XObjects are entered recursively.

use std::collections::HashMap;

use crate::error::{Error, Result};

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, GlyphWidths, ObjectId, PageId, PdfBackend,
    PdfValue, ResourceScope, XObjectEntry, XObjectKind,
};
use super::layout::{is_spaceless_script_char, TextSpan};
use super::options::ErrorMode;

/// Forms nested deeper than this are skipped.
const MAX_FORM_DEPTH: usize = 12;

/// TJ adjustments larger than this (thousandths of an em) read as a word break.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Affine transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn from_array(m: [f32; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Map a point through the matrix.
    pub fn transform(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed x unit vector.
    pub fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Length of the transformed y unit vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Where an image XObject is painted, in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub id: ObjectId,
    /// `[x0, y0, x1, y1]` with `x0 <= x1` and `y0 <= y1`
    pub rect: [f32; 4],
}

/// Everything the interpreter found on a page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub spans: Vec<TextSpan>,
    pub placements: Vec<ImagePlacement>,
}

impl PageContent {
    /// First placement of an image on the page.
    pub fn placement_of(&self, id: ObjectId) -> Option<&ImagePlacement> {
        self.placements.iter().find(|p| p.id == id)
    }
}

/// Graphics state saved and restored by `q`/`Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            font: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Text object state, reset by `BT`.
#[derive(Debug, Clone, Default)]
struct TextObject {
    matrix: Matrix,
    line_matrix: Matrix,
    active: bool,
}

/// Resources visible to the operators currently being run.
struct Frame {
    scope: ResourceScope,
    /// Scope whose fonts are in use; forms without fonts inherit the caller's.
    font_scope: ResourceScope,
    fonts: HashMap<Vec<u8>, BackendFontInfo>,
}

/// Interpret a page's content stream.
///
/// In strict mode any unreadable resource the page uses fails the call; in
/// lenient mode it is logged and skipped.
pub fn interpret_page<B: PdfBackend + ?Sized>(
    backend: &B,
    page: PageId,
    mode: ErrorMode,
) -> Result<PageContent> {
    ContentInterpreter::new(backend, mode).run_page(page)
}

/// Stateful interpreter over one backend.
pub struct ContentInterpreter<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    mode: ErrorMode,
    content: PageContent,
    form_stack: Vec<ObjectId>,
    xobject_cache: HashMap<ResourceScope, Vec<XObjectEntry>>,
}

impl<'a, B: PdfBackend + ?Sized> ContentInterpreter<'a, B> {
    pub fn new(backend: &'a B, mode: ErrorMode) -> Self {
        Self {
            backend,
            mode,
            content: PageContent::default(),
            form_stack: Vec::new(),
            xobject_cache: HashMap::new(),
        }
    }

    /// Interpret a page and return its spans and image placements.
    pub fn run_page(mut self, page: PageId) -> Result<PageContent> {
        let scope = ResourceScope::Page(page);
        let data = self.backend.content(scope)?;
        let ops = self.backend.decode_content(&data)?;

        let frame = Frame {
            scope,
            font_scope: scope,
            fonts: self.load_fonts(scope)?,
        };
        self.run_ops(&ops, &frame, GraphicsState::new(Matrix::IDENTITY))?;

        log::debug!(
            "page {:?}: {} spans, {} image placements",
            page,
            self.content.spans.len(),
            self.content.placements.len()
        );
        Ok(self.content)
    }

    fn load_fonts(&self, scope: ResourceScope) -> Result<HashMap<Vec<u8>, BackendFontInfo>> {
        let fonts = self
            .mode
            .recover(self.backend.fonts(scope), || {
                format!("cannot read fonts of {scope:?}")
            })?
            .unwrap_or_default();
        Ok(fonts.into_iter().map(|f| (f.name.clone(), f)).collect())
    }

    fn xobject(&mut self, scope: ResourceScope, name: &[u8]) -> Result<Option<XObjectEntry>> {
        if !self.xobject_cache.contains_key(&scope) {
            let entries = self
                .mode
                .recover(self.backend.xobjects(scope), || {
                    format!("cannot read XObjects of {scope:?}")
                })?
                .unwrap_or_default();
            self.xobject_cache.insert(scope, entries);
        }
        Ok(self
            .xobject_cache
            .get(&scope)
            .and_then(|entries| entries.iter().find(|x| x.name == name))
            .cloned())
    }

    fn run_ops(&mut self, ops: &[ContentOp], frame: &Frame, initial: GraphicsState) -> Result<()> {
        let mut gs = initial;
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut text = TextObject::default();

        for op in ops {
            let nums: Vec<f32> = op.operands.iter().filter_map(get_number_from_value).collect();
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if let [a, b, c, d, e, f] = nums[..] {
                        gs.ctm = Matrix::new(a, b, c, d, e, f).multiply(&gs.ctm);
                    }
                }
                "BT" => {
                    text = TextObject {
                        active: true,
                        ..TextObject::default()
                    };
                }
                "ET" => text.active = false,
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        gs.font = name.clone();
                    }
                    if let Some(size) = op.operands.get(1).and_then(get_number_from_value) {
                        gs.font_size = size;
                    }
                }
                "Tc" => {
                    if let Some(&v) = nums.first() {
                        gs.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(&v) = nums.first() {
                        gs.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some(&v) = nums.first() {
                        gs.horizontal_scaling = v / 100.0;
                    }
                }
                "TL" => {
                    if let Some(&v) = nums.first() {
                        gs.leading = v;
                    }
                }
                "Ts" => {
                    if let Some(&v) = nums.first() {
                        gs.rise = v;
                    }
                }
                "Td" => {
                    if let [tx, ty] = nums[..] {
                        next_line(&mut text, tx, ty);
                    }
                }
                "TD" => {
                    if let [tx, ty] = nums[..] {
                        gs.leading = -ty;
                        next_line(&mut text, tx, ty);
                    }
                }
                "Tm" => {
                    if let [a, b, c, d, e, f] = nums[..] {
                        text.line_matrix = Matrix::new(a, b, c, d, e, f);
                        text.matrix = text.line_matrix;
                    }
                }
                "T*" => next_line(&mut text, 0.0, -gs.leading),
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        let items = [PdfValue::Str(bytes.clone())];
                        self.show_text(&items, frame, &gs, &mut text);
                    }
                }
                "TJ" => {
                    if let Some(PdfValue::Array(items)) = op.operands.first() {
                        self.show_text(items, frame, &gs, &mut text);
                    }
                }
                "'" => {
                    next_line(&mut text, 0.0, -gs.leading);
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        let items = [PdfValue::Str(bytes.clone())];
                        self.show_text(&items, frame, &gs, &mut text);
                    }
                }
                "\"" => {
                    if let [aw, ac, ..] = nums[..] {
                        gs.word_spacing = aw;
                        gs.char_spacing = ac;
                    }
                    next_line(&mut text, 0.0, -gs.leading);
                    if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                        let items = [PdfValue::Str(bytes.clone())];
                        self.show_text(&items, frame, &gs, &mut text);
                    }
                }
                "Do" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        self.paint_xobject(name, frame, &gs)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Show a TJ-style sequence of strings and position adjustments as one span.
    fn show_text(
        &mut self,
        items: &[PdfValue],
        frame: &Frame,
        gs: &GraphicsState,
        text: &mut TextObject,
    ) {
        if !text.active {
            return;
        }

        let font = frame.fonts.get(&gs.font);
        let font_name = font
            .map(|f| f.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&gs.font).to_string());
        let unknown = GlyphWidths::Unknown;
        let widths = font.map(|f| &f.widths).unwrap_or(&unknown);

        let start = text.matrix.multiply(&gs.ctm);
        let (x, y) = start.transform(0.0, gs.rise);
        let font_size = gs.font_size * start.vertical_scale();

        let mut combined = String::new();
        let mut advance = 0.0f32;

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    combined.push_str(&self.backend.decode_text(frame.font_scope, &gs.font, bytes));
                    let m = widths.measure(bytes);
                    let tx = (m.glyph_width / 1000.0 * gs.font_size
                        + gs.char_spacing * m.glyphs as f32
                        + gs.word_spacing * m.spaces as f32)
                        * gs.horizontal_scaling;
                    advance += tx;
                }
                other => {
                    let Some(n) = get_number_from_value(other) else {
                        continue;
                    };
                    advance -= n / 1000.0 * gs.font_size * gs.horizontal_scaling;
                    // Large negative adjustments separate words in many producers.
                    if -n > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(' ')
                        && !combined.ends_with('\u{00A0}')
                        && !combined.chars().last().is_some_and(is_spaceless_script_char)
                    {
                        combined.push(' ');
                    }
                }
            }
        }

        text.matrix = Matrix::translation(advance, 0.0).multiply(&text.matrix);

        if combined.trim().is_empty() {
            return;
        }
        let width = (advance * start.horizontal_scale()).max(0.0);
        self.content
            .spans
            .push(TextSpan::new(combined, x, y, font_size, font_name).with_width(width));
    }

    fn paint_xobject(&mut self, name: &[u8], frame: &Frame, gs: &GraphicsState) -> Result<()> {
        let Some(entry) = self.xobject(frame.scope, name)? else {
            log::debug!("Do: unknown XObject /{}", String::from_utf8_lossy(name));
            return Ok(());
        };

        match entry.kind {
            XObjectKind::Image => {
                let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
                    .map(|(x, y)| gs.ctm.transform(x, y));
                let xs = corners.map(|c| c.0);
                let ys = corners.map(|c| c.1);
                let rect = [
                    xs.into_iter().fold(f32::INFINITY, f32::min),
                    ys.into_iter().fold(f32::INFINITY, f32::min),
                    xs.into_iter().fold(f32::NEG_INFINITY, f32::max),
                    ys.into_iter().fold(f32::NEG_INFINITY, f32::max),
                ];
                self.content.placements.push(ImagePlacement {
                    id: entry.id,
                    rect,
                });
            }
            XObjectKind::Form { matrix } => {
                if self.form_stack.len() >= MAX_FORM_DEPTH || self.form_stack.contains(&entry.id)
                {
                    log::warn!(
                        "skipping form XObject {} {}: nesting too deep or cyclic",
                        entry.id.0,
                        entry.id.1
                    );
                    return Ok(());
                }
                let ran = self.run_form(entry.id, matrix, frame, gs);
                self.mode.recover(ran, || {
                    format!("skipping form XObject {} {}", entry.id.0, entry.id.1)
                })?;
            }
            XObjectKind::Other => {}
        }
        Ok(())
    }

    fn run_form(
        &mut self,
        id: ObjectId,
        matrix: [f32; 6],
        parent: &Frame,
        gs: &GraphicsState,
    ) -> Result<()> {
        let scope = ResourceScope::Form(id);
        let form_error = |e: Error| Error::Extraction {
            page: None,
            message: format!("form XObject {} {}: {}", id.0, id.1, e.detail()),
        };
        let data = self.backend.content(scope).map_err(form_error)?;
        let ops = self.backend.decode_content(&data).map_err(form_error)?;

        let fonts = self.load_fonts(scope)?;
        let frame = if fonts.is_empty() {
            Frame {
                scope,
                font_scope: parent.font_scope,
                fonts: parent.fonts.clone(),
            }
        } else {
            Frame {
                scope,
                font_scope: scope,
                fonts,
            }
        };

        let mut form_gs = gs.clone();
        form_gs.ctm = Matrix::from_array(matrix).multiply(&gs.ctm);

        self.form_stack.push(id);
        let ran = self.run_ops(&ops, &frame, form_gs);
        self.form_stack.pop();
        ran
    }
}

/// Move to the start of the next line, offset by `(tx, ty)` from the current one.
fn next_line(text: &mut TextObject, tx: f32, ty: f32) {
    text.line_matrix = Matrix::translation(tx, ty).multiply(&text.line_matrix);
    text.matrix = text.line_matrix;
}
