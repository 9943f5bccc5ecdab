//! Layout analysis for PDF pages.
//!
//! Groups positioned text spans into lines and lines into blocks, respecting
//! two-column layouts. Blocks are what the parser emits as text elements.

use std::cmp::Ordering;
use std::collections::HashMap;

/// A text span with position and style information.
///
/// Coordinates are PDF user space: `y` is the baseline, growing upwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a new text span. Width defaults to an estimate from the font size.
    pub fn new(text: String, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let width = text.chars().count() as f32 * font_size * 0.5;

        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
        }
    }

    /// Set the measured width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom Y coordinate (approximate, based on font size).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    /// Get the top Y coordinate (approximate, based on font size).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }
}

/// Axis-aligned extent in PDF user space: `(x0, y0, x1, y1)`, y growing upwards.
pub type PdfRect = (f32, f32, f32, f32);

/// Extent covering all spans.
pub fn spans_extent<'s>(spans: impl IntoIterator<Item = &'s TextSpan>) -> Option<PdfRect> {
    spans.into_iter().fold(None, |acc, s| {
        let r = (s.x, s.bottom(), s.right(), s.top());
        Some(match acc {
            None => r,
            Some((x0, y0, x1, y1)) => (x0.min(r.0), y0.min(r.1), x1.max(r.2), y1.max(r.3)),
        })
    })
}

/// A text line composed of multiple spans on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
    /// Y position (baseline)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size in this line
    pub font_size: f32,
    /// Whether this line is set noticeably larger than body text
    pub is_heading: bool,
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        // Dominant size, weighted by text length
        let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
        let weighted: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.len() as f32)
            .sum();
        let font_size = match spans.first() {
            Some(_) if total_chars > 0 => weighted / total_chars as f32,
            Some(first) => first.font_size,
            None => 0.0,
        };
        let (x, y) = spans.first().map(|s| (s.x, s.y)).unwrap_or_default();

        Self {
            spans,
            y,
            x,
            font_size,
            is_heading: false,
        }
    }

    /// Get the combined text of all spans with appropriate spacing.
    ///
    /// A space goes between spans separated by a visible gap, except between
    /// characters of scripts written without word spaces.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - prev.right();

                let char_count = span.text.chars().count();
                let avg_char_width = if char_count > 0 && span.width > 0.0 {
                    span.width / char_count as f32
                } else {
                    span.font_size * 0.5
                };

                let both_spaceless = prev.text.chars().last().is_some_and(is_spaceless_script_char)
                    && span.text.chars().next().is_some_and(is_spaceless_script_char);
                let already_spaced = prev.text.ends_with([' ', '\u{00A0}'])
                    || span.text.starts_with([' ', '\u{00A0}']);

                if gap > avg_char_width * 0.2 && !both_spaceless && !already_spaced {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }

    /// Extent of the line.
    pub fn extent(&self) -> Option<PdfRect> {
        spans_extent(&self.spans)
    }
}

/// A block of consecutive lines.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Create a new text block.
    pub fn new(lines: Vec<TextLine>) -> Self {
        Self { lines }
    }

    /// Lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check if the block is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() || self.text().trim().is_empty()
    }

    /// Extent of the block.
    pub fn extent(&self) -> Option<PdfRect> {
        spans_extent(self.lines.iter().flat_map(|l| &l.spans))
    }
}

/// A detected column in the page layout.
#[derive(Debug, Clone)]
pub struct Column {
    /// Left boundary X coordinate
    pub left: f32,
    /// Right boundary X coordinate
    pub right: f32,
    /// Column index (0 = leftmost)
    pub index: usize,
}

impl Column {
    /// Check if an X coordinate falls within this column.
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    /// Check if a span belongs to this column (left edge or center inside).
    pub fn contains_span(&self, span: &TextSpan) -> bool {
        let center = span.x + span.width / 2.0;
        self.contains(span.x) || self.contains(center)
    }
}

/// Font statistics for separating body text from larger display text.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Body text font size (most common)
    pub body_size: f32,
    /// Observed font sizes (tenths of a point) with frequency
    pub size_histogram: HashMap<i32, usize>,
}

impl FontStatistics {
    /// Collect statistics over spans.
    pub fn from_spans<'s>(spans: impl IntoIterator<Item = &'s TextSpan>) -> Self {
        let mut stats = Self::default();
        for span in spans {
            stats.add_size(span.font_size);
        }
        stats.analyze();
        stats
    }

    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        let key = (size * 10.0).round() as i32;
        *self.size_histogram.entry(key).or_insert(0) += 1;
    }

    /// Calculate the body size. Ties go to the smaller size.
    pub fn analyze(&mut self) {
        let body = self
            .size_histogram
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
            .map(|(k, _)| *k as f32 / 10.0);
        self.body_size = body.unwrap_or(12.0);
    }

    /// Whether a size is noticeably larger than body text.
    pub fn is_heading_size(&self, font_size: f32) -> bool {
        font_size >= self.body_size + 1.5
    }
}

/// Layout analyzer turning page spans into text blocks.
pub struct LayoutAnalyzer {
    font_stats: FontStatistics,
}

impl LayoutAnalyzer {
    /// Create an analyzer using document-wide font statistics.
    pub fn new(font_stats: FontStatistics) -> Self {
        Self { font_stats }
    }

    /// Group a page's spans into blocks in reading order.
    pub fn analyze(&self, spans: Vec<TextSpan>) -> Vec<TextBlock> {
        let mut lines = self.group_spans_into_lines(spans);
        for line in &mut lines {
            line.is_heading = self.font_stats.is_heading_size(line.font_size);
        }
        self.group_lines_into_blocks(lines)
            .into_iter()
            .filter(|b| !b.is_empty())
            .collect()
    }

    /// Detect columns based on a vertical gutter.
    ///
    /// Returns one column for single-column pages and two otherwise, sorted
    /// left to right.
    pub fn detect_columns(&self, spans: &[TextSpan]) -> Vec<Column> {
        let Some((min_x, _, max_x, _)) = spans_extent(spans) else {
            return vec![];
        };
        let single = || {
            vec![Column {
                left: min_x - 10.0,
                right: max_x + 10.0,
                index: 0,
            }]
        };

        let page_width = max_x - min_x;
        if page_width < 250.0 {
            return single();
        }

        // Occupancy of thin vertical slices
        let slice_width = 3.0;
        let num_slices = (page_width / slice_width) as usize + 1;
        let mut occupancy = vec![0usize; num_slices];
        for span in spans {
            let start = ((span.x - min_x) / slice_width) as usize;
            let end = ((span.right() - min_x) / slice_width) as usize;
            for slot in occupancy
                .iter_mut()
                .take(end.min(num_slices - 1) + 1)
                .skip(start)
            {
                *slot += 1;
            }
        }

        // Empty runs in the middle 70% of the page
        let search_start = num_slices * 15 / 100;
        let search_end = num_slices * 85 / 100;
        let mut gaps: Vec<(usize, usize)> = Vec::new();
        let mut run_start = None;
        for (i, &count) in occupancy
            .iter()
            .enumerate()
            .take(search_end)
            .skip(search_start)
        {
            match (count, run_start) {
                (0, None) => run_start = Some(i),
                (0, Some(_)) => {}
                (_, Some(start)) => {
                    gaps.push((start, i - start));
                    run_start = None;
                }
                (_, None) => {}
            }
        }
        if let Some(start) = run_start {
            gaps.push((start, search_end.max(start) - start));
        }

        // Prefer wide gaps, then gaps near the center
        let page_center = num_slices as f32 / 2.0;
        let mut best: Option<(usize, usize, f32)> = None;
        for (start, len) in gaps {
            let width = len as f32 * slice_width;
            if width < 10.0 {
                continue;
            }
            let center_dist = (start as f32 + len as f32 / 2.0 - page_center).abs();
            let better = match best {
                None => true,
                Some((_, best_len, best_dist)) => {
                    let best_width = best_len as f32 * slice_width;
                    width > best_width * 1.5
                        || (width >= best_width * 0.7 && center_dist < best_dist)
                }
            };
            if better {
                best = Some((start, len, center_dist));
            }
        }

        let Some((gap_start, gap_len, _)) = best else {
            return single();
        };
        let gap_width = gap_len as f32 * slice_width;
        if gap_width < 12.0 {
            log::debug!("gutter too small ({:.1}pt), single column", gap_width);
            return single();
        }

        let gutter = min_x + (gap_start as f32 + gap_len as f32 / 2.0) * slice_width;
        if gutter - min_x < 80.0 || max_x - gutter < 80.0 {
            log::debug!("column too narrow, single column");
            return single();
        }

        let left_spans = spans
            .iter()
            .filter(|s| s.x + s.width / 2.0 < gutter)
            .count();
        let right_spans = spans.len() - left_spans;
        let min_spans = (spans.len() / 10).max(2);
        if left_spans < min_spans || right_spans < min_spans {
            log::debug!(
                "columns imbalanced ({} / {}), single column",
                left_spans,
                right_spans
            );
            return single();
        }

        log::debug!("two columns, gutter at x={:.1}", gutter);
        vec![
            Column {
                left: min_x - 10.0,
                right: gutter,
                index: 0,
            },
            Column {
                left: gutter,
                right: max_x + 10.0,
                index: 1,
            },
        ]
    }

    /// Group spans into lines, one column at a time.
    ///
    /// Lines of the left column come before lines of the right column.
    pub fn group_spans_into_lines(&self, spans: Vec<TextSpan>) -> Vec<TextLine> {
        let columns = self.detect_columns(&spans);
        if columns.len() <= 1 {
            return group_single_column(spans);
        }

        let mut column_spans: Vec<Vec<TextSpan>> = vec![Vec::new(); columns.len()];
        for span in spans {
            let idx = columns
                .iter()
                .position(|c| c.contains_span(&span))
                .unwrap_or(0);
            column_spans[idx].push(span);
        }

        column_spans
            .into_iter()
            .flat_map(group_single_column)
            .collect()
    }

    /// Group lines into blocks based on spacing, size and indentation.
    pub fn group_lines_into_blocks(&self, lines: Vec<TextLine>) -> Vec<TextBlock> {
        let avg_spacing = average_line_spacing(&lines);
        let mut blocks: Vec<TextBlock> = Vec::new();
        let mut current: Vec<TextLine> = Vec::new();

        for line in lines {
            let should_break = current
                .last()
                .is_some_and(|prev| self.should_break_block(prev, &line, avg_spacing));
            if should_break {
                blocks.push(TextBlock::new(std::mem::take(&mut current)));
            }
            current.push(line);
        }
        if !current.is_empty() {
            blocks.push(TextBlock::new(current));
        }

        blocks
    }

    /// Determine if a new block should start.
    fn should_break_block(&self, prev: &TextLine, curr: &TextLine, avg_spacing: f32) -> bool {
        // Display-size lines stand alone
        if curr.is_heading != prev.is_heading {
            return true;
        }

        // Moving up means a new column or region
        if curr.y > prev.y + 1.0 {
            return true;
        }

        let spacing = (prev.y - curr.y).abs();
        if spacing > avg_spacing * 1.5 {
            return true;
        }

        if (prev.font_size - curr.font_size).abs() > 1.0 {
            return true;
        }

        (prev.x - curr.x).abs() > 20.0
    }
}

/// Y-based line grouping for one column.
fn group_single_column(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    // Top to bottom, then left to right
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let y_tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= y_tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Average baseline distance between consecutive lines.
fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[0].y - w[1].y).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return 12.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

/// Check if a character belongs to a script written without word spaces.
///
/// Chinese and Japanese don't use spaces between words; Korean and
/// Vietnamese do.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF          // CJK Unified Ideographs
        | 0x3400..=0x4DBF        // Extension A
        | 0x20000..=0x2A6DF      // Extensions B-F
        | 0x2A700..=0x2EBEF
        | 0x3040..=0x309F        // Hiragana
        | 0x30A0..=0x30FF        // Katakana
        | 0x3000..=0x303F        // CJK Symbols and Punctuation
    )
}
