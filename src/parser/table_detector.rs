//! Table detection using text position analysis (Stream mode algorithm).
//!
//! Inspired by Camelot's Stream mode, this module detects tables by analyzing
//! text alignment patterns without relying on graphical lines.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::model::TableGrid;

use super::layout::{spans_extent, PdfRect, TextSpan};

/// A detected table region with its content.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Extent in PDF user space
    pub extent: PdfRect,
    /// Detected column start positions (X coordinates)
    pub columns: Vec<f32>,
    /// Rows of text spans, top to bottom
    pub rows: Vec<TableRowData>,
}

/// A row of text spans in a table.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Y position of this row
    pub y: f32,
    /// Spans in this row, sorted by X
    pub spans: Vec<TextSpan>,
    /// Indices of the spans in the detector's input
    members: Vec<usize>,
}

impl TableRowData {
    fn font_size(&self) -> f32 {
        if self.spans.is_empty() {
            return 0.0;
        }
        self.spans.iter().map(|s| s.font_size).sum::<f32>() / self.spans.len() as f32
    }
}

/// Table detector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
    /// Vertical gap between rows that ends a table (multiple of font size)
    pub max_row_gap_factor: f32,
    /// Average share of the table width covered by text above which a
    /// region reads as prose columns rather than a table
    pub max_fill_ratio: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            max_row_gap_factor: 2.5,
            max_fill_ratio: 0.85,
        }
    }
}

/// Detects tables in a list of text spans.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

/// Alignment tolerance between a span's left edge and a column start.
const ALIGN_TOLERANCE: f32 = 5.0;
/// X positions are bucketed at this granularity when looking for columns.
const BUCKET_SIZE: f32 = 5.0;

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables in the given spans.
    ///
    /// Returns detected tables, top to bottom, and the spans that were NOT
    /// part of any table in their original order.
    pub fn detect(&self, spans: Vec<TextSpan>) -> (Vec<DetectedTable>, Vec<TextSpan>) {
        log::debug!("TableDetector: starting with {} spans", spans.len());

        if spans.len() < self.config.min_rows * self.config.min_columns {
            return (vec![], spans);
        }

        let rows = self.group_into_rows(&spans);
        if rows.len() < self.config.min_rows {
            return (vec![], spans);
        }

        let columns = self.detect_columns(&rows);
        log::debug!(
            "TableDetector: {} rows, columns at {:?}",
            rows.len(),
            columns
        );
        if columns.len() < self.config.min_columns {
            return (vec![], spans);
        }

        let regions = self.find_table_regions(&rows, &columns);
        log::debug!("TableDetector: found {} table regions", regions.len());

        let mut tables = Vec::new();
        let mut used: HashSet<usize> = HashSet::new();

        for (start, end) in regions {
            let table_rows = rows[start..=end].to_vec();

            // Columns of this region alone
            let table_columns = self.detect_columns(&table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region, too many columns ({} > {})",
                    table_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(&table_rows, &table_columns) {
                log::debug!("TableDetector: skipping region, list pattern");
                continue;
            }

            let Some(extent) = spans_extent(table_rows.iter().flat_map(|r| &r.spans)) else {
                continue;
            };
            if self.is_prose(&table_rows, extent) {
                log::debug!("TableDetector: skipping region, dense prose");
                continue;
            }

            used.extend(table_rows.iter().flat_map(|r| r.members.iter().copied()));
            tables.push(DetectedTable {
                extent,
                columns: table_columns,
                rows: table_rows,
            });
        }

        let unused = spans
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(_, span)| span)
            .collect();

        (tables, unused)
    }

    /// Group spans into rows by Y position, top to bottom.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<TableRowData> {
        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (&spans[a], &spans[b]);
            b.y.partial_cmp(&a.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut current_y: Option<f32> = None;

        let finish = |members: Vec<usize>, rows: &mut Vec<TableRowData>| {
            let row_spans: Vec<TextSpan> = members.iter().map(|&i| spans[i].clone()).collect();
            let y = row_spans.iter().map(|s| s.y).sum::<f32>() / row_spans.len() as f32;
            rows.push(TableRowData {
                y,
                spans: row_spans,
                members,
            });
        };

        for idx in order {
            let span = &spans[idx];
            let y_tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= y_tolerance => current.push(idx),
                _ => {
                    if !current.is_empty() {
                        finish(std::mem::take(&mut current), &mut rows);
                    }
                    current_y = Some(span.y);
                    current.push(idx);
                }
            }
        }
        if !current.is_empty() {
            finish(current, &mut rows);
        }

        rows
    }

    /// Detect column start positions from left edges that align across rows.
    ///
    /// Rows with two or more spans are the evidence; when too few exist,
    /// every row counts.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let multi: Vec<&TableRowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        let evidence: Vec<&TableRowData> = if multi.len() >= self.config.min_rows {
            multi
        } else {
            rows.iter().collect()
        };
        if evidence.is_empty() {
            return vec![];
        }

        // Count each bucket at most once per row
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &evidence {
            let buckets: HashSet<i32> = row
                .spans
                .iter()
                .map(|s| (s.x / BUCKET_SIZE).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((evidence.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * BUCKET_SIZE)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Find contiguous row ranges that form tables.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        let close = |start: Option<usize>, end: usize, regions: &mut Vec<(usize, usize)>| {
            if let Some(s) = start {
                if end + 1 - s >= self.config.min_rows {
                    regions.push((s, end));
                }
            }
        };

        for (i, row) in rows.iter().enumerate() {
            let aligned =
                self.calculate_alignment_score(row, columns) >= self.config.min_alignment_ratio;

            // A wide vertical gap ends the current table
            if start.is_some() && i > 0 {
                let prev = &rows[i - 1];
                let size = prev.font_size().max(row.font_size()).max(1.0);
                if prev.y - row.y > size * self.config.max_row_gap_factor {
                    close(start, i - 1, &mut regions);
                    start = None;
                }
            }

            if aligned {
                start.get_or_insert(i);
            } else if start.is_some() {
                close(start, i - 1, &mut regions);
                start = None;
            }
        }
        if !rows.is_empty() {
            close(start, rows.len() - 1, &mut regions);
        }

        regions
    }

    /// Share of a row's spans that start on a column edge.
    ///
    /// Single-span rows score zero: a table row has at least two cells.
    fn calculate_alignment_score(&self, row: &TableRowData, columns: &[f32]) -> f32 {
        if row.spans.len() < 2 || columns.is_empty() {
            return 0.0;
        }

        let aligned = row
            .spans
            .iter()
            .filter(|span| {
                columns
                    .iter()
                    .any(|col| (span.x - col).abs() <= ALIGN_TOLERANCE)
            })
            .count();

        aligned as f32 / row.spans.len() as f32
    }

    /// Whether text covers most of the region's width in a typical row.
    fn is_prose(&self, rows: &[TableRowData], extent: PdfRect) -> bool {
        let width = extent.2 - extent.0;
        if width <= 0.0 || rows.is_empty() {
            return false;
        }
        let fill: f32 = rows
            .iter()
            .map(|r| r.spans.iter().map(|s| s.width).sum::<f32>() / width)
            .sum::<f32>()
            / rows.len() as f32;
        fill > self.config.max_fill_ratio
    }

    /// Convert a detected table into a grid of cells.
    pub fn to_grid(&self, detected: &DetectedTable) -> Option<TableGrid> {
        let columns = &detected.columns;
        let right_x = detected.extent.2;

        let rows = detected
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
                for span in &row.spans {
                    let idx = find_column_for_span(span.x, columns, right_x);
                    if let Some(cell) = cells.get_mut(idx) {
                        cell.push(span.text.trim());
                    }
                }
                cells
                    .into_iter()
                    .map(|parts| {
                        let text = parts
                            .into_iter()
                            .filter(|p| !p.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ");
                        (!text.is_empty()).then_some(text)
                    })
                    .collect()
            })
            .collect();

        TableGrid::new(rows)
    }

    /// Check if detected table rows actually represent a numbered or bulleted list.
    ///
    /// A list like "1. Item" often yields the marker and the text as separate
    /// spans at different X positions, which looks like a two-column table.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            let first = row
                .spans
                .iter()
                .min_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
            if let Some(span) = first {
                let text = span.text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let marker_ratio = (bullets + numbers) as f32 / rows.len() as f32;
        log::debug!(
            "TableDetector: list markers bullets={} numbers={} rows={}",
            bullets,
            numbers,
            rows.len()
        );

        // Numbered first columns are common in real tables, so numbers only
        // count against two-column regions.
        bullet_ratio >= 0.5 || (columns.len() == 2 && marker_ratio >= 0.5)
    }
}

/// Find which column a span belongs to based on its left edge.
fn find_column_for_span(span_x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &col_start) in columns.iter().enumerate() {
        let col_end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        // 10pt slack for spans starting slightly before the column
        if span_x >= col_start - 10.0 && span_x < col_end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (span_x - **a)
                .abs()
                .partial_cmp(&(span_x - **b).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Check if text is a bullet marker (•, -, etc.).
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    // "1.", "12.", "1)"
    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    // "a.", "B)"
    let mut chars = cleaned.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.' | ')'), None) if c.is_alphabetic()
    )
}
