//! Table detection from text positions (stream-mode alignment analysis).
//!
//! Tables are found without ruling lines: rows are spans sharing a
//! baseline, columns are left edges that line up across several rows.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::model::TableBlock;

use super::layout::TextSpan;

/// Bucket width for grouping left edges (points).
const EDGE_BUCKET: f32 = 5.0;

/// A detected table region with its content.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Y of the first row (top, in PDF coordinates)
    pub top_y: f32,
    /// Y of the last row
    pub bottom_y: f32,
    /// Right X boundary
    pub right_x: f32,
    /// Column left edges
    pub columns: Vec<f32>,
    /// Rows of spans, top to bottom
    pub rows: Vec<TableRowData>,
}

/// A row of text spans in a table.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Average baseline of the row
    pub y: f32,
    /// Spans in this row, sorted by X
    pub spans: Vec<TextSpan>,
    /// Indices of the spans in the detector input
    indices: Vec<usize>,
}

/// Table detector configuration.
#[derive(Debug, Clone)]
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
        }
    }
}

/// Detects tables in a list of text spans.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

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
    /// Returns detected tables (top to bottom) and the spans that were not
    /// part of any table, in their original order.
    pub fn detect(&self, spans: Vec<TextSpan>) -> (Vec<DetectedTable>, Vec<TextSpan>) {
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

        let mut tables = Vec::new();
        let mut used: HashSet<usize> = HashSet::new();

        for (start, end) in self.find_table_regions(&rows, &columns) {
            let table_rows = rows[start..=end].to_vec();

            // Columns specific to this region
            let table_columns = self.detect_columns(&table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region with {} columns",
                    table_columns.len()
                );
                continue;
            }
            if self.is_list_pattern(&table_rows, &table_columns) {
                log::debug!("TableDetector: skipping region that looks like a list");
                continue;
            }

            used.extend(table_rows.iter().flat_map(|r| r.indices.iter().copied()));

            let right_x = table_rows
                .iter()
                .flat_map(|r| r.spans.iter())
                .map(|s| s.x + s.width)
                .fold(f32::MIN, f32::max);

            tables.push(DetectedTable {
                top_y: table_rows[0].y,
                bottom_y: table_rows[table_rows.len() - 1].y,
                right_x,
                columns: table_columns,
                rows: table_rows,
            });
        }

        let remaining = spans
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(_, span)| span)
            .collect();

        (tables, remaining)
    }

    /// Convert a detected table to a block; first row is the header.
    pub fn to_table_block(&self, detected: &DetectedTable) -> TableBlock {
        let columns = &detected.columns;

        let rows = detected
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
                for span in &row.spans {
                    let col = find_column_for_span(span.x, columns, detected.right_x);
                    if let Some(cell) = cells.get_mut(col) {
                        cell.push(span.text.trim());
                    }
                }
                cells.into_iter().map(|parts| parts.join(" ")).collect()
            })
            .collect();

        TableBlock::new(rows)
    }

    /// Group spans into rows by Y position.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<TableRowData> {
        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by(|&a, &b| match spans[b].y.total_cmp(&spans[a].y) {
            Ordering::Equal => spans[a].x.total_cmp(&spans[b].x),
            other => other,
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut current_y: Option<f32> = None;

        let finish = |indices: Vec<usize>, rows: &mut Vec<TableRowData>| {
            let y = indices.iter().map(|&i| spans[i].y).sum::<f32>() / indices.len() as f32;
            rows.push(TableRowData {
                y,
                spans: indices.iter().map(|&i| spans[i].clone()).collect(),
                indices,
            });
        };

        for idx in order {
            let span = &spans[idx];
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(idx),
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

    /// Detect column left edges shared by several rows.
    ///
    /// Rows with at least two spans are the evidence; when too few exist,
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

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &evidence {
            // Count each bucket once per row
            let buckets: HashSet<i32> = row
                .spans
                .iter()
                .map(|s| (s.x / EDGE_BUCKET).round() as i32)
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
            .map(|(bucket, _)| *bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(f32::total_cmp);

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Find contiguous row ranges whose spans align with the columns.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            if alignment_score(row, columns) >= self.config.min_alignment_ratio {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                if i - s >= self.config.min_rows {
                    regions.push((s, i - 1));
                }
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }

    /// Check if rows are really a bulleted or numbered list.
    ///
    /// List markers and their text often land in separate spans at two
    /// X positions, which looks like a two-column table.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            let first = row.spans.iter().min_by(|a, b| a.x.total_cmp(&b.x));
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
        let total_ratio = (bullets + numbers) as f32 / rows.len() as f32;

        bullet_ratio >= 0.5 || (columns.len() == 2 && total_ratio >= 0.5)
    }
}

/// Share of a row's spans sitting on a column edge. Single-span rows never
/// count, so prose lines above and below a table stay out of it.
fn alignment_score(row: &TableRowData, columns: &[f32]) -> f32 {
    if row.spans.len() < 2 || columns.is_empty() {
        return 0.0;
    }
    let aligned = row
        .spans
        .iter()
        .filter(|span| columns.iter().any(|col| (span.x - col).abs() <= EDGE_BUCKET))
        .count();
    aligned as f32 / row.spans.len() as f32
}

/// Column index for a span's left edge; 10pt of slack before each edge.
fn find_column_for_span(span_x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if span_x >= start - 10.0 && span_x < end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (span_x - **a).abs().total_cmp(&(span_x - **b).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "▹" | "►" | "■" | "●" | "※"
            | "□" | "◆" | "◇" | "▶" | "▷" | "☞" | "➤" | "➜"
    )
}

/// Numbered markers need punctuation ("1.", "2)", "a."); a bare number is
/// ordinary cell data.
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(last) = cleaned.chars().last() else {
        return false;
    };
    if last != '.' && last != ')' {
        return false;
    }
    let body = &cleaned[..cleaned.len() - 1];

    let all_digits = !body.is_empty() && body.chars().all(|c| c.is_ascii_digit());
    let single_letter = body.chars().count() == 1 && body.chars().all(char::is_alphabetic);
    all_digits || single_letter
}
