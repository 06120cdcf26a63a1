//! Positioned text extraction and line/paragraph grouping for PDF pages.

use std::cmp::Ordering;

use super::backend::{get_number_from_value, PageId, PdfSource, PdfValue};
use crate::error::Result;

/// Default leading when a content stream never sets `TL`.
const DEFAULT_LEADING: f32 = 12.0;

/// A text span with position and style information.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font resource name
    pub font_name: String,
}

impl TextSpan {
    /// Create a new text span. Width is estimated at half an em per character.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * font_size * 0.5;
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name: String::new(),
        }
    }

    /// Set the font resource name.
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self
    }
}

/// A text line composed of spans sharing a baseline.
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
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        if spans.is_empty() {
            return Self {
                spans,
                y: 0.0,
                x: 0.0,
                font_size: 0.0,
            };
        }

        spans.sort_by(|a, b| a.x.total_cmp(&b.x));

        // Dominant font size, weighted by text length
        let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
        let weighted: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.len() as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted / total_chars as f32
        } else {
            spans[0].font_size
        };

        Self {
            y: spans[0].y,
            x: spans[0].x,
            font_size,
            spans,
        }
    }

    /// Combined text of all spans, with spaces inserted at visual gaps.
    ///
    /// No space is inserted between two characters of a script that does not
    /// separate words with spaces.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - (prev.x + prev.width);

                let char_count = span.text.chars().count();
                let avg_char_width = if char_count > 0 && span.width > 0.0 {
                    span.width / char_count as f32
                } else {
                    span.font_size * 0.5
                };

                let spaceless = prev.text.chars().last().is_some_and(is_spaceless_script_char)
                    && span.text.chars().next().is_some_and(is_spaceless_script_char);
                let has_space = prev.text.ends_with(' ') || span.text.starts_with(' ');

                if gap > avg_char_width * 0.2 && !spaceless && !has_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }
}

/// Text state while walking a content stream.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    // Line matrix origin; Td/T* are relative to it
    line_e: f32,
    line_f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            line_e: 0.0,
            line_f: 0.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, m: [f32; 6]) {
        let [a, b, c, d, e, f] = m;
        *self = Self {
            a,
            b,
            c,
            d,
            e,
            f,
            line_e: e,
            line_f: f,
        };
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.line_e += tx * self.a + ty * self.c;
        self.line_f += tx * self.b + ty * self.d;
        self.e = self.line_e;
        self.f = self.line_f;
    }

    fn next_line(&mut self, leading: f32) {
        self.translate(0.0, -leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Extract positioned text spans from a page's content stream.
pub fn extract_spans<S: PdfSource + ?Sized>(source: &S, page: PageId) -> Result<Vec<TextSpan>> {
    let content = source.page_content(page)?;
    let ops = source.decode_content(&content)?;

    let mut spans = Vec::new();
    let mut font_name: Vec<u8> = Vec::new();
    let mut font_size: f32 = 12.0;
    let mut leading = DEFAULT_LEADING;
    let mut matrix = TextMatrix::default();
    let mut in_text = false;

    let decode = |font: &[u8], bytes: &[u8]| source.decode_text(page, font, bytes);

    for op in &ops {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(get_number_from_value);

        let text = match op.operator.as_str() {
            "BT" => {
                in_text = true;
                matrix = TextMatrix::default();
                None
            }
            "ET" => {
                in_text = false;
                None
            }
            "Tf" => {
                if let Some(PdfValue::Name(name)) = operands.first() {
                    font_name = name.clone();
                }
                font_size = num(1).unwrap_or(font_size);
                None
            }
            "TL" => {
                leading = num(0).unwrap_or(leading);
                None
            }
            "Td" => {
                matrix.translate(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0));
                None
            }
            "TD" => {
                let ty = num(1).unwrap_or(0.0);
                leading = -ty;
                matrix.translate(num(0).unwrap_or(0.0), ty);
                None
            }
            "Tm" => {
                if operands.len() >= 6 {
                    matrix.set([
                        num(0).unwrap_or(1.0),
                        num(1).unwrap_or(0.0),
                        num(2).unwrap_or(0.0),
                        num(3).unwrap_or(1.0),
                        num(4).unwrap_or(0.0),
                        num(5).unwrap_or(0.0),
                    ]);
                }
                None
            }
            "T*" => {
                matrix.next_line(leading);
                None
            }
            "Tj" if in_text => match operands.first() {
                Some(PdfValue::Str(bytes)) => Some(decode(&font_name, bytes)),
                _ => None,
            },
            "TJ" if in_text => match operands.first() {
                Some(PdfValue::Array(items)) => Some(decode_tj_array(items, |b| decode(&font_name, b))),
                _ => None,
            },
            "'" | "\"" => {
                matrix.next_line(leading);
                let idx = if op.operator == "\"" { 2 } else { 0 };
                match operands.get(idx) {
                    Some(PdfValue::Str(bytes)) if in_text => Some(decode(&font_name, bytes)),
                    _ => None,
                }
            }
            _ => None,
        };

        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            let (x, y) = matrix.position();
            let size = font_size * matrix.scale();
            spans.push(
                TextSpan::new(text, x, y, size).with_font(String::from_utf8_lossy(&font_name)),
            );
        }
    }

    Ok(spans)
}

/// Join the strings of a `TJ` array, turning large negative kerning into spaces.
fn decode_tj_array(items: &[PdfValue], decode: impl Fn(&[u8]) -> String) -> String {
    // 1/1000 text space units; ~a word space for most fonts
    const SPACE_THRESHOLD: f32 = 200.0;

    let mut combined = String::new();
    for item in items {
        match item {
            PdfValue::Str(bytes) => combined.push_str(&decode(bytes)),
            other => {
                let Some(n) = get_number_from_value(other) else {
                    continue;
                };
                let wants_space = -n > SPACE_THRESHOLD
                    && !combined.ends_with(' ')
                    && combined
                        .chars()
                        .last()
                        .is_some_and(|c| !is_spaceless_script_char(c));
                if wants_space {
                    combined.push(' ');
                }
            }
        }
    }
    combined
}

/// Group spans into lines by baseline, top to bottom.
pub fn group_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    // PDF Y grows upwards
    spans.sort_by(|a, b| match b.y.total_cmp(&a.y) {
        Ordering::Equal => a.x.total_cmp(&b.x),
        other => other,
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
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

/// A paragraph of page text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextParagraph {
    pub text: String,
    /// Baseline of the first line
    pub y: f32,
}

/// Group lines into paragraphs, breaking on vertical gaps, font size
/// changes and indentation changes. Lines inside a paragraph are joined with
/// a single space.
pub fn group_into_paragraphs(lines: &[TextLine]) -> Vec<TextParagraph> {
    let avg_spacing = average_line_spacing(lines);

    let mut paragraphs = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut top = 0.0;

    for (i, line) in lines.iter().enumerate() {
        if i > 0 && should_break(&lines[i - 1], line, avg_spacing) && !current.is_empty() {
            paragraphs.push(TextParagraph {
                text: std::mem::take(&mut current).join(" "),
                y: top,
            });
        }
        let text = line.text();
        let text = text.trim();
        if !text.is_empty() {
            if current.is_empty() {
                top = line.y;
            }
            current.push(text.to_string());
        }
    }
    if !current.is_empty() {
        paragraphs.push(TextParagraph {
            text: current.join(" "),
            y: top,
        });
    }

    paragraphs
}

fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[0].y - w[1].y).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return DEFAULT_LEADING;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

fn should_break(prev: &TextLine, curr: &TextLine, avg_spacing: f32) -> bool {
    let spacing = (prev.y - curr.y).abs();
    spacing > avg_spacing * 1.5
        || spacing > prev.font_size.max(curr.font_size) * 2.0
        || (prev.font_size - curr.font_size).abs() > 1.0
        || (prev.x - curr.x).abs() > 20.0
}

/// Split fallback plain text into paragraphs on blank lines.
pub fn split_plain_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
}

/// Check if a character belongs to a script that does not use word spaces.
/// Chinese and Japanese do; Korean uses spaces like English.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        // Hiragana, Katakana
        || (0x3040..=0x30FF).contains(&code)
        // CJK symbols and punctuation
        || (0x3000..=0x303F).contains(&code)
}
