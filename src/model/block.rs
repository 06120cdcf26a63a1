//! Content blocks: the ordered, classified units of a document.

use serde::{Deserialize, Serialize};

use super::AssetId;

/// Heading level in the range 1..=9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Smallest heading level.
    pub const MIN: u8 = 1;
    /// Largest heading level.
    pub const MAX: u8 = 9;

    /// Create a heading level, or `None` when outside 1..=9.
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    /// The numeric level.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        HeadingLevel::new(value).ok_or_else(|| format!("heading level {} out of range", value))
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

/// A reference to an image asset.
///
/// Adapters emit `Pending` placeholders; the orchestrator swaps them for
/// `Persisted` references once the asset store has written the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRef {
    /// Not yet persisted; keyed by the adapter's asset id.
    Pending(AssetId),
    /// Persisted on disk; `relative_path` is relative to the Markdown file.
    Persisted {
        display_name: String,
        relative_path: String,
    },
}

impl ImageRef {
    /// Create a persisted reference.
    pub fn persisted(display_name: impl Into<String>, relative_path: impl Into<String>) -> Self {
        ImageRef::Persisted {
            display_name: display_name.into(),
            relative_path: relative_path.into(),
        }
    }

    /// Relative path of a persisted reference.
    pub fn relative_path(&self) -> Option<&str> {
        match self {
            ImageRef::Persisted { relative_path, .. } => Some(relative_path),
            ImageRef::Pending(_) => None,
        }
    }
}

/// A table block. The first row is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    /// Rows of cell text, row-major
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    /// Create a table from rows.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Create a table from anything yielding rows of string-like cells.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// The header row, if any.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// Data rows (everything after the header).
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Number of columns, defined by the header row.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows padded with empty cells or truncated to the header width.
    pub fn normalized_rows(&self) -> Vec<Vec<String>> {
        let width = self.column_count();
        self.rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = row.iter().take(width).cloned().collect();
                cells.resize(width, String::new());
                cells
            })
            .collect()
    }
}

/// One classified unit of document content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A heading with its level
    Heading { level: HeadingLevel, text: String },
    /// A plain paragraph
    Paragraph { text: String },
    /// A table (first row = header)
    Table(TableBlock),
    /// An image reference
    Image { image: ImageRef },
    /// An explicit empty line kept for spacing fidelity
    Blank,
}

/// Join the non-empty lines of `text` with single spaces.
///
/// An ATX heading ends at the first line break, so heading text must be one line.
pub fn single_line(text: &str) -> String {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl ContentBlock {
    /// Create a heading block. Line breaks in `text` become spaces.
    pub fn heading(level: HeadingLevel, text: impl Into<String>) -> Self {
        ContentBlock::Heading {
            level,
            text: single_line(&text.into()),
        }
    }

    /// Create a paragraph block.
    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentBlock::Paragraph { text: text.into() }
    }

    /// Create a pending image block.
    pub fn pending_image(id: AssetId) -> Self {
        ContentBlock::Image {
            image: ImageRef::Pending(id),
        }
    }

    /// Text contributed to the document's full text (headings and paragraphs).
    pub fn text(&self) -> Option<&str> {
        match self {
            ContentBlock::Heading { text, .. } | ContentBlock::Paragraph { text } => Some(text),
            _ => None,
        }
    }

    /// Check if this is the blank marker.
    pub fn is_blank(&self) -> bool {
        matches!(self, ContentBlock::Blank)
    }
}
