//! Extraction statistics.

use serde::{Deserialize, Serialize};

use crate::model::ContentBlock;

/// Statistics collected during extraction, persistence and rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Total number of pages processed (PDF only)
    pub page_count: u32,

    /// Number of headings
    pub heading_count: u32,

    /// Number of body paragraphs
    pub paragraph_count: u32,

    /// Number of tables
    pub table_count: u32,

    /// Number of image references
    pub image_count: u32,

    /// Number of blank markers
    pub blank_count: u32,

    /// Images an adapter could not decode and left out
    pub skipped_images: u32,

    /// Images re-encoded as PNG by the asset store
    pub transcoded_images: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Character count (excluding whitespace)
    pub char_count: u32,
}

impl ExtractionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count block kinds and text in a block sequence.
    pub fn from_blocks(blocks: &[ContentBlock]) -> Self {
        let mut stats = Self::new();
        for block in blocks {
            stats.add_block(block);
        }
        stats
    }

    /// Account for one block.
    pub fn add_block(&mut self, block: &ContentBlock) {
        match block {
            ContentBlock::Heading { text, .. } => {
                self.heading_count += 1;
                self.count_text(text);
            }
            ContentBlock::Paragraph { text } => {
                self.paragraph_count += 1;
                self.count_text(text);
            }
            ContentBlock::Table(table) => {
                self.table_count += 1;
                for cell in table.rows.iter().flatten() {
                    self.count_text(cell);
                }
            }
            ContentBlock::Image { .. } => self.image_count += 1,
            ContentBlock::Blank => self.blank_count += 1,
        }
    }

    /// Add word and character counts from text.
    pub fn count_text(&mut self, text: &str) {
        self.word_count += text.split_whitespace().count() as u32;
        self.char_count += text.chars().filter(|c| !c.is_whitespace()).count() as u32;
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.page_count += other.page_count;
        self.heading_count += other.heading_count;
        self.paragraph_count += other.paragraph_count;
        self.table_count += other.table_count;
        self.image_count += other.image_count;
        self.blank_count += other.blank_count;
        self.skipped_images += other.skipped_images;
        self.transcoded_images += other.transcoded_images;
        self.word_count += other.word_count;
        self.char_count += other.char_count;
    }
}
