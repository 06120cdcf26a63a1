//! Rendering options and configuration.

use crate::model::DocumentMetadata;

/// Options for rendering a block sequence to Markdown.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Include YAML frontmatter with metadata
    pub include_frontmatter: bool,

    /// Write a supplied outline into the frontmatter even when metadata is off
    pub embed_outline: bool,

    /// Metadata written to the frontmatter
    pub metadata: Option<DocumentMetadata>,

    /// Maximum heading level (1-9); deeper headings are clamped
    pub max_heading_level: u8,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable frontmatter.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Enable or disable writing the outline into the frontmatter.
    pub fn with_embedded_outline(mut self, embed: bool) -> Self {
        self.embed_outline = embed;
        self
    }

    /// Set the metadata written to the frontmatter.
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the maximum heading level.
    pub fn with_max_heading(mut self, level: u8) -> Self {
        self.max_heading_level = level.clamp(1, 9);
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_frontmatter: false,
            embed_outline: true,
            metadata: None,
            max_heading_level: 9,
        }
    }
}
