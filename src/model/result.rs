//! The value handed to presentation layers after a conversion.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::render::reader::read_markdown;
use crate::render::{full_text, ExtractionStats};

use super::{ContentBlock, DocumentMetadata, OutlineNode, OutlineTree};

/// Result of converting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Flat outline (headings or bookmarks)
    pub outline: Vec<OutlineNode>,

    /// Heading and paragraph text in order, one `\n` after each
    pub full_text: String,

    /// Location of the persisted Markdown file
    pub markdown_path: PathBuf,

    /// Image paths relative to the Markdown file, in Markdown order
    pub image_files: Vec<String>,

    /// Source metadata
    pub metadata: DocumentMetadata,

    /// Extraction statistics
    pub stats: ExtractionStats,
}

impl ConversionResult {
    /// Hierarchical outline for tree views.
    pub fn outline_tree(&self) -> OutlineTree {
        OutlineTree::build(&self.outline)
    }

    /// Rebuild outline, full text and image list from a persisted Markdown file.
    ///
    /// The outline comes from the frontmatter when present, otherwise from
    /// the heading lines. Metadata and statistics are not stored in the file
    /// and come back as defaults.
    pub fn reload<P: AsRef<Path>>(markdown_path: P) -> Result<Self> {
        let markdown_path = markdown_path.as_ref();
        let text = fs::read_to_string(markdown_path)?;
        let parsed = read_markdown(&text);

        let outline = parsed
            .outline
            .unwrap_or_else(|| headings_outline(&parsed.blocks));

        Ok(Self {
            outline,
            full_text: full_text(&parsed.blocks),
            markdown_path: markdown_path.to_path_buf(),
            image_files: image_files(&parsed.blocks),
            metadata: DocumentMetadata::default(),
            stats: ExtractionStats::default(),
        })
    }

    /// Read the Markdown file this result points to.
    pub fn read_markdown(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.markdown_path)?)
    }
}

/// Outline derived from heading blocks.
pub fn headings_outline(blocks: &[ContentBlock]) -> Vec<OutlineNode> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Heading { level, text } => {
                Some(OutlineNode::new(u32::from(level.get()), text.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Relative paths of persisted image references, in block order.
pub fn image_files(blocks: &[ContentBlock]) -> Vec<String> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Image { image } => image.relative_path().map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HeadingLevel, ImageRef};

    #[test]
    fn test_headings_outline() {
        let blocks = vec![
            ContentBlock::heading(HeadingLevel::new(1).unwrap(), "Intro"),
            ContentBlock::paragraph("text"),
            ContentBlock::heading(HeadingLevel::new(3).unwrap(), "Deep"),
        ];
        assert_eq!(
            headings_outline(&blocks),
            vec![OutlineNode::new(1, "Intro"), OutlineNode::new(3, "Deep")]
        );
    }

    #[test]
    fn test_image_files_skip_pending() {
        let blocks = vec![
            ContentBlock::Image {
                image: ImageRef::persisted("image_1", "images/a_image1.png"),
            },
            ContentBlock::pending_image(crate::model::AssetId(9)),
        ];
        assert_eq!(image_files(&blocks), vec!["images/a_image1.png"]);
    }

    #[test]
    fn test_reload_from_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(
            &path,
            "# Intro\n\nHello world.\n\n![image_1](images/doc_image1.png)\n",
        )
        .unwrap();

        let result = ConversionResult::reload(&path).unwrap();
        assert_eq!(result.outline, vec![OutlineNode::new(1, "Intro")]);
        assert_eq!(result.full_text, "Intro\nHello world.\n");
        assert_eq!(result.image_files, vec!["images/doc_image1.png"]);
        assert_eq!(result.outline_tree().roots.len(), 1);
    }
}
