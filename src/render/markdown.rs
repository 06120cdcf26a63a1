//! Markdown rendering for block sequences.

use crate::error::{Error, Result};
use crate::model::{single_line, ContentBlock, DocumentMetadata, ImageRef, OutlineNode, TableBlock};

use super::RenderOptions;

/// Render blocks to Markdown with default options.
///
/// When `outline` is given it is written into a YAML frontmatter block so it
/// survives in the file.
pub fn render(blocks: &[ContentBlock], outline: Option<&[OutlineNode]>) -> Result<String> {
    MarkdownRenderer::default().render(blocks, outline)
}

/// Markdown renderer.
///
/// Rendering is pure: the same blocks and options always produce the same
/// string.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render blocks to Markdown.
    ///
    /// Fails with [`Error::Render`] if an image reference was never persisted.
    pub fn render(&self, blocks: &[ContentBlock], outline: Option<&[OutlineNode]>) -> Result<String> {
        let mut output = String::new();

        if let Some(frontmatter) = self.frontmatter(outline) {
            output.push_str(&frontmatter);
            output.push_str("\n\n");
        }

        let start = blocks.iter().position(|b| !b.is_blank()).unwrap_or(blocks.len());
        let end = blocks
            .iter()
            .rposition(|b| !b.is_blank())
            .map_or(start, |i| i + 1);

        let mut first = true;
        let mut blanks = 0usize;
        for block in &blocks[start..end] {
            if block.is_blank() {
                blanks += 1;
                continue;
            }

            let Some(rendered) = self.render_block(block)? else {
                continue;
            };

            if !first {
                output.push_str("\n\n");
            }
            for _ in 0..blanks {
                output.push('\n');
            }
            blanks = 0;
            output.push_str(&rendered);
            first = false;
        }

        if !output.is_empty() {
            while output.ends_with('\n') {
                output.pop();
            }
            output.push('\n');
        }

        Ok(output)
    }

    fn frontmatter(&self, outline: Option<&[OutlineNode]>) -> Option<String> {
        let outline = outline
            .filter(|o| self.options.embed_outline && !o.is_empty());

        if self.options.include_frontmatter {
            let metadata = self.options.metadata.clone().unwrap_or_default();
            return Some(metadata.to_yaml_frontmatter(outline));
        }

        outline.map(|o| DocumentMetadata::default().to_yaml_frontmatter(Some(o)))
    }

    fn render_block(&self, block: &ContentBlock) -> Result<Option<String>> {
        let rendered = match block {
            ContentBlock::Heading { level, text } => {
                let level = level.get().min(self.options.max_heading_level);
                Some(format!("{} {}", "#".repeat(level as usize), single_line(text)))
            }
            ContentBlock::Paragraph { text } => Some(text.clone()),
            ContentBlock::Table(table) => render_table(table),
            ContentBlock::Image { image } => Some(render_image(image)?),
            ContentBlock::Blank => None,
        };
        Ok(rendered)
    }
}

fn render_table(table: &TableBlock) -> Option<String> {
    let width = table.column_count();
    if table.is_empty() || width == 0 {
        return None;
    }

    let rows = table.normalized_rows();
    let mut lines = Vec::with_capacity(rows.len() + 1);

    for (i, row) in rows.iter().enumerate() {
        let mut line = String::from("|");
        for cell in row {
            line.push_str(&escape_cell(cell));
            line.push('|');
        }
        lines.push(line);

        // Separator after the header row
        if i == 0 {
            lines.push(format!("|{}", "---|".repeat(width)));
        }
    }

    Some(lines.join("\n"))
}

fn render_image(image: &ImageRef) -> Result<String> {
    match image {
        ImageRef::Persisted {
            display_name,
            relative_path,
        } => Ok(format!(
            "![{}]({})",
            escape_alt(display_name),
            link_destination(relative_path)
        )),
        ImageRef::Pending(id) => Err(Error::Render(format!(
            "image {} was never persisted",
            id
        ))),
    }
}

/// Escape a table cell: pipes are escaped, line breaks become spaces.
fn escape_cell(cell: &str) -> String {
    let mut result = String::with_capacity(cell.len());
    for c in cell.trim().chars() {
        match c {
            '|' => result.push_str("\\|"),
            '\r' => {}
            '\n' => result.push(' '),
            _ => result.push(c),
        }
    }
    result
}

fn escape_alt(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '\\') {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Wrap destinations containing spaces or parentheses in angle brackets.
fn link_destination(path: &str) -> String {
    if path.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{}>", path)
    } else {
        path.to_string()
    }
}
