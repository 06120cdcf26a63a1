//! Document metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detect::DocumentFormat;

use super::OutlineNode;

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source format
    pub format: Option<DocumentFormat>,

    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,

    /// Total number of pages (PDF only)
    pub page_count: Option<u32>,
}

impl DocumentMetadata {
    /// Create metadata for a format.
    pub fn for_format(format: DocumentFormat) -> Self {
        Self {
            format: Some(format),
            ..Default::default()
        }
    }

    /// Convert metadata (and optionally an outline) to YAML frontmatter.
    pub fn to_yaml_frontmatter(&self, outline: Option<&[OutlineNode]>) -> String {
        let mut lines = vec!["---".to_string()];

        if let Some(ref title) = self.title {
            lines.push(format!("title: \"{}\"", escape_yaml(title)));
        }
        if let Some(ref author) = self.author {
            lines.push(format!("author: \"{}\"", escape_yaml(author)));
        }
        if let Some(ref created) = self.created {
            lines.push(format!("created: {}", created.to_rfc3339()));
        }
        if let Some(ref modified) = self.modified {
            lines.push(format!("modified: {}", modified.to_rfc3339()));
        }
        if let Some(format) = self.format {
            lines.push(format!("format: {}", format));
        }
        if let Some(pages) = self.page_count {
            lines.push(format!("pages: {}", pages));
        }

        if let Some(outline) = outline.filter(|o| !o.is_empty()) {
            lines.push("outline:".to_string());
            for node in outline {
                lines.push(format!("  - level: {}", node.level));
                lines.push(format!("    title: \"{}\"", escape_yaml(&node.title)));
            }
        }

        lines.push("---".to_string());
        lines.join("\n")
    }
}

/// Escape special characters for YAML strings.
pub(crate) fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Reverse of [`escape_yaml`].
pub(crate) fn unescape_yaml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
