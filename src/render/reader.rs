//! Reads rendered Markdown back into blocks.
//!
//! Only the constructs the renderer emits are recognized: a leading YAML
//! frontmatter block, ATX headings, pipe tables, image lines and paragraphs.
//! A paragraph whose text itself starts with `#` or `|` reads back as a
//! heading or table.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::{unescape_yaml, ContentBlock, HeadingLevel, ImageRef, OutlineNode, TableBlock};

/// Markdown parsed back into its parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMarkdown {
    /// Outline stored in the frontmatter, if the file has one
    pub outline: Option<Vec<OutlineNode>>,

    /// Blocks in file order
    pub blocks: Vec<ContentBlock>,
}

struct Patterns {
    heading: Regex,
    image: Regex,
    separator: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                heading: Regex::new(r"^(#{1,9}) (.*)$").ok()?,
                image: Regex::new(r"^!\[((?:\\.|[^\]\\])*)\]\((<[^>]*>|[^)\s]*)\)$").ok()?,
                separator: Regex::new(r"^\|(?:-{3,}\|)+$").ok()?,
            })
        })
        .as_ref()
}

/// Parse Markdown produced by the renderer.
pub fn read_markdown(text: &str) -> ParsedMarkdown {
    let text = text.replace("\r\n", "\n");
    let (outline, body) = split_frontmatter(&text);

    let mut blocks = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();
    let mut empty_run = 0usize;

    for line in body.lines() {
        if line.trim().is_empty() {
            if !chunk.is_empty() {
                blocks.push(classify_chunk(&chunk));
                chunk.clear();
            }
            empty_run += 1;
            continue;
        }

        if chunk.is_empty() && !blocks.is_empty() {
            // One empty line is the separator; every extra one is a blank marker.
            for _ in 1..empty_run {
                blocks.push(ContentBlock::Blank);
            }
        }
        empty_run = 0;
        chunk.push(line);
    }
    if !chunk.is_empty() {
        blocks.push(classify_chunk(&chunk));
    }

    ParsedMarkdown { outline, blocks }
}

fn split_frontmatter(text: &str) -> (Option<Vec<OutlineNode>>, &str) {
    let Some(rest) = text.strip_prefix("---\n") else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (parse_outline(header), body);
        }
        offset += line.len();
    }

    (None, text)
}

fn parse_outline(header: &str) -> Option<Vec<OutlineNode>> {
    let mut lines = header.lines().skip_while(|line| *line != "outline:");
    lines.next()?;

    let mut outline = Vec::new();
    let mut level: Option<u32> = None;
    for line in lines {
        if let Some(value) = line.strip_prefix("  - level: ") {
            level = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix("    title: ") {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            if let Some(level) = level.take() {
                outline.push(OutlineNode::new(level, unescape_yaml(value)));
            }
        } else if !line.starts_with(' ') {
            break;
        }
    }

    Some(outline)
}

fn classify_chunk(lines: &[&str]) -> ContentBlock {
    let joined = lines.join("\n");
    let Some(p) = patterns() else {
        return ContentBlock::paragraph(joined);
    };

    if let [line] = lines {
        if let Some(caps) = p.heading.captures(line) {
            if let Some(level) = HeadingLevel::new(caps[1].len() as u8) {
                return ContentBlock::heading(level, &caps[2]);
            }
        }
        if let Some(caps) = p.image.captures(line) {
            let alt = unescape_backslashes(&caps[1]);
            let dest = &caps[2];
            let dest = dest
                .strip_prefix('<')
                .and_then(|d| d.strip_suffix('>'))
                .unwrap_or(dest);
            return ContentBlock::Image {
                image: ImageRef::persisted(alt, dest),
            };
        }
    }

    let is_table = lines.len() >= 2
        && p.separator.is_match(lines[1])
        && lines.iter().all(|l| l.starts_with('|') && l.ends_with('|'));
    if is_table {
        let rows = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, line)| split_row(line))
            .collect();
        return ContentBlock::Table(TableBlock::new(rows));
    }

    ContentBlock::paragraph(joined)
}

/// Split `|a|b\|c|` into `["a", "b|c"]`.
fn split_row(line: &str) -> Vec<String> {
    let inner = line
        .strip_prefix('|')
        .and_then(|l| l.strip_suffix('|'))
        .unwrap_or(line);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

fn unescape_backslashes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }
    result
}
