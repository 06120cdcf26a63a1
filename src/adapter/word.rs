//! Word (.docx) adapter.
//!
//! A .docx file is a ZIP package of XML parts. The body is walked once in
//! document order; paragraphs and tables become blocks as they close.
//! Images come from the document relationships and are appended after the
//! body, in relationship order.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::detect::{sniff_path, Container, DocumentFormat};
use crate::error::{Error, Result};
use crate::model::{
    detect_extension, single_line, AssetId, ContentBlock, DocumentMetadata, HeadingLevel,
    OutlineNode, OutlineSource, PendingAsset, TableBlock,
};

use super::style::classify_style;
use super::{ExtractContext, Extraction, SourceAdapter};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CORE_PART: &str = "docProps/core.xml";

/// Word document adapter.
#[derive(Debug, Clone, Default)]
pub struct WordAdapter {
    _private: (),
}

impl WordAdapter {
    /// Create a new Word adapter.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Extract from any seekable reader holding a .docx package.
    ///
    /// `path` is only used in error messages.
    pub fn extract_from_reader<R: Read + Seek>(
        &self,
        reader: R,
        path: &Path,
        ctx: &ExtractContext,
    ) -> Result<Extraction> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::parse(path, format!("not a ZIP package: {}", e)))?;

        let styles = match read_part(&mut archive, STYLES_PART, path)? {
            Some(xml) => parse_styles(&xml).map_err(|e| Error::parse(path, e))?,
            None => HashMap::new(),
        };

        let document = read_part(&mut archive, DOCUMENT_PART, path)?
            .ok_or_else(|| Error::parse(path, format!("missing {}", DOCUMENT_PART)))?;

        let mut walker = BodyWalker::new(&styles, ctx);
        walker.walk(&document).map_err(|e| match e {
            WalkError::Xml(reason) => Error::parse(path, reason),
            WalkError::Cancelled => Error::Cancelled,
        })?;

        let mut extraction = Extraction {
            outline_source: OutlineSource::Headings,
            metadata: DocumentMetadata::for_format(DocumentFormat::Word),
            ..Default::default()
        };
        extraction.outline = walker.outline;
        extraction.blocks = walker.blocks;

        if let Some(xml) = read_part(&mut archive, CORE_PART, path)? {
            apply_core_properties(&xml, &mut extraction.metadata);
        }

        let relationships = match read_part(&mut archive, RELS_PART, path)? {
            Some(xml) => parse_image_relationships(&xml).map_err(|e| Error::parse(path, e))?,
            None => Vec::new(),
        };

        for target in relationships {
            ctx.check_cancelled()?;
            let part = resolve_target(&target);
            let data = match read_binary_part(&mut archive, &part) {
                Some(data) if !data.is_empty() => data,
                _ => {
                    extraction.stats.skipped_images += 1;
                    extraction.warn(format!("{}: image part {} is missing", path.display(), part));
                    continue;
                }
            };

            let extension = Path::new(&part)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_string)
                .or_else(|| detect_extension(&data).map(str::to_string))
                .unwrap_or_default();

            let id = AssetId(extraction.assets.len() as u32 + 1);
            extraction.assets.push(PendingAsset::new(id, data, extension));
            extraction.blocks.push(ContentBlock::pending_image(id));
        }

        log::debug!(
            "Word: {} blocks, {} headings, {} images from {}",
            extraction.blocks.len(),
            extraction.outline.len(),
            extraction.assets.len(),
            path.display()
        );

        Ok(extraction)
    }
}

impl SourceAdapter for WordAdapter {
    fn supported_extensions(&self) -> &[&str] {
        &["docx", "doc"]
    }

    fn name(&self) -> &str {
        "word"
    }

    fn extract(&self, path: &Path, ctx: &ExtractContext) -> Result<Extraction> {
        let container = sniff_path(path).map_err(|e| match e {
            Error::Io(io) => Error::parse(path, io.to_string()),
            other => other,
        })?;
        match container {
            Some(Container::Zip) => {}
            Some(Container::Ole) => {
                return Err(Error::parse(
                    path,
                    "legacy binary Word format (.doc) is not supported; save it as .docx",
                ))
            }
            _ => return Err(Error::parse(path, "not a Word package")),
        }

        let file = File::open(path).map_err(|e| Error::parse(path, e.to_string()))?;
        self.extract_from_reader(BufReader::new(file), path, ctx)
    }
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    path: &Path,
) -> Result<Option<String>> {
    let Ok(mut part) = archive.by_name(name) else {
        return Ok(None);
    };
    let mut content = String::new();
    part.read_to_string(&mut content)
        .map_err(|e| Error::parse(path, format!("{}: {}", name, e)))?;
    Ok(Some(content))
}

fn read_binary_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<Vec<u8>> {
    let mut part = archive.by_name(name).ok()?;
    let mut data = Vec::new();
    part.read_to_end(&mut data).ok()?;
    Some(data)
}

/// Resolve a relationship target (relative to `word/`) to a package path.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = vec!["word"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Extract an attribute value by key from an element
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(|a| a.ok())
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Style definitions: id → (display name, outline level).
#[derive(Debug, Clone, Default)]
struct StyleInfo {
    name: Option<String>,
    outline_level: Option<u8>,
}

fn parse_styles(xml: &str) -> std::result::Result<HashMap<String, StyleInfo>, String> {
    let mut styles = HashMap::new();
    let mut current: Option<(String, StyleInfo)> = None;

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:style" => {
                current = get_attr(&e, b"w:styleId").map(|id| (id, StyleInfo::default()));
            }
            Ok(Event::Empty(e)) => {
                if let Some((_, info)) = current.as_mut() {
                    match e.name().as_ref() {
                        b"w:name" => info.name = get_attr(&e, b"w:val"),
                        b"w:outlineLvl" => {
                            info.outline_level = get_attr(&e, b"w:val").and_then(|v| v.parse().ok())
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => {
                if let Some((id, info)) = current.take() {
                    styles.insert(id, info);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("{}: {}", STYLES_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

/// Image relationship targets, in relationship order.
fn parse_image_relationships(xml: &str) -> std::result::Result<Vec<String>, String> {
    let mut targets = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let is_image = get_attr(&e, b"Type").is_some_and(|t| t.ends_with("/image"));
                let external = get_attr(&e, b"TargetMode").is_some_and(|m| m == "External");
                if is_image && !external {
                    if let Some(target) = get_attr(&e, b"Target") {
                        targets.push(target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("{}: {}", RELS_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

fn apply_core_properties(xml: &str, metadata: &mut DocumentMetadata) {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => current = Some(e.name().as_ref().to_vec()),
            Ok(Event::Text(e)) => {
                let text = e.unescape().map(|t| t.trim().to_string()).unwrap_or_default();
                if !text.is_empty() {
                    match current.as_deref() {
                        Some(b"dc:title") => metadata.title = Some(text),
                        Some(b"dc:creator") => metadata.author = Some(text),
                        Some(b"dcterms:created") => metadata.created = parse_datetime(&text),
                        Some(b"dcterms:modified") => metadata.modified = parse_datetime(&text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

enum WalkError {
    Xml(String),
    Cancelled,
}

#[derive(Debug, Default)]
struct ParagraphState {
    text: String,
    style_id: Option<String>,
    outline_level: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VMerge {
    Restart,
    Continue,
}

#[derive(Debug, Default)]
struct CellState {
    paragraphs: Vec<String>,
    span: usize,
    vmerge: Option<VMerge>,
}

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<CellState>,
}

/// Walks `word/document.xml`, producing blocks in document order.
struct BodyWalker<'a> {
    styles: &'a HashMap<String, StyleInfo>,
    ctx: &'a ExtractContext,
    blocks: Vec<ContentBlock>,
    outline: Vec<OutlineNode>,
    // Open paragraphs; more than one inside text boxes
    paragraphs: Vec<ParagraphState>,
    table: Option<TableState>,
    nested_tables: usize,
    in_run: usize,
    in_text: bool,
    in_ppr: bool,
}

impl<'a> BodyWalker<'a> {
    fn new(styles: &'a HashMap<String, StyleInfo>, ctx: &'a ExtractContext) -> Self {
        Self {
            styles,
            ctx,
            blocks: Vec::new(),
            outline: Vec::new(),
            paragraphs: Vec::new(),
            table: None,
            nested_tables: 0,
            in_run: 0,
            in_text: false,
            in_ppr: false,
        }
    }

    fn walk(&mut self, xml: &str) -> std::result::Result<(), WalkError> {
        let mut reader = Reader::from_str(xml);
        // w:t content keeps its spaces (xml:space="preserve")
        reader.trim_text(false);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => self.handle_start(&e),
                Ok(Event::Empty(e)) if e.name().as_ref() == b"w:p" => {
                    self.paragraphs.push(ParagraphState::default());
                    self.handle_end(b"w:p")?;
                }
                Ok(Event::Empty(e)) => self.handle_empty(&e),
                Ok(Event::Text(e)) => {
                    if self.in_text {
                        let text = e.unescape().map_err(|e| WalkError::Xml(e.to_string()))?;
                        self.push_text(&text);
                    }
                }
                Ok(Event::End(e)) => self.handle_end(e.name().as_ref())?,
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(WalkError::Xml(format!(
                        "{} at position {}: {}",
                        DOCUMENT_PART,
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    fn handle_start(&mut self, e: &BytesStart) {
        match e.name().as_ref() {
            b"w:p" => self.paragraphs.push(ParagraphState::default()),
            b"w:pPr" => self.in_ppr = true,
            b"w:r" => self.in_run += 1,
            b"w:t" => self.in_text = self.in_run > 0,
            b"w:tbl" => self.open_table(),
            b"w:tr" => self.open_row(),
            b"w:tc" => self.open_cell(),
            _ => self.handle_empty(e),
        }
    }

    fn handle_empty(&mut self, e: &BytesStart) {
        match e.name().as_ref() {
            b"w:pStyle" if self.in_ppr => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.style_id = get_attr(e, b"w:val");
                }
            }
            b"w:outlineLvl" if self.in_ppr => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.outline_level = get_attr(e, b"w:val").and_then(|v| v.parse().ok());
                }
            }
            b"w:tab" if self.in_run > 0 => self.push_text("\t"),
            b"w:br" | b"w:cr" if self.in_run > 0 => self.push_text("\n"),
            b"w:gridSpan" => {
                if let Some(cell) = self.current_cell() {
                    cell.span = get_attr(e, b"w:val")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(1)
                        .max(1);
                }
            }
            b"w:vMerge" => {
                if let Some(cell) = self.current_cell() {
                    cell.vmerge = match get_attr(e, b"w:val").as_deref() {
                        Some("restart") => Some(VMerge::Restart),
                        _ => Some(VMerge::Continue),
                    };
                }
            }
            _ => {}
        }
    }

    fn handle_end(&mut self, name: &[u8]) -> std::result::Result<(), WalkError> {
        match name {
            b"w:p" => {
                self.close_paragraph();
                if self.ctx.check_cancelled().is_err() {
                    return Err(WalkError::Cancelled);
                }
            }
            b"w:pPr" => self.in_ppr = false,
            b"w:r" => self.in_run = self.in_run.saturating_sub(1),
            b"w:t" => self.in_text = false,
            b"w:tc" => self.close_cell(),
            b"w:tr" => self.close_row(),
            b"w:tbl" => self.close_table(),
            _ => {}
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(p) = self.paragraphs.last_mut() {
            p.text.push_str(text);
        }
    }

    /// The open cell of the outermost table, unless inside a nested table.
    fn current_cell(&mut self) -> Option<&mut CellState> {
        if self.nested_tables > 0 {
            return None;
        }
        self.table.as_mut()?.cell.as_mut()
    }

    fn close_paragraph(&mut self) {
        let Some(para) = self.paragraphs.pop() else {
            return;
        };

        // Text box paragraph: fold into the enclosing paragraph
        if let Some(parent) = self.paragraphs.last_mut() {
            if !para.text.trim().is_empty() {
                if !parent.text.is_empty() && !parent.text.ends_with('\n') {
                    parent.text.push('\n');
                }
                parent.text.push_str(para.text.trim());
            }
            return;
        }

        // Inside a table (nested or not) text goes to the outer cell
        if let Some(table) = self.table.as_mut() {
            if let Some(cell) = table.cell.as_mut() {
                cell.paragraphs.push(para.text.trim().to_string());
            }
            return;
        }

        let text = para.text.trim();
        if text.is_empty() {
            self.blocks.push(ContentBlock::Blank);
            return;
        }

        match self.heading_level(&para) {
            Some(level) => {
                let title = single_line(text);
                self.outline
                    .push(OutlineNode::new(u32::from(level.get()), title.as_str()));
                self.blocks.push(ContentBlock::heading(level, title));
            }
            None => self.blocks.push(ContentBlock::paragraph(text)),
        }
    }

    fn heading_level(&self, para: &ParagraphState) -> Option<HeadingLevel> {
        let style = para.style_id.as_deref().and_then(|id| {
            let info = self.styles.get(id);
            let name = info.and_then(|i| i.name.as_deref()).unwrap_or(id);
            classify_style(name)
                .or_else(|| classify_style(id))
                .or_else(|| info.and_then(|i| i.outline_level).and_then(outline_to_level))
        });
        style.or_else(|| para.outline_level.and_then(outline_to_level))
    }

    fn open_table(&mut self) {
        if self.table.is_some() {
            self.nested_tables += 1;
        } else {
            self.table = Some(TableState::default());
        }
    }

    fn open_row(&mut self) {
        if self.nested_tables > 0 {
            return;
        }
        if let Some(table) = self.table.as_mut() {
            table.row = Some(Vec::new());
        }
    }

    fn open_cell(&mut self) {
        if self.nested_tables > 0 {
            return;
        }
        if let Some(table) = self.table.as_mut() {
            table.cell = Some(CellState {
                span: 1,
                ..Default::default()
            });
        }
    }

    fn close_cell(&mut self) {
        if self.nested_tables > 0 {
            return;
        }
        let Some(table) = self.table.as_mut() else {
            return;
        };
        let Some(cell) = table.cell.take() else {
            return;
        };
        let Some(row) = table.row.as_mut() else {
            return;
        };

        let text = match cell.vmerge {
            // Continuation: repeat the text of the cell above
            Some(VMerge::Continue) => table
                .rows
                .last()
                .and_then(|above| above.get(row.len()))
                .cloned()
                .unwrap_or_default(),
            _ => {
                let paragraphs: Vec<&str> = cell
                    .paragraphs
                    .iter()
                    .map(String::as_str)
                    .filter(|p| !p.is_empty())
                    .collect();
                paragraphs.join("\n")
            }
        };

        for _ in 0..cell.span {
            row.push(text.clone());
        }
    }

    fn close_row(&mut self) {
        if self.nested_tables > 0 {
            return;
        }
        if let Some(table) = self.table.as_mut() {
            if let Some(row) = table.row.take() {
                table.rows.push(row);
            }
        }
    }

    fn close_table(&mut self) {
        if self.nested_tables > 0 {
            self.nested_tables -= 1;
            return;
        }
        if let Some(table) = self.table.take() {
            if !table.rows.is_empty() {
                self.blocks.push(ContentBlock::Table(TableBlock::new(table.rows)));
            }
        }
    }
}

/// `w:outlineLvl` is 0-based; 9 means body text.
fn outline_to_level(outline_level: u8) -> Option<HeadingLevel> {
    HeadingLevel::new(outline_level.checked_add(1)?)
}
