//! PDF source abstraction.
//!
//! The PDF adapter talks to the document only through [`PdfSource`], so the
//! concrete library (lopdf) stays behind one seam and tests can substitute an
//! in-memory source.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::detect::DocumentFormat;
use crate::error::{Error, Result};
use crate::model::{DocumentMetadata, OutlineNode};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// A value from a PDF content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Create an operation.
    pub fn new(operator: impl Into<String>, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }
}

/// How the bytes of an image XObject are encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Baseline JPEG stream (`DCTDecode`)
    Jpeg,
    /// JPEG 2000 codestream (`JPXDecode`)
    Jpeg2000,
    /// Decoded pixel rows
    Raw,
    /// A filter chain we cannot turn into a file
    Unsupported(String),
}

/// An image XObject referenced from a page's resources.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Resource name on the page (e.g., "Im1")
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Base color space name (e.g., "DeviceRGB")
    pub color_space: Option<String>,
    pub bits_per_component: Option<u32>,
    pub encoding: ImageEncoding,
    /// Encoded bytes for Jpeg/Jpeg2000, pixel rows for Raw
    pub data: Vec<u8>,
}

/// Abstract interface for PDF document access.
pub trait PdfSource {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// Plain text of a page, without positions.
    fn extract_text(&self, page_number: u32) -> Result<String>;

    /// Image XObjects of a page, in resource order.
    fn page_images(&self, page: PageId) -> Result<Vec<RawImage>>;

    /// Bookmarks flattened depth-first, level 1 at the top.
    fn outline(&self) -> Result<Vec<OutlineNode>>;

    /// Info dictionary metadata.
    fn metadata(&self) -> DocumentMetadata;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSS...`).
pub fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}

/// [`PdfSource`] backed by `lopdf::Document`.
pub struct LopdfSource {
    doc: LopdfDocument,
    path: PathBuf,
}

impl LopdfSource {
    /// Load from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let doc = LopdfDocument::load(path).map_err(|e| Error::parse(path, e.to_string()))?;
        Self::from_document(doc, path)
    }

    /// Load from an in-memory byte slice. `path` is only used in error messages.
    pub fn load_bytes<P: AsRef<Path>>(data: &[u8], path: P) -> Result<Self> {
        let path = path.as_ref();
        let doc = LopdfDocument::load_mem(data).map_err(|e| Error::parse(path, e.to_string()))?;
        Self::from_document(doc, path)
    }

    fn from_document(doc: LopdfDocument, path: &Path) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::parse(path, "document is encrypted"));
        }
        Ok(Self {
            doc,
            path: path.to_path_buf(),
        })
    }

    fn fail(&self, reason: impl std::fmt::Display) -> Error {
        Error::parse(&self.path, reason.to_string())
    }

    /// Follow a reference (if any) to a dictionary.
    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match obj {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Page resources, following `/Parent` for inherited entries.
    fn page_resources(&self, page: PageId) -> Option<&Dictionary> {
        let mut current = self.doc.get_dictionary(page).ok();
        let mut seen = HashSet::new();
        while let Some(dict) = current {
            if let Some(res) = dict.get(b"Resources").ok().and_then(|r| self.resolve_dict(r)) {
                return Some(res);
            }
            let parent = dict.get(b"Parent").ok().and_then(|p| p.as_reference().ok())?;
            if !seen.insert(parent) {
                return None;
            }
            current = self.doc.get_dictionary(parent).ok();
        }
        None
    }

    fn read_image(&self, name: &[u8], id: ObjectId) -> Option<RawImage> {
        let stream = match self.doc.get_object(id).ok()? {
            Object::Stream(s) => s,
            _ => return None,
        };
        let dict = &stream.dict;

        if name_of(dict.get(b"Subtype").ok()?)? != "Image" {
            return None;
        }

        let width = dict.get(b"Width").ok().and_then(|w| w.as_i64().ok()).unwrap_or(0);
        let height = dict.get(b"Height").ok().and_then(|h| h.as_i64().ok()).unwrap_or(0);
        let bits_per_component = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|b| b.as_i64().ok())
            .map(|b| b as u32);

        let color = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|cs| self.resolve_color_space(cs, 0));

        let filters: Vec<String> = match dict.get(b"Filter").ok() {
            Some(Object::Array(arr)) => arr.iter().filter_map(name_of).collect(),
            Some(other) => name_of(other).into_iter().collect(),
            None => Vec::new(),
        };

        let (encoding, data) = match filters.last().map(String::as_str) {
            Some("DCTDecode") if filters.len() == 1 => (ImageEncoding::Jpeg, stream.content.clone()),
            Some("JPXDecode") if filters.len() == 1 => {
                (ImageEncoding::Jpeg2000, stream.content.clone())
            }
            None => (ImageEncoding::Raw, stream.content.clone()),
            Some("FlateDecode") | Some("LZWDecode") => match stream.decompressed_content() {
                Ok(decoded) => (ImageEncoding::Raw, decoded),
                Err(e) => (ImageEncoding::Unsupported(e.to_string()), Vec::new()),
            },
            Some(_) => (ImageEncoding::Unsupported(filters.join("+")), Vec::new()),
        };

        let width = width.max(0) as u32;
        let height = height.max(0) as u32;
        let (color_space, bits_per_component, encoding, data) = match color {
            Some(ImageColor::Indexed { base, lookup }) if encoding == ImageEncoding::Raw => {
                match expand_palette(&data, width, height, bits_per_component, &base, &lookup) {
                    Ok(pixels) => (Some(base), Some(8), encoding, pixels),
                    Err(reason) => (
                        None,
                        bits_per_component,
                        ImageEncoding::Unsupported(reason),
                        Vec::new(),
                    ),
                }
            }
            Some(ImageColor::Indexed { base, .. }) => (Some(base), bits_per_component, encoding, data),
            Some(ImageColor::Device(space)) => (Some(space), bits_per_component, encoding, data),
            None => (None, bits_per_component, encoding, data),
        };

        Some(RawImage {
            name: String::from_utf8_lossy(name).to_string(),
            width,
            height,
            color_space,
            bits_per_component,
            encoding,
            data,
        })
    }

    /// Reduce an image color space to the device space its samples are in.
    ///
    /// `ICCBased` maps to the device space with the profile's component
    /// count (or its `/Alternate`); calibrated spaces map to their device
    /// counterparts.
    fn resolve_color_space(&self, obj: &Object, depth: u8) -> Option<ImageColor> {
        if depth > 4 {
            return None;
        }
        match obj {
            Object::Reference(id) => {
                self.resolve_color_space(self.doc.get_object(*id).ok()?, depth + 1)
            }
            Object::Name(_) => name_of(obj).map(|n| ImageColor::Device(device_alias(n))),
            Object::Array(arr) => {
                let family = arr.first().and_then(name_of)?;
                match family.as_str() {
                    "ICCBased" => {
                        let profile = match arr.get(1)? {
                            Object::Reference(id) => self.doc.get_object(*id).ok()?,
                            other => other,
                        };
                        let dict = match profile {
                            Object::Stream(s) => &s.dict,
                            Object::Dictionary(d) => d,
                            _ => return None,
                        };
                        match dict.get(b"N").ok().and_then(|n| n.as_i64().ok()) {
                            Some(1) => Some(ImageColor::Device("DeviceGray".to_string())),
                            Some(3) => Some(ImageColor::Device("DeviceRGB".to_string())),
                            Some(4) => Some(ImageColor::Device("DeviceCMYK".to_string())),
                            _ => dict
                                .get(b"Alternate")
                                .ok()
                                .and_then(|alt| self.resolve_color_space(alt, depth + 1)),
                        }
                    }
                    "Indexed" | "I" => {
                        let base = match self.resolve_color_space(arr.get(1)?, depth + 1)? {
                            ImageColor::Device(base) => base,
                            ImageColor::Indexed { .. } => return None,
                        };
                        let lookup = match arr.get(3)? {
                            Object::String(bytes, _) => bytes.clone(),
                            Object::Reference(id) => match self.doc.get_object(*id).ok()? {
                                Object::Stream(s) => stream_bytes(s).ok()?,
                                Object::String(bytes, _) => bytes.clone(),
                                _ => return None,
                            },
                            _ => return None,
                        };
                        Some(ImageColor::Indexed { base, lookup })
                    }
                    _ => Some(ImageColor::Device(device_alias(family))),
                }
            }
            _ => None,
        }
    }

    fn collect_outline(&self, first: ObjectId, out: &mut Vec<OutlineNode>) {
        // (item, level); siblings are pushed in reverse so they pop in order
        let mut stack = vec![(first, 1u32)];
        let mut seen = HashSet::new();

        while let Some((id, level)) = stack.pop() {
            if !seen.insert(id) {
                log::warn!("Outline cycle at object {:?}, stopping branch", id);
                continue;
            }
            let Ok(item) = self.doc.get_dictionary(id) else {
                continue;
            };

            let title = get_string_from_dict(item, b"Title").unwrap_or_default();
            out.push(OutlineNode::new(level, title.trim()));

            if let Some(next) = item.get(b"Next").ok().and_then(|n| n.as_reference().ok()) {
                stack.push((next, level));
            }
            if let Some(child) = item.get(b"First").ok().and_then(|f| f.as_reference().ok()) {
                stack.push((child, level + 1));
            }
        }
    }
}

impl PdfSource for LopdfSource {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id).map_err(|e| self.fail(e))?;
        let contents = page_dict.get(b"Contents").map_err(|e| self.fail(e))?;

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r) {
                Ok(Object::Stream(s)) => stream_bytes(s).map_err(|e| self.fail(e)),
                Ok(Object::Array(arr)) => Ok(self.concat_streams(arr)),
                _ => Err(self.fail("invalid content stream")),
            },
            Object::Array(arr) => Ok(self.concat_streams(arr)),
            _ => Err(self.fail("invalid content stream")),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content = lopdf::content::Content::decode(data).map_err(|e| self.fail(e))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        if let Ok(fonts) = self.doc.get_page_fonts(page) {
            if let Some(font_dict) = fonts.get(font_name) {
                if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn extract_text(&self, page_number: u32) -> Result<String> {
        self.doc
            .extract_text(&[page_number])
            .map_err(|e| self.fail(format!("page {}: {}", page_number, e)))
    }

    fn page_images(&self, page: PageId) -> Result<Vec<RawImage>> {
        let Some(resources) = self.page_resources(page) else {
            return Ok(Vec::new());
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|x| self.resolve_dict(x))
        else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for (name, obj) in xobjects.iter() {
            if let Ok(id) = obj.as_reference() {
                if let Some(image) = self.read_image(name, id) {
                    images.push(image);
                }
            }
        }
        Ok(images)
    }

    fn outline(&self) -> Result<Vec<OutlineNode>> {
        let mut nodes = Vec::new();
        let first = self
            .doc
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get(b"Outlines").ok())
            .and_then(|o| self.resolve_dict(o))
            .and_then(|outlines| outlines.get(b"First").ok())
            .and_then(|f| f.as_reference().ok());

        if let Some(first) = first {
            self.collect_outline(first, &mut nodes);
        }
        Ok(nodes)
    }

    fn metadata(&self) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::for_format(DocumentFormat::Pdf);
        metadata.page_count = Some(self.doc.get_pages().len() as u32);

        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|info| self.resolve_dict(info));

        if let Some(info) = info {
            metadata.title = get_string_from_dict(info, b"Title").filter(|s| !s.is_empty());
            metadata.author = get_string_from_dict(info, b"Author").filter(|s| !s.is_empty());
            metadata.created =
                get_string_from_dict(info, b"CreationDate").and_then(|d| parse_pdf_date(&d));
            metadata.modified =
                get_string_from_dict(info, b"ModDate").and_then(|d| parse_pdf_date(&d));
        }

        metadata
    }
}

impl LopdfSource {
    fn concat_streams(&self, arr: &[Object]) -> Vec<u8> {
        let mut content = Vec::new();
        for obj in arr {
            if let Object::Reference(r) = obj {
                if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                    if let Ok(data) = stream_bytes(s) {
                        content.extend_from_slice(&data);
                        content.push(b' ');
                    }
                }
            }
        }
        content
    }
}

/// Stream data, decoded when a `/Filter` is present.
fn stream_bytes(stream: &lopdf::Stream) -> lopdf::Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream.decompressed_content()
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Resolved color space of an image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImageColor {
    Device(String),
    Indexed { base: String, lookup: Vec<u8> },
}

fn device_alias(name: String) -> String {
    match name.as_str() {
        "CalRGB" | "RGB" => "DeviceRGB".to_string(),
        "CalGray" | "G" => "DeviceGray".to_string(),
        "CMYK" => "DeviceCMYK".to_string(),
        _ => name,
    }
}

/// Turn palette indices (1, 2, 4 or 8 bits, rows padded to a byte) into
/// 8-bit samples of the base space.
fn expand_palette(
    indices: &[u8],
    width: u32,
    height: u32,
    bits: Option<u32>,
    base: &str,
    lookup: &[u8],
) -> std::result::Result<Vec<u8>, String> {
    let components = match base {
        "DeviceGray" => 1,
        "DeviceRGB" => 3,
        other => return Err(format!("indexed image over {}", other)),
    };
    let bits = bits.unwrap_or(8) as usize;
    if !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(format!("indexed image at {} bits", bits));
    }

    let width = width as usize;
    let row_bytes = (width * bits + 7) / 8;
    if row_bytes == 0 || indices.len() < row_bytes * height as usize {
        return Err("truncated indexed image".to_string());
    }

    let mask = ((1u16 << bits) - 1) as u8;
    let mut pixels = Vec::with_capacity(width * height as usize * components);
    for row in indices.chunks(row_bytes).take(height as usize) {
        for x in 0..width {
            let bit = x * bits;
            let shift = 8 - bits - bit % 8;
            let index = ((row[bit / 8] >> shift) & mask) as usize;
            let entry = lookup
                .get(index * components..(index + 1) * components)
                .ok_or_else(|| format!("palette index {} out of range", index))?;
            pixels.extend_from_slice(entry);
        }
    }
    Ok(pixels)
}

fn name_of(obj: &Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|n| String::from_utf8_lossy(n).to_string())
}

/// Read a text string (PDFDocEncoding, UTF-8 or UTF-16BE) from a dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}
