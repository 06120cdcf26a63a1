//! Extracted binary assets (images).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Adapter-assigned placeholder identity of an asset within one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "asset{}", self.0)
    }
}

/// An image extracted by an adapter, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct PendingAsset {
    /// Placeholder id referenced by `ImageRef::Pending`
    pub id: AssetId,

    /// 1-indexed page for PDF sources
    pub page: Option<u32>,

    /// Raw encoded bytes
    pub data: Vec<u8>,

    /// Lowercase file extension without the dot (e.g., "png")
    pub extension: String,
}

impl PendingAsset {
    /// Create a new pending asset. The extension is normalized to lowercase
    /// without a leading dot.
    pub fn new(id: AssetId, data: Vec<u8>, extension: impl AsRef<str>) -> Self {
        Self {
            id,
            page: None,
            data,
            extension: normalize_extension(extension.as_ref()),
        }
    }

    /// Set the source page.
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Get the size of the asset data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// An asset durably written by the asset store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAsset {
    /// Placeholder id it was persisted for
    pub id: AssetId,

    /// Alt text used in the Markdown reference
    pub display_name: String,

    /// File name inside the images directory
    pub file_name: String,

    /// Path relative to the Markdown file's directory, `/`-separated
    pub relative_path: String,

    /// Absolute (or root-joined) location on disk
    pub path: PathBuf,

    /// Whether the bytes were re-encoded as PNG
    pub transcoded: bool,
}

/// Normalize an extension: strip leading dots, lowercase, map aliases.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "" => "png".to_string(),
        "jpeg" | "jpe" | "jfif" => "jpg".to_string(),
        "tif" => "tiff".to_string(),
        _ => ext,
    }
}

/// Detect an image file extension from data magic bytes.
pub fn detect_extension(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }

    // GIF: GIF87a or GIF89a
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("gif");
    }

    // TIFF: 49 49 2A 00 (little-endian) or 4D 4D 00 2A (big-endian)
    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    {
        return Some("tiff");
    }

    // BMP: BM
    if data.starts_with(b"BM") {
        return Some("bmp");
    }

    // WEBP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }

    // JPEG 2000: 00 00 00 0C 6A 50 20 20
    if data.starts_with(&[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20]) {
        return Some("jp2");
    }

    // Windows metafiles
    if data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) {
        return Some("wmf");
    }
    if data.len() >= 44 && &data[40..44] == b" EMF" {
        return Some("emf");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".PNG"), "png");
        assert_eq!(normalize_extension("jpeg"), "jpg");
        assert_eq!(normalize_extension("tif"), "tiff");
        assert_eq!(normalize_extension(""), "png");
    }

    #[test]
    fn test_pending_asset() {
        let asset = PendingAsset::new(AssetId(3), vec![1, 2, 3], ".JPEG").on_page(2);
        assert_eq!(asset.extension, "jpg");
        assert_eq!(asset.page, Some(2));
        assert_eq!(asset.size(), 3);
        assert_eq!(asset.id.to_string(), "asset3");
    }

    #[test]
    fn test_detect_extension() {
        let jpeg_data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_extension(&jpeg_data), Some("jpg"));

        let png_data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_extension(&png_data), Some("png"));

        let unknown = vec![0x00, 0x00, 0x00, 0x00];
        assert_eq!(detect_extension(&unknown), None);
    }
}
