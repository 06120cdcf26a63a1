//! Document format detection from file extensions and magic bytes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Source document formats recognized by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Word document (`.doc`, `.docx`)
    Word,
    /// PDF document (`.pdf`)
    Pdf,
}

impl DocumentFormat {
    /// Resolve the format from a file extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "doc" | "docx" => Some(DocumentFormat::Word),
            "pdf" => Some(DocumentFormat::Pdf),
            _ => None,
        }
    }

    /// Resolve the format of `path` from its extension.
    ///
    /// Fails with [`Error::UnsupportedFormat`] without touching the filesystem.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| Error::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Word => write!(f, "word"),
            DocumentFormat::Pdf => write!(f, "pdf"),
        }
    }
}

/// Physical container recognized from the first bytes of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// PDF with its header version (e.g., "1.7")
    Pdf(String),
    /// ZIP package (OOXML)
    Zip,
    /// OLE compound file (legacy binary Office)
    Ole,
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Sniff the container type from leading bytes.
pub fn sniff_bytes(data: &[u8]) -> Option<Container> {
    if data.starts_with(ZIP_MAGIC) {
        return Some(Container::Zip);
    }
    if data.starts_with(OLE_MAGIC) {
        return Some(Container::Ole);
    }
    if data.len() >= PDF_MAGIC_LEN + VERSION_LEN && data.starts_with(PDF_MAGIC) {
        let version = String::from_utf8_lossy(&data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN])
            .to_string();
        if is_valid_version(&version) {
            return Some(Container::Pdf(version));
        }
    }
    None
}

/// Sniff the container type of a file on disk.
pub fn sniff_path<P: AsRef<Path>>(path: P) -> Result<Option<Container>> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 16];
    let mut filled = 0;
    // Short files are fine; read what is there.
    while filled < header.len() {
        let n = file.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(sniff_bytes(&header[..filled]))
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    if version.len() != 3 {
        return false;
    }

    let chars: Vec<char> = version.chars().collect();
    chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}
