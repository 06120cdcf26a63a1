//! Source adapters translating a document format into blocks and assets.
//!
//! Each adapter owns one format family and produces an [`Extraction`]:
//! an ordered block sequence, a flat outline, the images it found (not yet
//! written anywhere) and metadata. Adapters never touch the output directory.

pub mod backend;
pub mod layout;
pub mod pdf;
pub mod style;
pub mod table_detector;
pub mod word;

pub use pdf::PdfAdapter;
pub use style::classify_style;
pub use word::WordAdapter;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{ContentBlock, DocumentMetadata, OutlineNode, OutlineSource, PendingAsset};
use crate::render::ExtractionStats;

/// Error handling mode during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any page that cannot be read
    #[default]
    Strict,
    /// Log and skip unreadable pages
    Lenient,
}

/// Per-call settings handed to an adapter.
#[derive(Debug, Clone, Default)]
pub struct ExtractContext {
    /// How unreadable content is handled
    pub error_mode: ErrorMode,

    /// Set from another thread to stop the run
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ExtractContext {
    /// Create a context with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Attach a cancellation flag.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Check if unreadable content should be skipped.
    pub fn is_lenient(&self) -> bool {
        self.error_mode == ErrorMode::Lenient
    }
}

/// Everything an adapter pulled out of one document.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Flat outline in document order
    pub outline: Vec<OutlineNode>,

    /// Where the outline came from
    pub outline_source: OutlineSource,

    /// Content blocks in reading order; images are `ImageRef::Pending`
    pub blocks: Vec<ContentBlock>,

    /// Images referenced by the pending blocks
    pub assets: Vec<PendingAsset>,

    /// Source metadata
    pub metadata: DocumentMetadata,

    /// Extraction counters (pages, skipped images)
    pub stats: ExtractionStats,

    /// Recovered problems, one line each
    pub warnings: Vec<String>,
}

impl Extraction {
    /// Record a recovered problem and log it.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Trait for source adapters.
///
/// Implement this trait to add support for a new document format.
pub trait SourceAdapter: Send + Sync {
    /// Supported file extensions, lowercase without the leading dot.
    fn supported_extensions(&self) -> &[&str];

    /// Get the name of this adapter.
    fn name(&self) -> &str;

    /// Extract blocks, outline and pending assets from a file.
    fn extract(&self, path: &Path, ctx: &ExtractContext) -> Result<Extraction>;

    /// Check if this adapter supports the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext)
    }
}
