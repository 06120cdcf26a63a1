//! # docmark
//!
//! Convert Word and PDF documents into self-contained Markdown bundles.
//!
//! A conversion writes `{root}/{base}.md` next to an images directory and
//! returns a [`ConversionResult`] with the outline, the full text and the
//! image paths referenced by the Markdown.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docmark::convert_file;
//!
//! fn main() -> docmark::Result<()> {
//!     let result = convert_file("report.docx", "out")?;
//!     for node in &result.outline {
//!         println!("{} {}", "#".repeat(node.level as usize), node.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Adapters** ([`adapter`]): format-specific extraction into blocks,
//!   an outline and pending images. Word goes through `zip` + `quick-xml`,
//!   PDF through `lopdf`.
//! - **Asset store** ([`assets`]): per-run image naming and atomic writes,
//!   with optional PNG transcoding.
//! - **Renderer** ([`render`]): pure block → Markdown rendering, plus the
//!   reader that parses the Markdown back.
//! - **Orchestrator** ([`convert`]): ties the three together and rolls back
//!   persisted images when a run fails.

pub mod adapter;
pub mod assets;
pub mod convert;
pub mod detect;
pub mod error;
pub mod model;
pub mod render;

// Re-export commonly used types
pub use adapter::{ErrorMode, ExtractContext, Extraction, PdfAdapter, SourceAdapter, WordAdapter};
pub use assets::{AssetStore, NamingScheme};
pub use convert::{AdapterRegistry, ConvertOptions, Converter, ImageLayout};
pub use detect::DocumentFormat;
pub use error::{Error, Result};
pub use model::{
    ContentBlock, ConversionResult, DocumentMetadata, HeadingLevel, ImageRef, OutlineNode,
    OutlineSource, OutlineTree, TableBlock,
};
pub use render::{render, ExtractionStats, JsonFormat, MarkdownRenderer, RenderOptions};

use std::path::{Path, PathBuf};

/// Convert one document into `{output_root}/{base}.md` with default options.
///
/// # Example
///
/// ```no_run
/// let result = docmark::convert_file("slides.pdf", "out").unwrap();
/// println!("{} images", result.image_files.len());
/// ```
pub fn convert_file<P: AsRef<Path>, R: Into<PathBuf>>(path: P, output_root: R) -> Result<ConversionResult> {
    Converter::new(ConvertOptions::new(output_root)).convert(path)
}

/// Run only the extraction step, writing nothing.
///
/// Useful for inspecting the outline or text of a document. Image blocks in
/// the returned extraction are still pending.
pub fn extract<P: AsRef<Path>>(path: P, error_mode: ErrorMode) -> Result<Extraction> {
    let path = path.as_ref();
    let adapter = AdapterRegistry::with_defaults().resolve(path)?;
    adapter.extract(path, &ExtractContext::new().with_error_mode(error_mode))
}

/// Builder for converting documents.
///
/// # Example
///
/// ```no_run
/// use docmark::Docmark;
///
/// let result = Docmark::new("out")
///     .per_document_images()
///     .with_frontmatter()
///     .lenient()
///     .convert("report.docx")?;
/// # Ok::<(), docmark::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Docmark {
    options: ConvertOptions,
}

impl Docmark {
    /// Create a builder writing into `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            options: ConvertOptions::new(output_root),
        }
    }

    /// Enable lenient mode: unreadable pages are skipped.
    pub fn lenient(mut self) -> Self {
        self.options = self.options.with_error_mode(ErrorMode::Lenient);
        self
    }

    /// Put images in `{base}_images/` instead of the shared `images/`.
    pub fn per_document_images(mut self) -> Self {
        self.options = self.options.with_image_layout(ImageLayout::PerDocument);
        self
    }

    /// Keep images in their source encoding.
    pub fn without_transcoding(mut self) -> Self {
        self.options = self.options.with_transcoding(false);
        self
    }

    /// Enable frontmatter in output.
    pub fn with_frontmatter(mut self) -> Self {
        self.options = self.options.with_frontmatter(true);
        self
    }

    /// Get the options built so far.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert one document.
    pub fn convert<P: AsRef<Path>>(self, path: P) -> Result<ConversionResult> {
        Converter::new(self.options).convert(path)
    }
}
