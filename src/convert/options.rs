//! Conversion options.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::adapter::{ErrorMode, ExtractContext};

/// Where extracted images go relative to the output root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageLayout {
    /// `{root}/images/`, shared by every document in the root
    #[default]
    Shared,
    /// `{root}/{base}_images/`
    PerDocument,
}

impl ImageLayout {
    /// Images directory name for a document base name.
    pub fn dir_name(&self, base_name: &str) -> String {
        match self {
            ImageLayout::Shared => "images".to_string(),
            ImageLayout::PerDocument => format!("{}_images", base_name),
        }
    }
}

/// Options for document conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Directory receiving `{base}.md` and the images directory
    pub output_root: PathBuf,

    /// Images directory layout
    pub image_layout: ImageLayout,

    /// Re-encode non-PNG rasters as PNG
    pub transcode: bool,

    /// How unreadable pages are handled
    pub error_mode: ErrorMode,

    /// Write metadata frontmatter (and the outline) into the Markdown
    pub include_frontmatter: bool,

    /// Cooperative cancellation flag
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ConvertOptions {
    /// Create options writing into `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            image_layout: ImageLayout::default(),
            transcode: cfg!(feature = "transcode"),
            error_mode: ErrorMode::default(),
            include_frontmatter: false,
            cancel: None,
        }
    }

    /// Set the images directory layout.
    pub fn with_image_layout(mut self, layout: ImageLayout) -> Self {
        self.image_layout = layout;
        self
    }

    /// Enable or disable PNG transcoding.
    pub fn with_transcoding(mut self, transcode: bool) -> Self {
        self.transcode = transcode;
        self
    }

    /// Set the error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable or disable frontmatter.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Attach a cancellation flag.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Per-call adapter context derived from these options.
    pub(crate) fn extract_context(&self) -> ExtractContext {
        let ctx = ExtractContext::new().with_error_mode(self.error_mode);
        match &self.cancel {
            Some(flag) => ctx.with_cancel(flag.clone()),
            None => ctx,
        }
    }
}
