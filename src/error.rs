//! Error types for docmark library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for docmark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document conversion.
#[derive(Error, Debug)]
pub enum Error {
    /// The file extension is not one of the recognized document types.
    #[error("Unsupported format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The source document is unreadable or corrupt.
    #[error("Failed to parse {}: {reason}", path.display())]
    ParseFailure { path: PathBuf, reason: String },

    /// An extracted asset could not be written to disk.
    #[error("Failed to persist asset {}: {source}", path.display())]
    AssetPersist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output directory or the Markdown file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An image could not be re-encoded. Recovered locally by the asset store.
    #[error("Image transcoding error: {0}")]
    AssetTranscode(String),

    /// Error during Markdown rendering.
    #[error("Rendering error: {0}")]
    Render(String),

    /// The conversion was interrupted through its cancellation flag.
    #[error("Conversion cancelled")]
    Cancelled,

    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a [`Error::ParseFailure`] for `path`.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::ParseFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts a whole conversion.
    ///
    /// Transcoding failures are the only recoverable kind.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::AssetTranscode(_))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::AssetTranscode(err.to_string())
    }
}
