//! Document model types shared by adapters, the asset store and renderers.
//!
//! Adapters translate a source format into an ordered sequence of
//! [`ContentBlock`]s plus a flat outline; everything downstream works on
//! these types only.

mod asset;
mod block;
mod metadata;
mod outline;
mod result;

pub use asset::{detect_extension, normalize_extension, AssetId, PendingAsset, PersistedAsset};
pub use block::{single_line, ContentBlock, HeadingLevel, ImageRef, TableBlock};
pub use metadata::DocumentMetadata;
pub(crate) use metadata::{escape_yaml, unescape_yaml};
pub use outline::{OutlineItem, OutlineNode, OutlineSource, OutlineTree};
pub use result::{headings_outline, image_files, ConversionResult};
