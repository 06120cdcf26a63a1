//! Conversion orchestrator: adapter → asset store → renderer → Markdown file.
//!
//! # Example
//!
//! ```no_run
//! use docmark::convert::{ConvertOptions, Converter};
//!
//! fn main() -> docmark::Result<()> {
//!     let converter = Converter::new(ConvertOptions::new("out"));
//!     let result = converter.convert("report.docx")?;
//!     println!("{}", result.markdown_path.display());
//!     Ok(())
//! }
//! ```

mod options;
mod registry;

pub use crate::adapter::ErrorMode;
pub use options::{ConvertOptions, ImageLayout};
pub use registry::AdapterRegistry;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::adapter::Extraction;
use crate::assets::{write_atomic, AssetStore, NamingScheme};
use crate::error::{Error, Result};
use crate::model::{
    image_files, AssetId, ContentBlock, ConversionResult, ImageRef, OutlineSource, PersistedAsset,
};
use crate::render::{full_text, ExtractionStats, MarkdownRenderer, RenderOptions};

/// Converts documents into Markdown bundles under one output root.
///
/// `Converter` is `Send + Sync`; each call owns its own asset store, so
/// conversions may run in parallel.
#[derive(Clone)]
pub struct Converter {
    options: ConvertOptions,
    registry: AdapterRegistry,
}

impl Converter {
    /// Create a converter with the default adapters.
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            registry: AdapterRegistry::with_defaults(),
        }
    }

    /// Use a custom adapter registry.
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Get the conversion options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Get the adapter registry.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Convert one document.
    ///
    /// Writes `{output_root}/{base}.md` and its images. Images are staged
    /// and only take their final names right before the Markdown is written,
    /// so a failed call never disturbs the output of an earlier one.
    pub fn convert<P: AsRef<Path>>(&self, path: P) -> Result<ConversionResult> {
        let path = path.as_ref();
        let adapter = self.registry.resolve(path)?;

        log::debug!("Converting {} with the {} adapter", path.display(), adapter.name());
        let extraction = adapter.extract(path, &self.options.extract_context())?;

        let root = &self.options.output_root;
        fs::create_dir_all(root).map_err(|source| Error::Write {
            path: root.clone(),
            source,
        })?;

        let base = base_name(path);
        let scheme = extraction
            .metadata
            .format
            .map(NamingScheme::from)
            .unwrap_or(NamingScheme::Sequential);
        let mut store = AssetStore::new(
            root,
            self.options.image_layout.dir_name(&base),
            base.clone(),
            scheme,
        )
        .with_transcoding(self.options.transcode);

        match self.finish(extraction, &mut store, root.join(format!("{}.md", base))) {
            Ok(result) => {
                log::debug!(
                    "Wrote {} ({} images)",
                    result.markdown_path.display(),
                    result.image_files.len()
                );
                Ok(result)
            }
            Err(e) => {
                store.rollback();
                Err(e)
            }
        }
    }

    /// Convert independent documents in parallel.
    ///
    /// Results come back in input order.
    pub fn convert_many<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Vec<Result<ConversionResult>> {
        paths.par_iter().map(|path| self.convert(path)).collect()
    }

    fn finish(
        &self,
        extraction: Extraction,
        store: &mut AssetStore,
        markdown_path: PathBuf,
    ) -> Result<ConversionResult> {
        let Extraction {
            outline,
            outline_source,
            blocks,
            assets,
            metadata,
            stats: extraction_stats,
            ..
        } = extraction;

        let ctx = self.options.extract_context();
        let mut persisted: HashMap<AssetId, PersistedAsset> = HashMap::with_capacity(assets.len());
        for asset in assets {
            ctx.check_cancelled()?;
            let asset = store.persist(asset)?;
            persisted.insert(asset.id, asset);
        }

        let blocks = resolve_images(blocks, &persisted)?;

        let renderer = MarkdownRenderer::new(
            RenderOptions::new()
                .with_frontmatter(self.options.include_frontmatter)
                .with_metadata(metadata.clone()),
        );
        let embed_outline =
            outline_source == OutlineSource::Bookmarks || self.options.include_frontmatter;
        let markdown = renderer.render(&blocks, embed_outline.then_some(outline.as_slice()))?;

        ctx.check_cancelled()?;
        store.commit()?;
        write_atomic(&markdown_path, markdown.as_bytes()).map_err(|source| Error::Write {
            path: markdown_path.clone(),
            source,
        })?;

        let mut stats = ExtractionStats::from_blocks(&blocks);
        stats.merge(&extraction_stats);
        stats.transcoded_images += store.persisted().iter().filter(|a| a.transcoded).count() as u32;

        Ok(ConversionResult {
            outline,
            full_text: full_text(&blocks),
            markdown_path,
            image_files: image_files(&blocks),
            metadata,
            stats,
        })
    }
}

/// Swap every pending image reference for its persisted location.
fn resolve_images(
    blocks: Vec<ContentBlock>,
    persisted: &HashMap<AssetId, PersistedAsset>,
) -> Result<Vec<ContentBlock>> {
    blocks
        .into_iter()
        .map(|block| match block {
            ContentBlock::Image {
                image: ImageRef::Pending(id),
            } => {
                let asset = persisted.get(&id).ok_or_else(|| {
                    Error::Render(format!("image {} has no persisted asset", id))
                })?;
                Ok(ContentBlock::Image {
                    image: ImageRef::persisted(&asset.display_name, &asset.relative_path),
                })
            }
            other => Ok(other),
        })
        .collect()
}

fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Converter>();
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/a/b/report.final.docx")), "report.final");
        assert_eq!(base_name(Path::new("doc.pdf")), "doc");
    }

    #[test]
    fn test_resolve_images_missing_asset() {
        let blocks = vec![ContentBlock::pending_image(AssetId(7))];
        let err = resolve_images(blocks, &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_unsupported_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        let converter = Converter::new(ConvertOptions::new(&root));

        let err = converter.convert(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
        assert!(!root.exists());
    }
}
