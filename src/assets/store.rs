//! Per-run asset store: naming, durable writes, optional transcoding.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::detect::DocumentFormat;
use crate::error::{Error, Result};
use crate::model::{PendingAsset, PersistedAsset};

/// File naming pattern for extracted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// `{base}_image{counter}.{ext}`
    Sequential,
    /// `{base}_page{page}_img{counter}.{ext}`
    Paged,
}

impl From<DocumentFormat> for NamingScheme {
    fn from(format: DocumentFormat) -> Self {
        match format {
            DocumentFormat::Word => NamingScheme::Sequential,
            DocumentFormat::Pdf => NamingScheme::Paged,
        }
    }
}

static STORE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Owns image persistence for one conversion run.
///
/// The counter lives in the instance, so two stores never share numbering.
/// Create one store per `convert` call.
///
/// Persisted images are staged under hidden run-scoped names and only take
/// their final names on [`AssetStore::commit`]. Files left in place by an
/// earlier run are never touched by a run that fails; staged files that were
/// not committed are removed by [`AssetStore::rollback`] or on drop.
#[derive(Debug)]
pub struct AssetStore {
    markdown_dir: PathBuf,
    images_dir_name: String,
    base_name: String,
    scheme: NamingScheme,
    transcode: bool,
    counter: u32,
    run_tag: String,
    persisted: Vec<PersistedAsset>,
    // (staging path, final path) not yet committed
    staged: Vec<(PathBuf, PathBuf)>,
}

impl AssetStore {
    /// Create a store writing into `{markdown_dir}/{images_dir_name}/`.
    pub fn new(
        markdown_dir: impl Into<PathBuf>,
        images_dir_name: impl Into<String>,
        base_name: impl Into<String>,
        scheme: NamingScheme,
    ) -> Self {
        Self {
            markdown_dir: markdown_dir.into(),
            images_dir_name: images_dir_name.into(),
            base_name: base_name.into(),
            scheme,
            transcode: cfg!(feature = "transcode"),
            counter: 0,
            run_tag: format!(
                "{}-{}",
                std::process::id(),
                STORE_SEQ.fetch_add(1, Ordering::Relaxed)
            ),
            persisted: Vec::new(),
            staged: Vec::new(),
        }
    }

    /// Enable or disable PNG transcoding of non-PNG rasters.
    pub fn with_transcoding(mut self, transcode: bool) -> Self {
        self.transcode = transcode;
        self
    }

    /// Directory the images are written to.
    pub fn images_dir(&self) -> PathBuf {
        self.markdown_dir.join(&self.images_dir_name)
    }

    /// Assets persisted so far, in persist order.
    pub fn persisted(&self) -> &[PersistedAsset] {
        &self.persisted
    }

    /// Number of persist calls so far.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Persist one asset and return its stable identity.
    ///
    /// The bytes are durably written to a staging file when this returns;
    /// `path` holds them once the store is committed.
    pub fn persist(&mut self, asset: PendingAsset) -> Result<PersistedAsset> {
        let images_dir = self.images_dir();
        fs::create_dir_all(&images_dir).map_err(|source| Error::AssetPersist {
            path: images_dir.clone(),
            source,
        })?;

        self.counter += 1;
        let counter = self.counter;

        let (data, extension, transcoded) = self.normalize(asset.data, &asset.extension);
        let file_name = self.file_name(counter, asset.page, &extension);
        let path = images_dir.join(&file_name);
        let staging = images_dir.join(format!(".{}.{}.staged", file_name, self.run_tag));

        write_durable(&staging, &data).map_err(|source| Error::AssetPersist {
            path: path.clone(),
            source,
        })?;
        self.staged.push((staging, path.clone()));

        log::debug!("Staged {} ({} bytes)", path.display(), data.len());

        let persisted = PersistedAsset {
            id: asset.id,
            display_name: format!("image_{}", counter),
            relative_path: format!("{}/{}", self.images_dir_name, file_name),
            file_name,
            path,
            transcoded,
        };
        self.persisted.push(persisted.clone());
        Ok(persisted)
    }

    /// Move every staged file to its final name.
    ///
    /// A file with the same name from an earlier run is replaced atomically.
    /// Files already moved stay in place if a later rename fails.
    pub fn commit(&mut self) -> Result<()> {
        let mut staged = std::mem::take(&mut self.staged).into_iter();
        while let Some((staging, path)) = staged.next() {
            if let Err(source) = fs::rename(&staging, &path) {
                let _ = fs::remove_file(&staging);
                self.staged.extend(staged);
                return Err(Error::AssetPersist { path, source });
            }
        }
        log::debug!("Committed {} images for {}", self.persisted.len(), self.base_name);
        Ok(())
    }

    /// Discard every staged file that was not committed.
    ///
    /// Used when the run fails after some assets were written. Final files,
    /// including those of earlier runs, are left alone. The counter is left
    /// untouched so names are never reused.
    pub fn rollback(&mut self) {
        self.persisted.clear();
        self.discard_staged();
    }

    fn discard_staged(&mut self) {
        for (staging, _) in self.staged.drain(..) {
            if let Err(e) = fs::remove_file(&staging) {
                log::warn!("Failed to remove {}: {}", staging.display(), e);
            }
        }
    }

    fn file_name(&self, counter: u32, page: Option<u32>, extension: &str) -> String {
        match (self.scheme, page) {
            (NamingScheme::Paged, Some(page)) => {
                format!("{}_page{}_img{}.{}", self.base_name, page, counter, extension)
            }
            _ => format!("{}_image{}.{}", self.base_name, counter, extension),
        }
    }

    fn normalize(&self, data: Vec<u8>, extension: &str) -> (Vec<u8>, String, bool) {
        if !self.transcode || extension == "png" {
            return (data, extension.to_string(), false);
        }

        #[cfg(feature = "transcode")]
        {
            match super::transcode::to_png(&data) {
                Ok(png) => return (png, "png".to_string(), true),
                Err(e) => {
                    log::warn!(
                        "Keeping original .{} bytes for {}: {}",
                        extension,
                        self.base_name,
                        e
                    );
                }
            }
        }

        (data, extension.to_string(), false)
    }
}

impl Drop for AssetStore {
    fn drop(&mut self) {
        self.discard_staged();
    }
}

fn write_durable(path: &Path, data: &[u8]) -> io::Result<()> {
    let result = (|| {
        let mut file = File::create(path)?;
        file.write_all(data)?;
        file.sync_all()
    })();

    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

/// Write `data` to `path` through a sibling temp file and rename it in place.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".part");
    let tmp_path = path.with_file_name(tmp_name);

    write_durable(&tmp_path, data)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        e
    })
}
