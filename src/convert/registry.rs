//! Extension → adapter registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::adapter::{PdfAdapter, SourceAdapter, WordAdapter};
use crate::error::{Error, Result};

/// Registry for source adapters.
///
/// The registry maps lowercase file extensions to adapters. Later
/// registrations win for a shared extension.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
    by_name: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with default adapters (Word, PDF).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(WordAdapter::new()));
        registry.register(Arc::new(PdfAdapter::new()));
        registry
    }

    /// Register an adapter for all its supported extensions.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        for ext in adapter.supported_extensions() {
            self.adapters.insert(ext.to_lowercase(), adapter.clone());
        }
        self.by_name.insert(adapter.name().to_lowercase(), adapter);
    }

    /// Get an adapter by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&ext.to_lowercase()).cloned()
    }

    /// Get an adapter by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.adapters.contains_key(&ext.to_lowercase())
    }

    /// All supported extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.adapters.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    /// Adapter for a path, by extension. Touches no file.
    pub fn resolve(&self, path: &Path) -> Result<Arc<dyn SourceAdapter>> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.get_by_extension(ext))
            .ok_or_else(|| Error::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
