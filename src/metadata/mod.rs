//! Per-file module metadata and its cache.
//!
//! Metadata is computed lazily from file contents (dependency references,
//! haste name, package manifest) and memoized in a [`MetadataStore`] until the
//! file changes.

mod cache;

pub use cache::ModuleCache;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What kind of file a module is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    Script,
    Json,
    Package,
    Asset,
}

/// Fields read from a `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
}

impl PackageManifest {
    /// Entry point relative to the package root (`index` by default).
    pub fn main(&self) -> &str {
        self.main
            .as_deref()
            .map(|m| m.trim_start_matches("./"))
            .filter(|m| !m.is_empty())
            .unwrap_or("index")
    }
}

/// Cached facts about one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub path: PathBuf,
    pub kind: ModuleKind,
    pub haste_name: Option<String>,
    pub dependencies: Vec<String>,
    pub async_dependencies: Vec<String>,
    pub package: Option<PackageManifest>,
}

impl ModuleMetadata {
    pub(crate) fn leaf(path: &Path, kind: ModuleKind) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            haste_name: None,
            dependencies: Vec::new(),
            async_dependencies: Vec::new(),
            package: None,
        }
    }

    /// Name under which a package registers in the name index.
    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().and_then(|p| p.name.as_deref())
    }
}

/// Opaque cache handle the metadata cache reads through.
pub trait MetadataStore: Send + Sync {
    fn get(&self, path: &Path) -> Option<Arc<ModuleMetadata>>;
    fn put(&self, path: &Path, metadata: Arc<ModuleMetadata>);
    fn remove(&self, path: &Path);
}

/// Process-local [`MetadataStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<PathBuf, Arc<ModuleMetadata>>>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl MetadataStore for MemoryStore {
    fn get(&self, path: &Path) -> Option<Arc<ModuleMetadata>> {
        self.entries.read().get(path).cloned()
    }

    fn put(&self, path: &Path, metadata: Arc<ModuleMetadata>) {
        self.entries.write().insert(path.to_path_buf(), metadata);
    }

    fn remove(&self, path: &Path) {
        self.entries.write().remove(path);
    }
}
