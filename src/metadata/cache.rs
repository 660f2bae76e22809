//
//  cache.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{MetadataStore, ModuleKind, ModuleMetadata, PackageManifest};
use crate::error::MetadataError;
use crate::parser::extract_module;
use crate::paths;

/// Lazily computes [`ModuleMetadata`] and memoizes it in the configured store.
///
/// Every invalidation bumps the path's generation. A read that started
/// under an older generation is returned to its caller but never stored.
pub struct ModuleCache {
    store: Arc<dyn MetadataStore>,
    asset_exts: HashSet<String>,
    generations: Mutex<HashMap<PathBuf, u64>>,
}

impl ModuleCache {
    pub fn new(store: Arc<dyn MetadataStore>, asset_exts: &[String]) -> Self {
        Self {
            store,
            asset_exts: asset_exts.iter().cloned().collect(),
            generations: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind_of(&self, path: &Path) -> ModuleKind {
        match paths::extension(path) {
            Some(ext) if self.asset_exts.contains(ext) => ModuleKind::Asset,
            Some("json") if path.file_name().is_some_and(|n| n == "package.json") => {
                ModuleKind::Package
            }
            Some("json") => ModuleKind::Json,
            _ => ModuleKind::Script,
        }
    }

    /// Metadata for `path`, reading the file on a cache miss.
    pub async fn metadata(&self, path: &Path) -> Result<Arc<ModuleMetadata>, MetadataError> {
        if let Some(hit) = self.store.get(path) {
            return Ok(hit);
        }
        let generation = self.generation(path);
        let kind = self.kind_of(path);
        let metadata = match kind {
            ModuleKind::Asset | ModuleKind::Json => ModuleMetadata::leaf(path, kind),
            ModuleKind::Script | ModuleKind::Package => {
                let source = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| MetadataError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                compute(path, kind, &source)?
            }
        };
        Ok(self.remember(path, generation, metadata))
    }

    /// Blocking variant used from rayon workers during full builds.
    pub fn load_blocking(&self, path: &Path) -> Result<Arc<ModuleMetadata>, MetadataError> {
        if let Some(hit) = self.store.get(path) {
            return Ok(hit);
        }
        let generation = self.generation(path);
        let kind = self.kind_of(path);
        let metadata = match kind {
            ModuleKind::Asset | ModuleKind::Json => ModuleMetadata::leaf(path, kind),
            ModuleKind::Script | ModuleKind::Package => {
                let source =
                    std::fs::read_to_string(path).map_err(|source| MetadataError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                compute(path, kind, &source)?
            }
        };
        Ok(self.remember(path, generation, metadata))
    }

    /// Drop the cached entry for a changed file.
    pub fn invalidate(&self, path: &Path) {
        debug!(path = %path.display(), "invalidating module metadata");
        let mut generations = self.generations.lock();
        *generations.entry(path.to_path_buf()).or_insert(0) += 1;
        self.store.remove(path);
    }

    fn generation(&self, path: &Path) -> u64 {
        self.generations.lock().get(path).copied().unwrap_or(0)
    }

    fn remember(&self, path: &Path, generation: u64, metadata: ModuleMetadata) -> Arc<ModuleMetadata> {
        let metadata = Arc::new(metadata);
        let generations = self.generations.lock();
        if generations.get(path).copied().unwrap_or(0) == generation {
            self.store.put(path, Arc::clone(&metadata));
        } else {
            debug!(path = %path.display(), "file changed while reading, metadata not cached");
        }
        metadata
    }
}

fn compute(path: &Path, kind: ModuleKind, source: &str) -> Result<ModuleMetadata, MetadataError> {
    match kind {
        ModuleKind::Package => {
            let manifest: PackageManifest =
                serde_json::from_str(source).map_err(|source| MetadataError::Manifest {
                    path: path.to_path_buf(),
                    source,
                })?;
            let mut metadata = ModuleMetadata::leaf(path, kind);
            metadata.package = Some(manifest);
            Ok(metadata)
        }
        _ => {
            let extracted = extract_module(path, source)?;
            Ok(ModuleMetadata {
                path: path.to_path_buf(),
                kind,
                haste_name: extracted.haste_name,
                dependencies: extracted.dependencies,
                async_dependencies: extracted.async_dependencies,
                package: None,
            })
        }
    }
}
