//
//  map.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use arc_swap::ArcSwap;
use async_trait::async_trait;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::table::{HasteEntry, HasteTable};
use super::NameIndex;
use crate::config::{GraphConfig, CODE_EXTENSIONS};
use crate::error::{IndexError, MetadataError};
use crate::metadata::{ModuleCache, ModuleKind, ModuleMetadata};
use crate::paths;
use crate::platform::{platform_extension, GENERIC_PLATFORM, NATIVE_PLATFORM};
use crate::snapshot::FileSnapshot;
use crate::watcher::ChangeKind;

/// Default [`NameIndex`]: `@providesModule` files and named packages.
pub struct HasteMap {
    snapshot: Arc<FileSnapshot>,
    cache: Arc<ModuleCache>,
    platforms: HashSet<String>,
    provides_module_node_modules: Vec<String>,
    table: ArcSwap<HasteTable>,
}

impl HasteMap {
    pub fn new(config: &GraphConfig, snapshot: Arc<FileSnapshot>, cache: Arc<ModuleCache>) -> Self {
        let mut platforms = config.platforms().clone();
        if config.prefer_native_platform() {
            platforms.insert(NATIVE_PLATFORM.to_string());
        }
        Self {
            snapshot,
            cache,
            platforms,
            provides_module_node_modules: config.provides_module_node_modules().to_vec(),
            table: ArcSwap::from_pointee(HasteTable::default()),
        }
    }

    fn is_candidate(&self, path: &Path) -> bool {
        paths::extension(path).is_some_and(|ext| CODE_EXTENSIONS.contains(&ext))
            && !paths::is_node_modules_dir(path, &self.provides_module_node_modules)
    }

    fn register(&self, table: &mut HasteTable, metadata: &ModuleMetadata) -> Result<(), IndexError> {
        match metadata.kind {
            ModuleKind::Script => {
                if let Some(name) = &metadata.haste_name {
                    let platform = platform_extension(&metadata.path, &self.platforms);
                    table.insert(
                        name,
                        platform.as_deref().unwrap_or(GENERIC_PLATFORM),
                        HasteEntry::Module(metadata.path.clone()),
                    )?;
                }
            }
            ModuleKind::Package => {
                if let (Some(name), Some(root)) = (metadata.package_name(), metadata.path.parent()) {
                    table.insert(
                        name,
                        GENERIC_PLATFORM,
                        HasteEntry::Package {
                            root: root.to_path_buf(),
                            manifest: metadata.path.clone(),
                        },
                    )?;
                }
            }
            ModuleKind::Json | ModuleKind::Asset => {}
        }
        Ok(())
    }
}

#[async_trait]
impl NameIndex for HasteMap {
    async fn build(&self) -> Result<(), IndexError> {
        let files: Vec<_> = self
            .snapshot
            .files_with_extensions(CODE_EXTENSIONS)
            .into_iter()
            .filter(|p| self.is_candidate(p))
            .collect();

        let cache = Arc::clone(&self.cache);
        let loaded = tokio::task::spawn_blocking(move || {
            files
                .par_iter()
                .map(|path| match cache.load_blocking(path) {
                    Ok(metadata) => Ok(Some(metadata)),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e),
                })
                .collect::<Result<Vec<_>, MetadataError>>()
        })
        .await
        .map_err(|e| IndexError::Task(e.to_string()))??;

        // Sequential insert keeps collision reports in crawl order.
        let mut table = HasteTable::default();
        for metadata in loaded.into_iter().flatten() {
            self.register(&mut table, &metadata)?;
        }

        info!(names = table.len(), "haste map built");
        self.table.store(Arc::new(table));
        Ok(())
    }

    async fn process_file_change(&self, kind: ChangeKind, path: &Path) -> Result<(), IndexError> {
        // A delete may name a directory, so it is never filtered by extension.
        if kind != ChangeKind::Delete && !self.is_candidate(path) {
            return Ok(());
        }

        let mut table = HasteTable::clone(&self.table.load());
        let removed = table.remove_path(path);

        if kind != ChangeKind::Delete && self.snapshot.file_exists(path) {
            match self.cache.metadata(path).await {
                Ok(metadata) => self.register(&mut table, &metadata)?,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(?kind, path = %path.display(), removed, "haste map patched");
        self.table.store(Arc::new(table));
        Ok(())
    }

    fn table(&self) -> Arc<HasteTable> {
        self.table.load_full()
    }
}
