//! Legacy `image!name` lookup over the deprecated asset roots.

use arc_swap::ArcSwap;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::paths;
use crate::platform::AssetName;
use crate::watcher::ChangeKind;

/// Prefix of legacy asset requests.
pub const LEGACY_ASSET_PREFIX: &str = "image!";

/// Asset name -> files, in crawl order.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    names: HashMap<String, Vec<PathBuf>>,
}

impl AssetTable {
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.names.get(name)?.first().map(PathBuf::as_path)
    }

    /// Resolve an `image!name` request.
    pub fn resolve(&self, request: &str) -> Option<PathBuf> {
        let name = request.strip_prefix(LEGACY_ASSET_PREFIX)?;
        self.get(name).map(Path::to_path_buf)
    }

    fn insert(&mut self, name: String, path: PathBuf) {
        let files = self.names.entry(name).or_default();
        if !files.contains(&path) {
            files.push(path);
        }
    }

    /// Drop every file at or below `path`.
    fn remove_path(&mut self, path: &Path) {
        self.names.retain(|_, files| {
            files.retain(|f| !f.starts_with(path));
            !files.is_empty()
        });
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub struct LegacyAssetIndex {
    roots: Vec<PathBuf>,
    exts: Vec<String>,
    platforms: HashSet<String>,
    table: ArcSwap<AssetTable>,
}

impl LegacyAssetIndex {
    /// `None` when no asset roots are configured.
    pub fn from_config(config: &GraphConfig) -> Option<Self> {
        if config.asset_roots().is_empty() {
            return None;
        }
        Some(Self {
            roots: config.asset_roots().to_vec(),
            exts: config.asset_exts().to_vec(),
            platforms: config.platforms().clone(),
            table: ArcSwap::from_pointee(AssetTable::default()),
        })
    }

    /// True when `path` lies under one of the asset roots.
    pub fn covers(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }

    fn is_asset(&self, path: &Path) -> bool {
        self.covers(path)
            && paths::extension(path).is_some_and(|ext| self.exts.iter().any(|e| e == ext))
    }

    fn name_of(&self, path: &Path) -> Option<String> {
        AssetName::parse(path, &self.platforms).map(|asset| asset.name)
    }

    /// Rebuild from the crawl result.
    pub fn build(&self, crawl: &[PathBuf]) -> usize {
        let mut table = AssetTable::default();
        for path in crawl.iter().filter(|p| self.is_asset(p)) {
            if let Some(name) = self.name_of(path) {
                table.insert(name, path.clone());
            }
        }
        let count = table.len();
        info!(assets = count, "legacy asset index built");
        self.table.store(Arc::new(table));
        count
    }

    /// Follow one change. Deletes may name a directory and drop its subtree.
    pub async fn process_file_change(&self, kind: ChangeKind, path: &Path) {
        let relevant = match kind {
            ChangeKind::Delete => self.covers(path),
            ChangeKind::Add | ChangeKind::Change => self.is_asset(path),
        };
        if !relevant {
            return;
        }

        let mut table = AssetTable::clone(&self.table.load());
        table.remove_path(path);
        if kind != ChangeKind::Delete && paths::is_file(path).await {
            if let Some(name) = self.name_of(path) {
                table.insert(name, path.to_path_buf());
            }
        }
        debug!(?kind, path = %path.display(), "legacy asset index patched");
        self.table.store(Arc::new(table));
    }

    /// The current table; requests hold it for their whole lifetime.
    pub fn table(&self) -> Arc<AssetTable> {
        self.table.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn index(root: &Path) -> LegacyAssetIndex {
        let config = GraphConfig::builder([root.join("app")])
            .asset_roots([root.join("assets")])
            .asset_exts(["png"])
            .platforms(["ios"])
            .build()
            .unwrap();
        LegacyAssetIndex::from_config(&config).unwrap()
    }

    #[test]
    fn test_disabled_without_asset_roots() {
        let config = GraphConfig::builder(["/app"]).build().unwrap();
        assert!(LegacyAssetIndex::from_config(&config).is_none());
    }

    #[test]
    fn test_build_and_resolve() {
        let root = Path::new("/work");
        let index = index(root);
        index.build(&[
            root.join("assets/logo.png"),
            root.join("assets/logo@2x.ios.png"),
            root.join("assets/readme.txt"),
            root.join("app/icon.png"),
        ]);

        let table = index.table();
        assert_eq!(table.resolve("image!logo"), Some(root.join("assets/logo.png")));
        assert_eq!(table.resolve("image!icon"), None);
        assert_eq!(table.resolve("logo"), None);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_changes_follow_the_disk() {
        let dir = tempfile::tempdir().unwrap();
        let index = index(dir.path());
        let assets = dir.path().join("assets");
        fs::create_dir_all(&assets).unwrap();
        index.build(&[]);

        let star = assets.join("star.png");
        fs::write(&star, b"png").unwrap();
        index.process_file_change(ChangeKind::Add, &star).await;
        assert_eq!(index.table().resolve("image!star"), Some(star.clone()));

        fs::remove_file(&star).unwrap();
        index.process_file_change(ChangeKind::Delete, &star).await;
        assert_eq!(index.table().resolve("image!star"), None);
    }

    #[tokio::test]
    async fn test_deleted_directory_drops_its_assets() {
        let root = Path::new("/work");
        let index = index(root);
        index.build(&[
            root.join("assets/icons/star.png"),
            root.join("assets/icons/moon.png"),
            root.join("assets/logo.png"),
        ]);

        index
            .process_file_change(ChangeKind::Delete, &root.join("assets/icons"))
            .await;

        let table = index.table();
        assert_eq!(table.resolve("image!star"), None);
        assert_eq!(table.resolve("image!moon"), None);
        assert_eq!(table.resolve("image!logo"), Some(root.join("assets/logo.png")));
    }
}
