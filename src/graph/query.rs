//
//  query.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use parking_lot::Mutex;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::engine::DependencyGraph;
use super::mocks::MockRegistry;
use crate::error::{GraphError, Result};
use crate::paths;
use crate::platform::platform_extension;
use crate::resolver::{
    RequestContext, ResolutionRequest, ResolutionResult, ResolveOptions, ResolverOptions,
};

impl DependencyGraph {
    /// Resolve the full dependency graph of `entry` for `platform`.
    ///
    /// `entry` may be absolute, or relative to any of the roots. Without a
    /// platform, one is inferred from the entry's file name (`Foo.ios.js`).
    pub async fn get_dependencies(
        &self,
        entry: impl AsRef<Path>,
        platform: Option<&str>,
    ) -> Result<ResolutionResult> {
        let options = platform.map(ResolveOptions::platform).unwrap_or_default();
        self.get_dependencies_with(entry, options).await
    }

    pub async fn get_dependencies_with(
        &self,
        entry: impl AsRef<Path>,
        options: ResolveOptions,
    ) -> Result<ResolutionResult> {
        let config = &self.inner.config;
        if let Some(platform) = &options.platform {
            if !config.platforms().contains(platform) {
                return Err(GraphError::UnrecognizedPlatform(platform.clone()));
            }
        }

        self.ready().await?;

        let entry = self.resolve_entry(entry.as_ref()).await?;
        let platform = options
            .platform
            .or_else(|| platform_extension(&entry, config.platforms()));
        debug!(entry = %entry.display(), platform = ?platform, "resolving dependencies");

        let request = ResolutionRequest::new(self.request_context(entry, platform));
        let result = Mutex::new(ResolutionResult::default());
        tokio::try_join!(
            request.resolve_ordered(&result, options.recursive),
            request.resolve_async(&result),
        )?;
        Ok(result.into_inner())
    }

    /// The mock registry, or `None` when mocks are not configured.
    pub async fn get_all_mocks(&self) -> Result<Option<Arc<MockRegistry>>> {
        self.ready().await?;
        Ok(self.inner.mocks.load_full())
    }

    /// Known files whose absolute path matches `pattern`, in crawl order.
    pub async fn match_files_by_pattern(&self, pattern: &Regex) -> Result<Vec<PathBuf>> {
        self.ready().await?;
        Ok(self.inner.snapshot.match_by_pattern(pattern))
    }

    /// Dependency names referenced by one file, unresolved.
    pub async fn shallow_dependencies(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        self.ready().await?;
        let path = self.resolve_entry(path.as_ref()).await?;
        let metadata = self.inner.cache.metadata(&path).await?;
        Ok(metadata.dependencies.clone())
    }

    async fn resolve_entry(&self, entry: &Path) -> Result<PathBuf> {
        let snapshot = &self.inner.snapshot;
        if entry.is_absolute() {
            let path = paths::normalize(entry);
            if snapshot.file_exists(&path) || paths::is_file(&path).await {
                return Ok(path);
            }
        } else if let Some(path) = self
            .inner
            .config
            .roots()
            .iter()
            .map(|root| paths::normalize(&root.join(entry)))
            .find(|candidate| snapshot.file_exists(candidate))
        {
            return Ok(path);
        }

        Err(GraphError::EntryNotFound {
            path: entry.to_path_buf(),
            roots: self.inner.config.roots().to_vec(),
        })
    }

    fn request_context(&self, entry: PathBuf, platform: Option<String>) -> RequestContext {
        RequestContext {
            snapshot: Arc::clone(&self.inner.snapshot),
            haste: self.inner.name_index.table(),
            cache: Arc::clone(&self.inner.cache),
            assets: self.inner.assets.as_ref().map(|a| a.table()),
            mocks: self.inner.mocks.load_full(),
            platform,
            entry,
            options: ResolverOptions::from_config(&self.inner.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{graph_with, write_files};
    use super::*;
    use crate::watcher::ChannelWatcher;

    #[tokio::test]
    async fn test_index_requires_utils() {
        let dir = write_files(&[("Index.js", "var Utils = require('./Utils');"), ("Utils.js", "")]);
        let root = dir.path().to_path_buf();
        let (graph, _) = graph_with(&root, |b| b);

        let result = graph.get_dependencies(root.join("Index.js"), None).await.unwrap();
        assert_eq!(result.dependencies, vec![root.join("Index.js"), root.join("Utils.js")]);
        assert_eq!(result.pairs_of(&root.join("Index.js"))[0].name, "./Utils");

        let relative = graph.get_dependencies("Index.js", None).await.unwrap();
        assert_eq!(relative.dependencies, result.dependencies);
    }

    #[tokio::test]
    async fn test_unrecognized_platform_fails_before_start() {
        let dir = write_files(&[("Index.js", "")]);
        let (graph, index) = graph_with(dir.path(), |b| b);

        let err = graph.get_dependencies("Index.js", Some("web")).await.unwrap_err();
        assert!(matches!(err, GraphError::UnrecognizedPlatform(ref p) if p == "web"));
        assert!(graph.inner.init.lock().is_none());
        assert_eq!(index.builds.load(std::sync::atomic::Ordering::SeqCst), 0);

        assert!(graph.get_dependencies("Index.js", Some("ios")).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_entry_is_not_found() {
        let dir = write_files(&[("Index.js", "")]);
        let (graph, _) = graph_with(dir.path(), |b| b);

        let err = graph.get_dependencies("Missing.js", None).await.unwrap_err();
        assert!(matches!(err, GraphError::EntryNotFound { .. }));
        assert_eq!(err.status(), 404);

        let err = graph
            .get_dependencies(dir.path().join("Missing.js"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_platform_is_inferred_from_entry() {
        let dir = write_files(&[
            ("Foo.ios.js", "require('./Bar');"),
            ("Foo.win.js", "require('./Bar');"),
            ("Bar.js", ""),
            ("Bar.ios.js", ""),
        ]);
        let root = dir.path().to_path_buf();
        let (graph, _) = graph_with(&root, |b| b);

        let ios = graph.get_dependencies("Foo.ios.js", None).await.unwrap();
        assert_eq!(ios.dependencies[1], root.join("Bar.ios.js"));

        let win = graph.get_dependencies("Foo.win.js", None).await.unwrap();
        assert_eq!(win.dependencies[1], root.join("Bar.js"));
    }

    #[tokio::test]
    async fn test_shallow_request() {
        let dir = write_files(&[
            ("a.js", "require('./b');"),
            ("b.js", "require('./c');"),
            ("c.js", ""),
        ]);
        let root = dir.path().to_path_buf();
        let (graph, _) = graph_with(&root, |b| b);

        let options = ResolveOptions {
            recursive: false,
            ..ResolveOptions::default()
        };
        let result = graph.get_dependencies_with("a.js", options).await.unwrap();
        assert_eq!(result.dependencies, vec![root.join("a.js"), root.join("b.js")]);

        assert_eq!(graph.shallow_dependencies("b.js").await.unwrap(), vec!["./c"]);
    }

    #[tokio::test]
    async fn test_mock_collision_keeps_last_in_crawl_order() {
        let dir = write_files(&[
            ("Index.js", ""),
            ("__mocks__/foo.js", ""),
            ("__mocks__/foo.ios.js", ""),
        ]);
        let root = dir.path().to_path_buf();
        let (graph, _) = graph_with(&root, |b| b.mock_pattern("/__mocks__/"));

        let mocks = graph.get_all_mocks().await.unwrap().unwrap();
        assert_eq!(mocks.len(), 1);
        assert_eq!(mocks.get("foo"), Some(root.join("__mocks__/foo.js").as_path()));
    }

    #[tokio::test]
    async fn test_mocks_disabled_without_pattern() {
        let dir = write_files(&[("Index.js", ""), ("__mocks__/foo.js", "")]);
        let (graph, _) = graph_with(dir.path(), |b| b);
        assert!(graph.get_all_mocks().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_files_by_pattern() {
        let dir = write_files(&[("a.test.js", ""), ("b.js", ""), ("lib/c.test.js", "")]);
        let root = dir.path().to_path_buf();
        let (graph, _) = graph_with(&root, |b| b);

        let matched = graph
            .match_files_by_pattern(&Regex::new(r"\.test\.js$").unwrap())
            .await
            .unwrap();
        assert_eq!(matched, vec![root.join("a.test.js"), root.join("lib/c.test.js")]);
    }

    #[tokio::test]
    async fn test_legacy_assets() {
        let dir = write_files(&[
            ("app/Index.js", "require('image!logo');"),
            ("assets/logo.png", "png"),
        ]);
        let root = dir.path().to_path_buf();
        let config = crate::config::GraphConfig::builder([root.join("app")])
            .asset_roots([root.join("assets")])
            .asset_exts(["png"])
            .build()
            .unwrap();
        let graph = DependencyGraph::new(config, Arc::new(ChannelWatcher::new()));

        let result = graph.get_dependencies("Index.js", None).await.unwrap();
        assert_eq!(result.dependencies[1], root.join("assets/logo.png"));
    }
}
