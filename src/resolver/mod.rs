//! Per-request dependency resolution.
//!
//! A [`ResolutionRequest`] is bound to one entry file, one platform, and the
//! index snapshots loaded when the request started. It never observes later
//! index updates.

mod result;

pub use result::{ResolutionResult, ResolvedPair};

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::assets::{AssetTable, LEGACY_ASSET_PREFIX};
use crate::config::GraphConfig;
use crate::error::ResolveError;
use crate::graph::MockRegistry;
use crate::haste::{HasteEntry, HasteTable};
use crate::metadata::ModuleCache;
use crate::paths;
use crate::platform::{AssetName, NATIVE_PLATFORM};
use crate::snapshot::FileSnapshot;

/// Per-call knobs of [`crate::DependencyGraph::get_dependencies_with`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub platform: Option<String>,
    /// `false` collects only the entry's direct dependencies.
    pub recursive: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            platform: None,
            recursive: true,
        }
    }
}

impl ResolveOptions {
    pub fn platform(platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            ..Self::default()
        }
    }
}

/// Resolver settings taken from the graph configuration.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    pub platforms: HashSet<String>,
    pub asset_exts: Vec<String>,
    pub prefer_native_platform: bool,
    pub provides_module_node_modules: Vec<String>,
    pub throw_on_unresolved: bool,
}

impl ResolverOptions {
    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            platforms: config.platforms().clone(),
            asset_exts: config.asset_exts().to_vec(),
            prefer_native_platform: config.prefer_native_platform(),
            provides_module_node_modules: config.provides_module_node_modules().to_vec(),
            throw_on_unresolved: config.throw_on_unresolved(),
        }
    }
}

/// Everything one request resolves against.
pub struct RequestContext {
    pub snapshot: Arc<FileSnapshot>,
    pub haste: Arc<HasteTable>,
    pub cache: Arc<ModuleCache>,
    pub assets: Option<Arc<AssetTable>>,
    pub mocks: Option<Arc<MockRegistry>>,
    pub platform: Option<String>,
    pub entry: PathBuf,
    pub options: ResolverOptions,
}

pub struct ResolutionRequest {
    ctx: RequestContext,
    memo: Mutex<HashMap<(PathBuf, String), Option<PathBuf>>>,
}

impl ResolutionRequest {
    pub fn new(ctx: RequestContext) -> Self {
        Self {
            ctx,
            memo: Mutex::new(HashMap::new()),
        }
    }

    // ─── Traversal ──────────────────────────────────────────────

    /// Collect the entry and its synchronous dependencies into `result`.
    ///
    /// Each module's newly seen dependencies are appended in source order,
    /// then expanded depth-first, so the output is deterministic.
    pub async fn resolve_ordered(
        &self,
        result: &Mutex<ResolutionResult>,
        recursive: bool,
    ) -> Result<(), ResolveError> {
        let entry = self.ctx.entry.clone();
        let entry_metadata = self.ctx.cache.metadata(&entry).await?;
        {
            let mut result = result.lock();
            result.main_module_id = Some(
                entry_metadata
                    .haste_name
                    .clone()
                    .unwrap_or_else(|| entry.display().to_string()),
            );
            result.dependencies.push(entry.clone());
        }

        let mut visited: HashSet<PathBuf> = HashSet::from([entry.clone()]);
        let mut stack = vec![entry];

        while let Some(module) = stack.pop() {
            let resolved = self.resolve_module(&module, result).await?;

            let fresh: Vec<PathBuf> = resolved
                .into_iter()
                .filter(|path| visited.insert(path.clone()))
                .collect();
            result.lock().dependencies.extend(fresh.iter().cloned());

            if recursive {
                stack.extend(fresh.into_iter().rev());
            }
        }

        Ok(())
    }

    /// Resolve the entry module's `import()` references. Each must resolve.
    pub async fn resolve_async(&self, result: &Mutex<ResolutionResult>) -> Result<(), ResolveError> {
        let entry = &self.ctx.entry;
        let metadata = self.ctx.cache.metadata(entry).await?;

        for name in &metadata.async_dependencies {
            let path = self.resolve_dependency(entry, name).await?.ok_or_else(|| {
                ResolveError::UnableToResolve {
                    from: entry.clone(),
                    name: name.clone(),
                }
            })?;
            let mut result = result.lock();
            result.record_pair(entry, name, &path);
            result.async_dependencies.push(path);
        }
        Ok(())
    }

    /// Resolve every reference of one module, recording pairs and mocks.
    async fn resolve_module(
        &self,
        module: &Path,
        result: &Mutex<ResolutionResult>,
    ) -> Result<Vec<PathBuf>, ResolveError> {
        let metadata = self.ctx.cache.metadata(module).await?;
        let mut resolved = Vec::with_capacity(metadata.dependencies.len() + 1);

        for name in &metadata.dependencies {
            match self.resolve_dependency(module, name).await? {
                Some(path) => {
                    result.lock().record_pair(module, name, &path);
                    resolved.push(path);
                }
                None => match self.mock_for(name) {
                    Some(mock) => {
                        let mut result = result.lock();
                        result.record_pair(module, name, &mock);
                        result.mocks.insert(name.clone(), mock.clone());
                        resolved.push(mock);
                    }
                    None if self.ctx.options.throw_on_unresolved => {
                        return Err(ResolveError::UnableToResolve {
                            from: module.to_path_buf(),
                            name: name.clone(),
                        });
                    }
                    None => {
                        warn!(from = %module.display(), name = %name, "unable to resolve module");
                    }
                },
            }
        }

        if let Some(haste_name) = &metadata.haste_name {
            if let Some(mock) = self.mock_for(haste_name) {
                let mut result = result.lock();
                result.record_pair(module, haste_name, &mock);
                result.mocks.insert(haste_name.clone(), mock.clone());
                resolved.push(mock);
            }
        }

        Ok(resolved)
    }

    fn mock_for(&self, name: &str) -> Option<PathBuf> {
        self.ctx
            .mocks
            .as_ref()
            .and_then(|mocks| mocks.get(name))
            .map(Path::to_path_buf)
    }

    // ─── Single reference ───────────────────────────────────────

    /// Resolve `name` as referenced from `from`. `Ok(None)` means not found.
    pub async fn resolve_dependency(
        &self,
        from: &Path,
        name: &str,
    ) -> Result<Option<PathBuf>, ResolveError> {
        let key = (from.to_path_buf(), name.to_string());
        if let Some(hit) = self.memo.lock().get(&key) {
            return Ok(hit.clone());
        }

        let resolved = self.resolve_uncached(from, name).await?;
        debug!(from = %from.display(), name, resolved = ?resolved, "resolved dependency");
        self.memo.lock().insert(key, resolved.clone());
        Ok(resolved)
    }

    async fn resolve_uncached(&self, from: &Path, name: &str) -> Result<Option<PathBuf>, ResolveError> {
        if name.starts_with(LEGACY_ASSET_PREFIX) {
            if let Some(path) = self
                .ctx
                .assets
                .as_deref()
                .and_then(|table| table.resolve(name))
            {
                return Ok(Some(path));
            }
        }

        let is_path = paths::is_relative_import(name) || paths::is_absolute_import(name);
        if !is_path && !paths::is_node_modules_dir(from, &self.ctx.options.provides_module_node_modules) {
            if let Some(path) = self.resolve_haste(name).await? {
                return Ok(Some(path));
            }
        }

        self.resolve_node(from, name).await
    }

    async fn resolve_haste(&self, name: &str) -> Result<Option<PathBuf>, ResolveError> {
        let platform = self.ctx.platform.as_deref();
        let prefer_native = self.ctx.options.prefer_native_platform;

        match self.ctx.haste.get(name, platform, prefer_native) {
            Some(HasteEntry::Module(path)) => return Ok(Some(path.clone())),
            Some(HasteEntry::Package { root, .. }) => return self.load_as_dir(root).await,
            None => {}
        }

        // `pkg/sub/path`: longest registered package prefix wins.
        let parts: Vec<&str> = name.split('/').collect();
        for split in (1..parts.len()).rev() {
            let prefix = parts[..split].join("/");
            if let Some(HasteEntry::Package { root, .. }) =
                self.ctx.haste.get(&prefix, platform, prefer_native)
            {
                let target = root.join(parts[split..].join("/"));
                return self.load_as_file_or_dir(&target).await;
            }
        }
        Ok(None)
    }

    async fn resolve_node(&self, from: &Path, name: &str) -> Result<Option<PathBuf>, ResolveError> {
        if paths::is_absolute_import(name) {
            return self.load_as_file_or_dir(&paths::normalize(Path::new(name))).await;
        }

        let dir = from.parent().unwrap_or(from);
        if paths::is_relative_import(name) {
            return self.load_as_file_or_dir(&paths::normalize(&dir.join(name))).await;
        }

        for ancestor in dir.ancestors() {
            if ancestor.file_name().is_some_and(|n| n == "node_modules") {
                continue;
            }
            let candidate = ancestor.join("node_modules").join(name);
            if let Some(path) = self.load_as_file_or_dir(&candidate).await? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    // ─── Filesystem probing ─────────────────────────────────────

    async fn load_as_file_or_dir(&self, path: &Path) -> Result<Option<PathBuf>, ResolveError> {
        if let Some(file) = self.load_as_file(path).await {
            return Ok(Some(file));
        }
        if self.dir_exists(path).await {
            return self.load_as_dir(path).await;
        }
        Ok(None)
    }

    async fn load_as_file(&self, path: &Path) -> Option<PathBuf> {
        if self.file_exists(path).await {
            return Some(path.to_path_buf());
        }

        if let Some(asset) = self.load_asset_variant(path) {
            return Some(asset);
        }

        let mut suffixes = Vec::with_capacity(4);
        if let Some(platform) = &self.ctx.platform {
            suffixes.push(format!(".{platform}.js"));
        }
        if self.ctx.options.prefer_native_platform {
            suffixes.push(format!(".{NATIVE_PLATFORM}.js"));
        }
        suffixes.push(".js".to_string());
        suffixes.push(".json".to_string());

        for suffix in &suffixes {
            let candidate = paths::with_suffix(path, suffix);
            if self.file_exists(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// `./logo.png` matches `logo@2x.png`, `logo.ios.png` and friends.
    fn load_asset_variant(&self, path: &Path) -> Option<PathBuf> {
        let ext = paths::extension(path)?;
        if !self.ctx.options.asset_exts.iter().any(|e| e == ext) {
            return None;
        }
        let asset = AssetName::parse(path, &self.ctx.options.platforms)?;
        let pattern = asset.variants_pattern(self.ctx.platform.as_deref())?;
        let dir = path.parent()?;
        self.ctx.snapshot.matches(dir, &pattern).into_iter().next()
    }

    async fn load_as_dir(&self, dir: &Path) -> Result<Option<PathBuf>, ResolveError> {
        let manifest = dir.join("package.json");
        if self.file_exists(&manifest).await {
            let metadata = self.ctx.cache.metadata(&manifest).await?;
            let main = metadata
                .package
                .as_ref()
                .map(|p| p.main().to_string())
                .unwrap_or_else(|| "index".to_string());
            let target = paths::normalize(&dir.join(main));
            if let Some(file) = self.load_as_file(&target).await {
                return Ok(Some(file));
            }
            return Ok(self.load_as_file(&target.join("index")).await);
        }
        Ok(self.load_as_file(&dir.join("index")).await)
    }

    /// The snapshot answers inside the roots; the disk answers outside them.
    async fn file_exists(&self, path: &Path) -> bool {
        if self.ctx.snapshot.root_of(path).is_some() {
            self.ctx.snapshot.file_exists(path)
        } else {
            paths::is_file(path).await
        }
    }

    async fn dir_exists(&self, path: &Path) -> bool {
        if self.ctx.snapshot.root_of(path).is_some() {
            self.ctx.snapshot.dir_exists(path)
        } else {
            paths::is_dir(path).await
        }
    }
}
