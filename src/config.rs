//
//  config.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::metadata::{MemoryStore, MetadataStore};

/// Extensions every crawl includes, before any asset extensions.
pub const CODE_EXTENSIONS: &[&str] = &["js", "json"];

/// Predicate deciding whether an absolute path is excluded everywhere.
pub type IgnoreFn = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

// ─── File form ──────────────────────────────────────────────────

/// Top-level file configuration (`haste-graph.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSettings {
    #[serde(default)]
    pub graph: GraphSection,
}

/// The `[graph]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSection {
    /// Roots to index, relative to the config file's directory.
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,
    /// Deprecated asset roots (`image!name` lookups).
    #[serde(default)]
    pub asset_roots: Vec<String>,
    /// Extensions crawled in addition to js/json.
    #[serde(default)]
    pub asset_exts: Vec<String>,
    /// Platform allow-list.
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Regex over absolute paths selecting mock files.
    #[serde(default)]
    pub mock_pattern: Option<String>,
    /// Regexes over absolute paths that are never indexed.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub prefer_native_platform: bool,
    #[serde(default)]
    pub provides_module_node_modules: Vec<String>,
    #[serde(default)]
    pub throw_on_unresolved: bool,
}

fn default_roots() -> Vec<String> {
    vec![".".to_string()]
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            asset_roots: Vec::new(),
            asset_exts: Vec::new(),
            platforms: Vec::new(),
            mock_pattern: None,
            ignore: Vec::new(),
            prefer_native_platform: false,
            provides_module_node_modules: Vec::new(),
            throw_on_unresolved: false,
        }
    }
}

impl GraphSettings {
    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Turn the file form into a validated [`GraphConfig`], resolving relative
    /// paths against `base_dir`.
    pub fn into_config(self, base_dir: &Path) -> Result<GraphConfig, ConfigError> {
        let section = self.graph;
        let resolve = |p: &String| crate::paths::normalize(&base_dir.join(p));

        let ignore = section
            .ignore
            .iter()
            .map(|pattern| compile(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = GraphConfig::builder(section.roots.iter().map(resolve))
            .asset_roots(section.asset_roots.iter().map(resolve))
            .asset_exts(section.asset_exts)
            .platforms(section.platforms)
            .prefer_native_platform(section.prefer_native_platform)
            .provides_module_node_modules(section.provides_module_node_modules)
            .throw_on_unresolved(section.throw_on_unresolved);

        if !ignore.is_empty() {
            builder = builder.ignore_file_path(move |path: &Path| {
                let text = path.to_string_lossy();
                ignore.iter().any(|re| re.is_match(&text))
            });
        }
        if let Some(pattern) = section.mock_pattern {
            builder = builder.mock_pattern(pattern);
        }
        builder.build()
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

// ─── Runtime form ───────────────────────────────────────────────

/// Immutable configuration of a [`crate::DependencyGraph`].
///
/// Built once through [`GraphConfigBuilder`]; validated at `build()` and
/// never mutated afterwards.
#[derive(Clone)]
pub struct GraphConfig {
    roots: Vec<PathBuf>,
    ignore: IgnoreFn,
    asset_roots: Vec<PathBuf>,
    asset_exts: Vec<String>,
    platforms: HashSet<String>,
    cache: Arc<dyn MetadataStore>,
    mock_pattern: Option<Regex>,
    prefer_native_platform: bool,
    provides_module_node_modules: Vec<String>,
    throw_on_unresolved: bool,
}

impl GraphConfig {
    pub fn builder<I, P>(roots: I) -> GraphConfigBuilder
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        GraphConfigBuilder::new(roots)
    }

    /// Roots in resolution order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn asset_roots(&self) -> &[PathBuf] {
        &self.asset_roots
    }

    pub fn asset_exts(&self) -> &[String] {
        &self.asset_exts
    }

    pub fn platforms(&self) -> &HashSet<String> {
        &self.platforms
    }

    pub fn cache(&self) -> &Arc<dyn MetadataStore> {
        &self.cache
    }

    pub fn mock_pattern(&self) -> Option<&Regex> {
        self.mock_pattern.as_ref()
    }

    pub fn prefer_native_platform(&self) -> bool {
        self.prefer_native_platform
    }

    pub fn provides_module_node_modules(&self) -> &[String] {
        &self.provides_module_node_modules
    }

    pub fn throw_on_unresolved(&self) -> bool {
        self.throw_on_unresolved
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        (self.ignore)(path)
    }

    pub fn ignore_fn(&self) -> IgnoreFn {
        Arc::clone(&self.ignore)
    }

    /// Roots followed by legacy asset roots, deduplicated, in order.
    pub fn crawl_roots(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        for root in self.roots.iter().chain(self.asset_roots.iter()) {
            if !out.contains(root) {
                out.push(root.clone());
            }
        }
        out
    }

    /// js, json, then the asset extensions.
    pub fn crawl_extensions(&self) -> Vec<String> {
        let mut out: Vec<String> = CODE_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        for ext in &self.asset_exts {
            if !out.contains(ext) {
                out.push(ext.clone());
            }
        }
        out
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("roots", &self.roots)
            .field("asset_roots", &self.asset_roots)
            .field("asset_exts", &self.asset_exts)
            .field("platforms", &self.platforms)
            .field("mock_pattern", &self.mock_pattern.as_ref().map(|r| r.as_str()))
            .field("prefer_native_platform", &self.prefer_native_platform)
            .field(
                "provides_module_node_modules",
                &self.provides_module_node_modules,
            )
            .field("throw_on_unresolved", &self.throw_on_unresolved)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GraphConfig`]; every option starts at its documented default.
pub struct GraphConfigBuilder {
    roots: Vec<PathBuf>,
    ignore: IgnoreFn,
    asset_roots: Vec<PathBuf>,
    asset_exts: Vec<String>,
    platforms: HashSet<String>,
    cache: Arc<dyn MetadataStore>,
    mock_pattern: Option<String>,
    prefer_native_platform: bool,
    provides_module_node_modules: Vec<String>,
    throw_on_unresolved: bool,
}

impl GraphConfigBuilder {
    fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ignore: Arc::new(|_: &Path| false),
            asset_roots: Vec::new(),
            asset_exts: Vec::new(),
            platforms: HashSet::new(),
            cache: Arc::new(MemoryStore::default()),
            mock_pattern: None,
            prefer_native_platform: false,
            provides_module_node_modules: Vec::new(),
            throw_on_unresolved: false,
        }
    }

    pub fn ignore_file_path<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.ignore = Arc::new(predicate);
        self
    }

    pub fn asset_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.asset_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn asset_exts<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asset_exts = exts
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    pub fn cache(mut self, cache: Arc<dyn MetadataStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn mock_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.mock_pattern = Some(pattern.into());
        self
    }

    pub fn prefer_native_platform(mut self, prefer: bool) -> Self {
        self.prefer_native_platform = prefer;
        self
    }

    pub fn provides_module_node_modules<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides_module_node_modules = packages.into_iter().map(Into::into).collect();
        self
    }

    pub fn throw_on_unresolved(mut self, throw: bool) -> Self {
        self.throw_on_unresolved = throw;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<GraphConfig, ConfigError> {
        if self.roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }
        if let Some(root) = self
            .roots
            .iter()
            .chain(self.asset_roots.iter())
            .find(|r| !r.is_absolute())
        {
            return Err(ConfigError::RelativeRoot(root.clone()));
        }
        if let Some(ext) = self
            .asset_exts
            .iter()
            .find(|ext| CODE_EXTENSIONS.contains(&ext.as_str()))
        {
            return Err(ConfigError::ReservedAssetExtension(ext.clone()));
        }
        let mock_pattern = self.mock_pattern.as_deref().map(compile).transpose()?;

        Ok(GraphConfig {
            roots: self.roots.iter().map(|r| crate::paths::normalize(r)).collect(),
            ignore: self.ignore,
            asset_roots: self
                .asset_roots
                .iter()
                .map(|r| crate::paths::normalize(r))
                .collect(),
            asset_exts: self.asset_exts,
            platforms: self.platforms,
            cache: self.cache,
            mock_pattern,
            prefer_native_platform: self.prefer_native_platform,
            provides_module_node_modules: self.provides_module_node_modules,
            throw_on_unresolved: self.throw_on_unresolved,
        })
    }
}
