//
//  error.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use std::path::PathBuf;
use std::sync::Arc;

/// Problems with the construction-time configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one root is required")]
    NoRoots,

    #[error("root must be an absolute path: {0}")]
    RelativeRoot(PathBuf),

    #[error("'{0}' is a module extension and cannot be an asset extension")]
    ReservedAssetExtension(String),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure while enumerating files under the roots.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("walk error under {root}: {message}")]
    Walk { root: PathBuf, message: String },

    #[error("crawl task failed: {0}")]
    Task(String),
}

/// Failure while computing the metadata of a single file.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize parser for {0}: {1}")]
    ParserInit(PathBuf, String),

    #[error("tree-sitter parse failed: {0}")]
    Parse(PathBuf),

    #[error("invalid package manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl MetadataError {
    /// True when the file disappeared between crawl and read.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Failure while building or patching the name index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(
        "@providesModule naming collision:\n  Duplicate module name: {name}\n  Paths: {path} collides with {existing}"
    )]
    Collision {
        name: String,
        path: PathBuf,
        existing: PathBuf,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("index task failed: {0}")]
    Task(String),
}

/// Failure while resolving one dependency reference.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Unable to resolve module `{name}` from `{from}`")]
    UnableToResolve { from: PathBuf, name: String },

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Unrecoverable failure of the initial crawl/snapshot/index sequence.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    #[error("name index build failed: {0}")]
    Index(#[from] IndexError),

    #[error("legacy asset index build failed: {0}")]
    Assets(String),
}

/// Errors surfaced to callers of [`crate::DependencyGraph`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Unrecognized platform: {0}")]
    UnrecognizedPlatform(String),

    #[error("Cannot find entry file {path} in any of the roots: {roots:?}")]
    EntryNotFound { path: PathBuf, roots: Vec<PathBuf> },

    #[error("dependency graph failed to initialize: {0}")]
    Init(Arc<InitError>),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("dependency graph has shut down")]
    Closed,
}

impl GraphError {
    /// HTTP-style status for transport layers.
    pub fn status(&self) -> u16 {
        match self {
            Self::EntryNotFound { .. } => 404,
            Self::UnrecognizedPlatform(_) | Self::Config(_) => 400,
            Self::Resolve(ResolveError::UnableToResolve { .. }) => 422,
            _ => 500,
        }
    }

    /// True for the fatal initialization failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_))
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
