//! # haste-graph
//!
//! Incremental module index and dependency resolver for JavaScript packagers.
//!
//! haste-graph crawls a set of roots, keeps an in-memory index of every
//! module, `@providesModule` name, package and legacy asset under them, and
//! resolves the full dependency graph of an entry file for a target platform.
//! The index follows filesystem changes incrementally and falls back to a
//! full rebuild when an incremental patch fails.
//!
//! ## Key Features
//!
//! - **Platform variants**: `Button.ios.js` wins over `Button.js` on iOS
//! - **Haste names**: modules and packages addressable by declared name
//! - **Mocks**: a configurable pattern swaps in test mocks
//! - **Consistent reads**: requests wait for every change scheduled before them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use haste_graph::{ChannelWatcher, DependencyGraph, GraphConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GraphConfig::builder(["/app"])
//!     .platforms(["ios", "android"])
//!     .build()?;
//! let graph = DependencyGraph::new(config, Arc::new(ChannelWatcher::new()));
//!
//! let result = graph.get_dependencies("Index.js", Some("ios")).await?;
//! for path in &result.dependencies {
//!     println!("{}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod graph;
pub mod haste;
pub mod metadata;
pub mod parser;
pub mod paths;
pub mod platform;
pub mod resolver;
pub mod snapshot;
pub mod watcher;

// Re-exports for convenience
pub use config::{GraphConfig, GraphConfigBuilder, GraphSettings};
pub use error::{GraphError, InitError, Result};
pub use graph::{BuildPhase, BuildState, DependencyGraph, MockRegistry, UpdateMode};
pub use haste::{HasteMap, HasteTable, NameIndex};
pub use metadata::{MemoryStore, MetadataStore, ModuleMetadata};
pub use resolver::{ResolutionResult, ResolveOptions};
pub use watcher::{ChangeKind, ChannelWatcher, FileChange, FileWatcher, NotifyWatcher};
