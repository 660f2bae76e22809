//! CLI module for haste-graph.
//!
//! Commands:
//! - Resolve: deps
//! - Inspect: mocks, files
//! - Live: watch

pub mod read;
pub mod watch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{GraphConfig, GraphSettings};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "haste-graph.toml";

#[derive(Parser, Debug)]
#[command(name = "haste-graph")]
#[command(about = "haste-graph - module index and dependency resolver for JavaScript packagers", long_about = None)]
pub struct Cli {
    /// Root directory to index (repeatable; default: from config, else ".")
    #[arg(short, long = "root")]
    pub roots: Vec<PathBuf>,

    /// Config file (default: ./haste-graph.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Allowed platform (repeatable)
    #[arg(short, long = "platform")]
    pub platforms: Vec<String>,

    /// Regex over absolute paths selecting mock files
    #[arg(long)]
    pub mocks: Option<String>,

    /// Legacy asset root for `image!name` requests (repeatable)
    #[arg(long = "asset-root")]
    pub asset_roots: Vec<PathBuf>,

    /// Extra extension to crawl, e.g. png (repeatable)
    #[arg(long = "asset-ext")]
    pub asset_exts: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    // ─── Resolve ──────────────────────────────────────────────────
    /// Print the dependency graph of an entry file
    Deps {
        /// Entry file, absolute or relative to a root
        entry: PathBuf,

        /// Target platform (default: inferred from the entry name)
        #[arg(short, long)]
        target: Option<String>,

        /// Only the entry's direct dependencies
        #[arg(long)]
        shallow_only: bool,

        /// Emit the full result as JSON
        #[arg(long)]
        json: bool,
    },

    // ─── Inspect ──────────────────────────────────────────────────
    /// List registered mocks
    Mocks {
        #[arg(long)]
        json: bool,
    },

    /// List indexed files whose path matches a regex
    Files {
        pattern: String,
    },

    // ─── Live ─────────────────────────────────────────────────────
    /// Watch the roots and re-resolve an entry after every change
    Watch {
        entry: PathBuf,

        #[arg(short, long)]
        target: Option<String>,
    },
}

impl Cli {
    /// Merge the config file with command-line overrides.
    pub fn graph_config(&self) -> Result<GraphConfig> {
        let cwd = std::env::current_dir().context("cannot read current directory")?;
        let config_path = self
            .config
            .as_ref()
            .map(|p| absolutize(&cwd, p))
            .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_FILE));
        let base = config_path.parent().unwrap_or(&cwd).to_path_buf();

        let mut settings = GraphSettings::load(&config_path)?;
        let section = &mut settings.graph;

        if !self.roots.is_empty() {
            section.roots = self.roots.iter().map(|r| path_string(&cwd, r)).collect();
        }
        section
            .asset_roots
            .extend(self.asset_roots.iter().map(|r| path_string(&cwd, r)));
        section.asset_exts.extend(self.asset_exts.iter().cloned());
        section.platforms.extend(self.platforms.iter().cloned());
        if let Some(pattern) = &self.mocks {
            section.mock_pattern = Some(pattern.clone());
        }

        Ok(settings.into_config(&base)?)
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.graph_config()?;
    tracing::debug!(config = ?config, "configuration loaded");

    match cli.command {
        Commands::Deps {
            entry,
            target,
            shallow_only,
            json,
        } => read::deps(config, &entry, target, shallow_only, json).await,
        Commands::Mocks { json } => read::mocks(config, json).await,
        Commands::Files { pattern } => read::files(config, &pattern).await,
        Commands::Watch { entry, target } => watch::watch(config, &entry, target).await,
    }
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    crate::paths::normalize(&cwd.join(path))
}

fn path_string(cwd: &Path, path: &Path) -> String {
    absolutize(cwd, path).to_string_lossy().into_owned()
}
