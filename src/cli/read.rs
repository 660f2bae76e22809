//! One-shot commands: deps, mocks, files

use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

use crate::config::GraphConfig;
use crate::graph::DependencyGraph;
use crate::resolver::{ResolutionResult, ResolveOptions};
use crate::watcher::ChannelWatcher;

fn one_shot(config: GraphConfig) -> DependencyGraph {
    DependencyGraph::new(config, Arc::new(ChannelWatcher::new()))
}

/// Resolve an entry and print its dependencies.
pub async fn deps(
    config: GraphConfig,
    entry: &Path,
    target: Option<String>,
    shallow_only: bool,
    json: bool,
) -> Result<()> {
    let graph = one_shot(config);
    let options = ResolveOptions {
        platform: target,
        recursive: !shallow_only,
    };
    let result = graph.get_dependencies_with(entry, options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

pub(crate) fn print_result(result: &ResolutionResult) {
    if let Some(id) = &result.main_module_id {
        println!("main: {}", id);
    }
    for path in &result.dependencies {
        println!("  {}", path.display());
    }
    for path in &result.async_dependencies {
        println!("  async {}", path.display());
    }
    for (id, path) in &result.mocks {
        println!("  mock {} -> {}", id, path.display());
    }
    println!(
        "{} modules, {} async",
        result.dependencies.len(),
        result.async_dependencies.len()
    );
}

/// Print the mock registry.
pub async fn mocks(config: GraphConfig, json: bool) -> Result<()> {
    let graph = one_shot(config);
    let Some(mocks) = graph.get_all_mocks().await? else {
        println!("Mocks are not configured (use --mocks <regex>).");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(mocks.as_ref())?);
        return Ok(());
    }
    if mocks.is_empty() {
        println!("No mocks found.");
    }
    for (id, path) in mocks.iter() {
        println!("{} {}", id, path.display());
    }
    Ok(())
}

/// Print indexed files matching a regex.
pub async fn files(config: GraphConfig, pattern: &str) -> Result<()> {
    let regex = Regex::new(pattern).map_err(|e| anyhow::anyhow!("Invalid pattern: {}", e))?;
    let graph = one_shot(config);
    let matched = graph.match_files_by_pattern(&regex).await?;

    if matched.is_empty() {
        println!("No files match '{}'", pattern);
    }
    for path in &matched {
        println!("{}", path.display());
    }
    Ok(())
}
