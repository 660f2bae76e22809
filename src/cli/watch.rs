//
//  watch.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::read::print_result;
use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::watcher::NotifyWatcher;

/// Resolve `entry`, then resolve again after every settled change until Ctrl+C.
pub async fn watch(config: GraphConfig, entry: &Path, target: Option<String>) -> Result<()> {
    let watcher = NotifyWatcher::new(&config.crawl_roots()).context("failed to start file watcher")?;
    let graph = DependencyGraph::new(config, Arc::new(watcher));

    graph.start().await.map_err(GraphError::Init)?;
    resolve_and_print(&graph, entry, target.as_deref()).await?;

    let mut states = graph.subscribe();
    let mut last_settled = states.borrow_and_update().settled;
    println!("Watching for changes (Ctrl+C to stop)...");

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let settled = states.borrow_and_update().settled;
                if settled == last_settled {
                    continue;
                }
                last_settled = settled;
                if let Err(e) = resolve_and_print(&graph, entry, target.as_deref()).await {
                    if e.is_fatal() {
                        return Err(e.into());
                    }
                    warn!(error = %e, "resolution failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    graph.shutdown();
    Ok(())
}

async fn resolve_and_print(
    graph: &DependencyGraph,
    entry: &Path,
    target: Option<&str>,
) -> crate::Result<()> {
    let result = graph.get_dependencies(entry, target).await?;
    println!();
    print_result(&result);
    Ok(())
}
