//
//  mutation.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use std::sync::atomic::Ordering;
use std::sync::Weak;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::engine::{DependencyGraph, InitFuture, Inner};
use super::state::UpdateMode;
use crate::paths;
use crate::watcher::FileChange;

impl DependencyGraph {
    /// Feed one filesystem change into the graph.
    ///
    /// Updates the snapshot and drops the cached metadata of every file the
    /// change touched, then schedules the index update. Returns whether an
    /// update was scheduled.
    pub fn notify_change(&self, change: FileChange) -> bool {
        let mut touched = self.inner.snapshot.apply_change(&change);
        if touched.is_empty() && !change.targets_directory() {
            touched.push(change.absolute_path());
        }
        for path in &touched {
            self.inner.cache.invalidate(path);
        }
        self.process_file_change(change)
    }

    /// Schedule an index update for `change` on the update actor.
    ///
    /// Directories, ignored paths and files under excluded `node_modules` are
    /// rejected without touching any state. A delete is never a directory
    /// event; the index drops every entry at or below its path.
    pub fn process_file_change(&self, change: FileChange) -> bool {
        let path = change.absolute_path();
        let config = &self.inner.config;
        if change.targets_directory()
            || config.is_ignored(&path)
            || paths::is_node_modules_dir(&path, config.provides_module_node_modules())
        {
            debug!(path = %path.display(), "change ignored");
            return false;
        }

        self.inner.scheduled.fetch_add(1, Ordering::SeqCst);
        let kind = change.kind;
        if self.inner.updates.send(change).is_err() {
            self.inner.scheduled.fetch_sub(1, Ordering::SeqCst);
            warn!(path = %path.display(), "update actor is gone, change dropped");
            return false;
        }
        debug!(?kind, path = %path.display(), "change scheduled");
        true
    }
}

/// The single mutator of the name index after start-up.
///
/// Holds the graph weakly so dropping the last handle ends it.
pub(crate) fn spawn_update_actor(
    graph: Weak<Inner>,
    cancel: CancellationToken,
    mut changes: mpsc::UnboundedReceiver<FileChange>,
    init: InitFuture,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if init.await.is_err() {
            return;
        }

        let mut mode = UpdateMode::Clean;
        loop {
            let change = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                change = changes.recv() => match change {
                    Some(change) => change,
                    None => break,
                },
            };
            let Some(inner) = graph.upgrade() else { break };
            mode = inner.apply_change(mode, &change).await;
        }
        debug!("update actor stopped");
    })
}

/// Forward watcher events into [`DependencyGraph::notify_change`].
pub(crate) fn spawn_watch_pump(
    graph: Weak<Inner>,
    cancel: CancellationToken,
    mut events: mpsc::UnboundedReceiver<FileChange>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(change) => {
                        let Some(inner) = graph.upgrade() else { break };
                        DependencyGraph { inner }.notify_change(change);
                    }
                    None => break,
                },
            }
        }
        debug!("watch pump stopped");
    })
}

impl Inner {
    /// Apply one change and publish the next build state.
    async fn apply_change(&self, mode: UpdateMode, change: &FileChange) -> UpdateMode {
        let path = change.absolute_path();

        if let Some(assets) = &self.assets {
            if assets.covers(&path) {
                assets.process_file_change(change.kind, &path).await;
            }
        }

        let (next, rebuilt) = match mode {
            UpdateMode::NeedsFullRebuild => {
                self.rebuild_mocks();
                match self.name_index.build().await {
                    Ok(()) => {
                        info!("index recovered with a full rebuild");
                        (UpdateMode::Clean, true)
                    }
                    Err(err) => {
                        warn!(error = %err, "full rebuild failed");
                        (UpdateMode::NeedsFullRebuild, true)
                    }
                }
            }
            UpdateMode::Clean => match self.name_index.process_file_change(change.kind, &path).await {
                Ok(()) => (UpdateMode::Clean, false),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "incremental update failed, next change triggers a full rebuild"
                    );
                    (UpdateMode::NeedsFullRebuild, false)
                }
            },
        };

        self.state.send_modify(|state| {
            state.settled += 1;
            state.mode = next;
            if rebuilt {
                state.full_rebuilds += 1;
            } else {
                state.incremental_updates += 1;
            }
        });
        next
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::UpdateMode;
    use super::super::testing::{graph_with, graph_with_watcher, write_files};
    use crate::error::GraphError;
    use crate::watcher::{ChangeKind, FileChange};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failed_update_forces_full_rebuild_on_next_change() {
        let dir = write_files(&[("Index.js", "require('Utils');"), ("Utils.js", "/** @providesModule Utils */")]);
        let root = dir.path().to_path_buf();
        let (graph, index) = graph_with(&root, |b| b);
        graph.start().await.unwrap();

        // Step k fails.
        index.fail_updates.store(true, Ordering::SeqCst);
        assert!(graph.notify_change(FileChange::new(ChangeKind::Change, "Utils.js", &root)));
        graph.ready().await.unwrap();
        let state = graph.build_state();
        assert_eq!(state.mode, UpdateMode::NeedsFullRebuild);
        assert_eq!(index.updates.load(Ordering::SeqCst), 1);
        assert_eq!(index.builds.load(Ordering::SeqCst), 1);

        // Step k + 1 rebuilds instead of patching.
        index.fail_updates.store(false, Ordering::SeqCst);
        graph.notify_change(FileChange::new(ChangeKind::Change, "Index.js", &root));
        graph.ready().await.unwrap();
        let state = graph.build_state();
        assert_eq!(state.mode, UpdateMode::Clean);
        assert_eq!(state.full_rebuilds, 1);
        assert_eq!(index.builds.load(Ordering::SeqCst), 2);
        assert_eq!(index.updates.load(Ordering::SeqCst), 1);

        // Back to incremental.
        graph.notify_change(FileChange::new(ChangeKind::Change, "Index.js", &root));
        graph.ready().await.unwrap();
        assert_eq!(index.updates.load(Ordering::SeqCst), 2);
        assert_eq!(graph.build_state().settled, 3);
    }

    #[tokio::test]
    async fn test_failed_rebuild_stays_dirty() {
        let dir = write_files(&[("Index.js", "")]);
        let root = dir.path().to_path_buf();
        let (graph, index) = graph_with(&root, |b| b);
        graph.start().await.unwrap();

        index.fail_updates.store(true, Ordering::SeqCst);
        index.fail_builds.store(true, Ordering::SeqCst);
        graph.notify_change(FileChange::new(ChangeKind::Change, "Index.js", &root));
        graph.notify_change(FileChange::new(ChangeKind::Change, "Index.js", &root));
        graph.ready().await.unwrap();
        assert_eq!(graph.build_state().mode, UpdateMode::NeedsFullRebuild);

        index.fail_builds.store(false, Ordering::SeqCst);
        graph.notify_change(FileChange::new(ChangeKind::Change, "Index.js", &root));
        graph.ready().await.unwrap();
        assert_eq!(graph.build_state().mode, UpdateMode::Clean);
        assert_eq!(graph.build_state().full_rebuilds, 2);
    }

    #[tokio::test]
    async fn test_rejected_changes_are_not_scheduled() {
        let dir = write_files(&[("Index.js", "")]);
        let root = dir.path().to_path_buf();
        let (graph, index) = graph_with(&root, |b| {
            b.ignore_file_path(|p| p.to_string_lossy().contains("/build/"))
        });
        graph.start().await.unwrap();

        let mut dir_event = FileChange::new(ChangeKind::Add, "lib", &root);
        dir_event.is_dir = true;
        assert!(!graph.notify_change(dir_event));
        assert!(!graph.notify_change(FileChange::new(ChangeKind::Add, "build/out.js", &root)));
        assert!(!graph.notify_change(FileChange::new(
            ChangeKind::Add,
            "node_modules/dep/index.js",
            &root
        )));

        graph.ready().await.unwrap();
        assert_eq!(graph.build_state().settled, 0);
        assert_eq!(index.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_haste_module_incrementally() {
        let dir = write_files(&[("Index.js", "require('Utils');"), ("Utils.js", "/** @providesModule Utils */")]);
        let root = dir.path().to_path_buf();
        let (graph, index) = graph_with(&root, |b| b);

        let before = graph.get_dependencies("Index.js", None).await.unwrap();
        assert!(before.contains(&root.join("Utils.js")));

        std::fs::remove_file(root.join("Utils.js")).unwrap();
        graph.notify_change(FileChange::new(ChangeKind::Delete, "Utils.js", &root));

        let after = graph.get_dependencies("Index.js", None).await.unwrap();
        assert_eq!(after.dependencies, vec![root.join("Index.js")]);

        let state = graph.build_state();
        assert_eq!(state.full_rebuilds, 0);
        assert_eq!(state.incremental_updates, 1);
        assert_eq!(index.builds.load(Ordering::SeqCst), 1);
        assert!(!index.table_contains("Utils"));
    }

    #[tokio::test]
    async fn test_moving_a_directory_away_drops_its_files() {
        let dir = write_files(&[
            ("Index.js", "require('./lib/a');"),
            ("lib/a.js", "/** @providesModule A */"),
            ("lib/deep/b.js", "/** @providesModule B */"),
        ]);
        let root = dir.path().to_path_buf();
        let (graph, index) = graph_with(&root, |b| b);

        let before = graph.get_dependencies("Index.js", None).await.unwrap();
        assert!(before.contains(&root.join("lib/a.js")));
        assert!(index.table_contains("A"));

        let outside = tempfile::tempdir().unwrap();
        std::fs::rename(root.join("lib"), outside.path().join("lib")).unwrap();
        assert!(graph.notify_change(FileChange::new(ChangeKind::Delete, "lib", &root)));

        let after = graph.get_dependencies("Index.js", None).await.unwrap();
        assert_eq!(after.dependencies, vec![root.join("Index.js")]);
        assert!(!index.table_contains("A"));
        assert!(!index.table_contains("B"));

        let err = graph.get_dependencies("lib/a.js", None).await.unwrap_err();
        assert!(matches!(err, GraphError::EntryNotFound { .. }));
        assert_eq!(graph.build_state().full_rebuilds, 0);
    }

    #[tokio::test]
    async fn test_change_during_initial_crawl_is_kept() {
        let dir = write_files(&[("Index.js", "")]);
        let root = dir.path().to_path_buf();
        let crawling = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));

        // Park the crawl on Index.js after it has listed the root.
        let (graph, index) = {
            let crawling = Arc::clone(&crawling);
            let released = Arc::clone(&released);
            graph_with(&root, move |b| {
                b.ignore_file_path(move |path| {
                    if path.ends_with("Index.js") && !released.load(Ordering::SeqCst) {
                        crawling.store(true, Ordering::SeqCst);
                        while !released.load(Ordering::SeqCst) {
                            std::thread::sleep(Duration::from_millis(5));
                        }
                    }
                    false
                })
            })
        };

        let init = graph.start();
        while !crawling.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        std::fs::write(root.join("Late.js"), "/** @providesModule Late */").unwrap();
        assert!(graph.notify_change(FileChange::new(ChangeKind::Add, "Late.js", &root)));
        released.store(true, Ordering::SeqCst);
        init.await.unwrap();

        let result = graph.get_dependencies("Late.js", None).await.unwrap();
        assert_eq!(result.dependencies, vec![root.join("Late.js")]);
        assert!(index.table_contains("Late"));
        assert_eq!(index.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropping_last_handle_releases_the_graph() {
        let dir = write_files(&[("Index.js", "")]);
        let root = dir.path().to_path_buf();
        let (graph, watcher, _) = graph_with_watcher(&root);
        graph.start().await.unwrap();

        let inner = Arc::downgrade(&graph.inner);
        let cancel = graph.inner.cancel.clone();
        drop(graph);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(inner.strong_count(), 0);
        assert!(cancel.is_cancelled());

        watcher.emit(FileChange::new(ChangeKind::Change, "Index.js", &root));
        tokio::task::yield_now().await;
        assert_eq!(inner.strong_count(), 0);
    }

    #[tokio::test]
    async fn test_watcher_events_reach_the_index() {
        let dir = write_files(&[("Index.js", "")]);
        let root = dir.path().to_path_buf();
        let (graph, watcher, index) = graph_with_watcher(&root);
        graph.start().await.unwrap();

        std::fs::write(root.join("Late.js"), "/** @providesModule Late */").unwrap();
        let mut states = graph.subscribe();
        watcher.emit(FileChange::new(ChangeKind::Add, "Late.js", &root));
        states.wait_for(|s| s.settled >= 1).await.unwrap();

        assert!(index.table_contains("Late"));
    }
}
