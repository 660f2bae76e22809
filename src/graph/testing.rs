//! Fixtures shared by the orchestrator tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use super::DependencyGraph;
use crate::config::{GraphConfig, GraphConfigBuilder};
use crate::error::IndexError;
use crate::haste::{HasteMap, HasteTable, NameIndex};
use crate::watcher::{ChangeKind, ChannelWatcher};

/// Name index that counts calls and fails on demand.
pub(crate) struct CountingIndex {
    inner: HasteMap,
    pub builds: AtomicUsize,
    pub updates: AtomicUsize,
    pub fail_builds: AtomicBool,
    pub fail_updates: AtomicBool,
}

impl CountingIndex {
    fn new(inner: HasteMap) -> Self {
        Self {
            inner,
            builds: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            fail_builds: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
        }
    }

    pub fn table_contains(&self, name: &str) -> bool {
        self.inner.table().contains(name)
    }
}

#[async_trait]
impl NameIndex for CountingIndex {
    async fn build(&self) -> Result<(), IndexError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_builds.load(Ordering::SeqCst) {
            return Err(IndexError::Task("injected build failure".to_string()));
        }
        self.inner.build().await
    }

    async fn process_file_change(&self, kind: ChangeKind, path: &Path) -> Result<(), IndexError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(IndexError::Task("injected update failure".to_string()));
        }
        self.inner.process_file_change(kind, path).await
    }

    fn table(&self) -> Arc<HasteTable> {
        self.inner.table()
    }
}

pub(crate) fn write_files(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

fn build(
    root: &Path,
    watcher: Arc<ChannelWatcher>,
    configure: impl FnOnce(GraphConfigBuilder) -> GraphConfigBuilder,
) -> (DependencyGraph, Arc<CountingIndex>) {
    let config = configure(GraphConfig::builder([root]).platforms(["ios", "android"]))
        .build()
        .unwrap();

    let mut handle = None;
    let graph = DependencyGraph::with_name_index(config, watcher, |config, snapshot, cache| {
        let index = Arc::new(CountingIndex::new(HasteMap::new(config, snapshot, cache)));
        handle = Some(Arc::clone(&index));
        index as Arc<dyn NameIndex>
    });
    (graph, handle.unwrap())
}

pub(crate) fn graph_with(
    root: &Path,
    configure: impl FnOnce(GraphConfigBuilder) -> GraphConfigBuilder,
) -> (DependencyGraph, Arc<CountingIndex>) {
    build(root, Arc::new(ChannelWatcher::new()), configure)
}

pub(crate) fn graph_with_watcher(root: &Path) -> (DependencyGraph, Arc<ChannelWatcher>, Arc<CountingIndex>) {
    let watcher = Arc::new(ChannelWatcher::new());
    let (graph, index) = build(root, Arc::clone(&watcher), |b| b);
    (graph, watcher, index)
}
