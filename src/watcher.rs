//
//  watcher.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Kind of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Change,
    Delete,
}

/// One change event, with the path relative to the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub root: PathBuf,
    pub is_dir: bool,
}

impl FileChange {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            root: root.into(),
            is_dir: false,
        }
    }

    pub fn absolute_path(&self) -> PathBuf {
        self.root.join(&self.path)
    }

    /// An add or change on a directory. A delete never is: its target is
    /// gone, and it removes whatever lived at or below the path.
    pub fn targets_directory(&self) -> bool {
        self.is_dir && self.kind != ChangeKind::Delete
    }
}

/// Source of change events for a running graph.
pub trait FileWatcher: Send + Sync {
    /// A fresh stream of every event emitted from now on.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<FileChange>;
}

#[derive(Default, Clone)]
struct Subscribers {
    senders: Arc<Mutex<Vec<mpsc::UnboundedSender<FileChange>>>>,
}

impl Subscribers {
    fn add(&self) -> mpsc::UnboundedReceiver<FileChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().push(tx);
        rx
    }

    fn broadcast(&self, change: FileChange) {
        self.senders
            .lock()
            .retain(|tx| tx.send(change.clone()).is_ok());
    }
}

// ─── Channel watcher ────────────────────────────────────────────

/// Watcher fed by hand. Used by embedders with their own event source, and in tests.
#[derive(Default, Clone)]
pub struct ChannelWatcher {
    subscribers: Subscribers,
}

impl ChannelWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, change: FileChange) {
        self.subscribers.broadcast(change);
    }
}

impl FileWatcher for ChannelWatcher {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<FileChange> {
        self.subscribers.add()
    }
}

// ─── notify watcher ─────────────────────────────────────────────

/// Recursive OS watcher over a set of roots.
pub struct NotifyWatcher {
    subscribers: Subscribers,
    _watcher: RecommendedWatcher,
}

impl NotifyWatcher {
    pub fn new(roots: &[PathBuf]) -> notify::Result<Self> {
        let subscribers = Subscribers::default();
        let callback_subscribers = subscribers.clone();
        let callback_roots = roots.to_vec();

        let mut watcher = recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => {
                for change in changes_from_event(&callback_roots, &event) {
                    callback_subscribers.broadcast(change);
                }
            }
            Err(e) => warn!(error = %e, "filesystem watcher error"),
        })?;

        for root in roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            debug!(root = %root.display(), "watching");
        }

        Ok(Self {
            subscribers,
            _watcher: watcher,
        })
    }
}

impl FileWatcher for NotifyWatcher {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<FileChange> {
        self.subscribers.add()
    }
}

fn changes_from_event(roots: &[PathBuf], event: &Event) -> Vec<FileChange> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Add,
        EventKind::Modify(_) => ChangeKind::Change,
        EventKind::Remove(_) => ChangeKind::Delete,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter_map(|path| to_change(roots, kind, path))
        .collect()
}

fn to_change(roots: &[PathBuf], kind: ChangeKind, path: &Path) -> Option<FileChange> {
    let root = roots.iter().find(|root| path.starts_with(root))?;
    let relative = path.strip_prefix(root).ok()?;
    // Renames surface as Modify events; a vanished path is a delete.
    let kind = match kind {
        ChangeKind::Change if !path.exists() => ChangeKind::Delete,
        other => other,
    };
    let mut change = FileChange::new(kind, relative, root);
    change.is_dir = kind != ChangeKind::Delete && path.is_dir();
    Some(change)
}
