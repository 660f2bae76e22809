//! In-memory mirror of the file set under the roots.
//!
//! Built once from the crawl and then kept current by change events. Files
//! are held twice: in crawl order (mock registry, index builds) and sorted
//! (directory queries). Changes that arrive before the first build are
//! journaled and replayed over the crawl result.

use indexmap::IndexSet;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::IgnoreFn;
use crate::paths;
use crate::watcher::{ChangeKind, FileChange};

#[derive(Debug, Default)]
struct Files {
    ordered: IndexSet<PathBuf>,
    sorted: BTreeSet<PathBuf>,
    /// `Some` until the first build.
    journal: Option<Vec<(ChangeKind, PathBuf)>>,
}

impl Files {
    fn unbuilt() -> Self {
        Self {
            journal: Some(Vec::new()),
            ..Self::default()
        }
    }

    fn insert(&mut self, path: PathBuf) {
        self.sorted.insert(path.clone());
        self.ordered.insert(path);
    }

    /// Files at or below `path`, sorted.
    fn subtree(&self, path: &Path) -> Vec<PathBuf> {
        self.sorted
            .range::<Path, _>((Bound::Included(path), Bound::Unbounded))
            .take_while(|p| p.starts_with(path))
            .cloned()
            .collect()
    }

    /// Apply one change; returns the files it touched.
    fn apply(&mut self, kind: ChangeKind, path: &Path) -> Vec<PathBuf> {
        match kind {
            ChangeKind::Delete => {
                // A vanished directory takes its whole subtree with it.
                let removed = self.subtree(path);
                if !removed.is_empty() {
                    for file in &removed {
                        self.sorted.remove(file);
                    }
                    self.ordered.retain(|p| !p.starts_with(path));
                }
                removed
            }
            ChangeKind::Change => {
                if !self.ordered.contains(path) {
                    self.insert(path.to_path_buf());
                }
                vec![path.to_path_buf()]
            }
            ChangeKind::Add => {
                self.insert(path.to_path_buf());
                vec![path.to_path_buf()]
            }
        }
    }
}

pub struct FileSnapshot {
    roots: Vec<PathBuf>,
    ignore: IgnoreFn,
    files: RwLock<Files>,
}

impl FileSnapshot {
    pub fn new(roots: Vec<PathBuf>, ignore: IgnoreFn) -> Self {
        Self {
            roots,
            ignore,
            files: RwLock::new(Files::unbuilt()),
        }
    }

    /// Replace the file set with the crawl result, keeping files under the
    /// roots, then replay changes journaled since the snapshot was created.
    pub fn build(&self, crawl: &[PathBuf]) {
        let mut current = self.files.write();
        let mut files = Files::default();
        for path in crawl {
            if self.root_of(path).is_some() && !(self.ignore)(path) {
                files.insert(path.clone());
            }
        }

        let journal = current.journal.take().unwrap_or_default();
        let replayed = journal.len();
        for (kind, path) in journal {
            files.apply(kind, &path);
        }

        let count = files.ordered.len();
        *current = files;
        info!(files = count, replayed, "filesystem snapshot built");
    }

    /// Apply a change event and return the files it touched. A delete
    /// returns every known file at or below the path. Empty when the event
    /// is not ours.
    pub fn apply_change(&self, change: &FileChange) -> Vec<PathBuf> {
        let path = change.absolute_path();
        if change.targets_directory() || (self.ignore)(&path) || self.root_of(&path).is_none() {
            return Vec::new();
        }

        let mut files = self.files.write();
        if let Some(journal) = files.journal.as_mut() {
            journal.push((change.kind, path.clone()));
            debug!(kind = ?change.kind, path = %path.display(), "change journaled before first build");
            return vec![path];
        }

        let touched = files.apply(change.kind, &path);
        debug!(
            kind = ?change.kind,
            path = %path.display(),
            files = touched.len(),
            "snapshot updated"
        );
        touched
    }

    /// Root containing `path`, first match in configuration order.
    pub fn root_of(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .find(|root| path.starts_with(root))
            .map(|r| r.as_path())
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        self.files.read().sorted.contains(path)
    }

    /// True when at least one known file lives below `dir`.
    pub fn dir_exists(&self, dir: &Path) -> bool {
        let files = self.files.read();
        files
            .sorted
            .range::<Path, _>((Bound::Excluded(dir), Bound::Unbounded))
            .next()
            .is_some_and(|p| p.starts_with(dir))
    }

    /// Files in crawl order whose absolute path matches `pattern`.
    pub fn match_by_pattern(&self, pattern: &Regex) -> Vec<PathBuf> {
        self.files
            .read()
            .ordered
            .iter()
            .filter(|p| pattern.is_match(&p.to_string_lossy()))
            .cloned()
            .collect()
    }

    /// Files directly inside `dir` whose file name matches `pattern`, sorted.
    pub fn matches(&self, dir: &Path, pattern: &Regex) -> Vec<PathBuf> {
        let files = self.files.read();
        files
            .sorted
            .range::<Path, _>((Bound::Excluded(dir), Bound::Unbounded))
            .take_while(|p| p.starts_with(dir))
            .filter(|p| p.parent() == Some(dir))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| pattern.is_match(n))
            })
            .cloned()
            .collect()
    }

    /// Files in crawl order with one of `extensions`.
    pub fn files_with_extensions(&self, extensions: &[&str]) -> Vec<PathBuf> {
        self.files
            .read()
            .ordered
            .iter()
            .filter(|p| paths::extension(p).is_some_and(|ext| extensions.contains(&ext)))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
