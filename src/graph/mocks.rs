//
//  mocks.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::snapshot::FileSnapshot;

/// Mock id -> mock file, rebuilt on every full index build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MockRegistry {
    mocks: BTreeMap<String, PathBuf>,
}

impl MockRegistry {
    /// Scan the snapshot for files matching `pattern`.
    pub fn scan(snapshot: &FileSnapshot, pattern: &Regex) -> Self {
        Self::from_files(snapshot.match_by_pattern(pattern))
    }

    /// Register files in order. A later file with the same id replaces the earlier one.
    pub fn from_files<I>(files: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut mocks = BTreeMap::new();
        for path in files {
            let Some(id) = mock_id(&path) else {
                continue;
            };
            if let Some(previous) = mocks.insert(id.clone(), path.clone()) {
                debug!(
                    mock = %id,
                    kept = %path.display(),
                    replaced = %previous.display(),
                    "duplicate mock id"
                );
            }
        }
        Self { mocks }
    }

    pub fn get(&self, id: &str) -> Option<&Path> {
        self.mocks.get(id).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.mocks.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.mocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mocks.is_empty()
    }
}

/// File name up to its first `.`: `foo.ios.js` -> `foo`.
pub fn mock_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let id = name.split('.').next().unwrap_or(name);
    (!id.is_empty()).then(|| id.to_string())
}
