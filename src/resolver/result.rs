//
//  result.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One dependency reference and the file it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPair {
    pub name: String,
    pub path: PathBuf,
}

/// Output of a resolution request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionResult {
    /// Haste name of the entry, or its path when it has none.
    pub main_module_id: Option<String>,
    /// Entry first, then every reachable module in traversal order.
    pub dependencies: Vec<PathBuf>,
    /// Resolved `import()` targets of the entry module.
    pub async_dependencies: Vec<PathBuf>,
    /// Mocks that took part in this resolution, by mock id.
    pub mocks: BTreeMap<String, PathBuf>,
    /// Per module, its resolved references in source order.
    pub resolved_pairs: IndexMap<PathBuf, Vec<ResolvedPair>>,
}

impl ResolutionResult {
    pub(crate) fn record_pair(&mut self, from: &Path, name: &str, path: &Path) {
        let pairs = self.resolved_pairs.entry(from.to_path_buf()).or_default();
        if !pairs.iter().any(|p| p.name == name) {
            pairs.push(ResolvedPair {
                name: name.to_string(),
                path: path.to_path_buf(),
            });
        }
    }

    /// Resolved references of `module`.
    pub fn pairs_of(&self, module: &Path) -> &[ResolvedPair] {
        self.resolved_pairs
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.dependencies.iter().any(|d| d == path)
    }
}
