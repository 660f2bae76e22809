//
//  crawler.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::IgnoreFn;
use crate::error::CrawlError;
use crate::paths;

/// What to keep while walking the roots.
#[derive(Clone)]
pub struct CrawlOptions {
    pub ignore: IgnoreFn,
    /// Extensions without the leading dot.
    pub extensions: Vec<String>,
}

/// Enumerate every matching file under `roots`, off the async runtime.
///
/// Entries are visited sorted by file name so the crawl order is stable.
pub async fn crawl(roots: &[PathBuf], options: CrawlOptions) -> Result<Vec<PathBuf>, CrawlError> {
    let roots = roots.to_vec();
    tokio::task::spawn_blocking(move || crawl_blocking(&roots, &options))
        .await
        .map_err(|e| CrawlError::Task(e.to_string()))?
}

pub fn crawl_blocking(roots: &[PathBuf], options: &CrawlOptions) -> Result<Vec<PathBuf>, CrawlError> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    for root in roots {
        if !root.is_dir() {
            return Err(CrawlError::Walk {
                root: root.clone(),
                message: "root is not a directory".to_string(),
            });
        }

        let ignore = options.ignore.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| !ignore(entry.path()))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let keep = paths::extension(entry.path())
                .is_some_and(|ext| options.extensions.iter().any(|e| e == ext));
            if keep {
                let path = entry.into_path();
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }
    }

    info!(roots = roots.len(), files = files.len(), "crawl finished");
    Ok(files)
}
