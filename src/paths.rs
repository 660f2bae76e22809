//
//  paths.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` and fold `..` without touching disk.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `./foo` or `../foo` style reference.
pub fn is_relative_import(name: &str) -> bool {
    name == "." || name == ".." || name.starts_with("./") || name.starts_with("../")
}

pub fn is_absolute_import(name: &str) -> bool {
    Path::new(name).is_absolute()
}

/// True when `path` lies inside a `node_modules` directory whose package is
/// not whitelisted in `provides_module_node_modules`.
pub fn is_node_modules_dir(path: &Path, provides_module_node_modules: &[String]) -> bool {
    let components: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();

    let Some(last_index) = components.iter().rposition(|c| *c == "node_modules") else {
        return false;
    };

    let below = &components[last_index + 1..];
    !provides_module_node_modules
        .iter()
        .any(|allowed| below.contains(&allowed.as_str()))
}

/// Append a raw suffix to the final component: `foo` + `.ios.js` -> `foo.ios.js`.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

/// File extension without the dot, if any.
pub fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Disk check for paths the snapshot does not cover.
pub async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

pub async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}
