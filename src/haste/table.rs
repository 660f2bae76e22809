//
//  table.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::platform::{GENERIC_PLATFORM, NATIVE_PLATFORM};

/// What a haste name points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HasteEntry {
    /// A file declaring `@providesModule`.
    Module(PathBuf),
    /// A package registered by the `name` in its manifest.
    Package { root: PathBuf, manifest: PathBuf },
}

impl HasteEntry {
    /// The file that registered this entry.
    pub fn source(&self) -> &Path {
        match self {
            Self::Module(path) => path,
            Self::Package { manifest, .. } => manifest,
        }
    }
}

/// Immutable name -> platform -> entry map.
///
/// Published whole through an `ArcSwap`; updates clone, patch, and swap.
#[derive(Debug, Clone, Default)]
pub struct HasteTable {
    names: HashMap<String, HashMap<String, HasteEntry>>,
}

impl HasteTable {
    /// Look up `name`, preferring the requested platform, then `native`, then generic.
    pub fn get(&self, name: &str, platform: Option<&str>, prefer_native: bool) -> Option<&HasteEntry> {
        let variants = self.names.get(name)?;
        if let Some(entry) = platform.and_then(|p| variants.get(p)) {
            return Some(entry);
        }
        if prefer_native {
            if let Some(entry) = variants.get(NATIVE_PLATFORM) {
                return Some(entry);
            }
        }
        variants.get(GENERIC_PLATFORM)
    }

    /// Register an entry. Two different files claiming the same name and
    /// platform is a collision.
    pub fn insert(&mut self, name: &str, platform: &str, entry: HasteEntry) -> Result<(), IndexError> {
        let variants = self.names.entry(name.to_string()).or_default();
        if let Some(existing) = variants.get(platform) {
            if existing.source() != entry.source() {
                return Err(IndexError::Collision {
                    name: name.to_string(),
                    path: entry.source().to_path_buf(),
                    existing: existing.source().to_path_buf(),
                });
            }
        }
        variants.insert(platform.to_string(), entry);
        Ok(())
    }

    /// Drop every entry registered by a file at or below `path`. Returns
    /// how many went away.
    pub fn remove_path(&mut self, path: &Path) -> usize {
        let mut removed = 0;
        self.names.retain(|_, variants| {
            let before = variants.len();
            variants.retain(|_, entry| !entry.source().starts_with(path));
            removed += before - variants.len();
            !variants.is_empty()
        });
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str) -> HasteEntry {
        HasteEntry::Module(PathBuf::from(path))
    }

    #[test]
    fn test_platform_preference() {
        let mut table = HasteTable::default();
        table.insert("Button", GENERIC_PLATFORM, module("/app/Button.js")).unwrap();
        table.insert("Button", "ios", module("/app/Button.ios.js")).unwrap();
        table.insert("Button", NATIVE_PLATFORM, module("/app/Button.native.js")).unwrap();

        assert_eq!(table.get("Button", Some("ios"), true), Some(&module("/app/Button.ios.js")));
        assert_eq!(
            table.get("Button", Some("android"), true),
            Some(&module("/app/Button.native.js"))
        );
        assert_eq!(table.get("Button", Some("android"), false), Some(&module("/app/Button.js")));
        assert_eq!(table.get("Button", None, false), Some(&module("/app/Button.js")));
        assert_eq!(table.get("Missing", None, false), None);
    }

    #[test]
    fn test_collision() {
        let mut table = HasteTable::default();
        table.insert("Utils", GENERIC_PLATFORM, module("/app/a/Utils.js")).unwrap();
        table.insert("Utils", GENERIC_PLATFORM, module("/app/a/Utils.js")).unwrap();

        let err = table
            .insert("Utils", GENERIC_PLATFORM, module("/app/b/Utils.js"))
            .unwrap_err();
        assert!(matches!(err, IndexError::Collision { ref name, .. } if name == "Utils"));
    }

    #[test]
    fn test_remove_path() {
        let mut table = HasteTable::default();
        table.insert("Utils", GENERIC_PLATFORM, module("/app/Utils.js")).unwrap();
        table
            .insert(
                "widgets",
                GENERIC_PLATFORM,
                HasteEntry::Package {
                    root: PathBuf::from("/app/widgets"),
                    manifest: PathBuf::from("/app/widgets/package.json"),
                },
            )
            .unwrap();

        assert_eq!(table.remove_path(Path::new("/app/Utils.js")), 1);
        assert!(!table.contains("Utils"));
        assert!(table.contains("widgets"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_path_drops_a_directory() {
        let mut table = HasteTable::default();
        table.insert("A", GENERIC_PLATFORM, module("/app/lib/A.js")).unwrap();
        table.insert("B", "ios", module("/app/lib/deep/B.ios.js")).unwrap();
        table.insert("C", GENERIC_PLATFORM, module("/app/lib.js")).unwrap();

        assert_eq!(table.remove_path(Path::new("/app/lib")), 2);
        assert!(!table.contains("A"));
        assert!(!table.contains("B"));
        assert!(table.contains("C"));
    }
}
