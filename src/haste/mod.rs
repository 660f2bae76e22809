//! Module-name ("haste") index.
//!
//! Maps logical names declared with `@providesModule`, and package names, to
//! files. The orchestrator talks to it only through [`NameIndex`], so hosts and
//! tests can swap in their own implementation.

mod map;
mod table;

pub use map::HasteMap;
pub use table::{HasteEntry, HasteTable};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::error::IndexError;
use crate::watcher::ChangeKind;

#[async_trait]
pub trait NameIndex: Send + Sync {
    /// Rebuild the whole index from the current snapshot.
    async fn build(&self) -> Result<(), IndexError>;

    /// Patch the index for one changed file. On error the published table is
    /// left as it was.
    async fn process_file_change(&self, kind: ChangeKind, path: &Path) -> Result<(), IndexError>;

    /// Current immutable table.
    fn table(&self) -> Arc<HasteTable>;
}
