//! Dependency graph orchestrator.
//!
//! Owns the crawl, the filesystem snapshot, the name index and the mock
//! registry; serializes every index mutation through one update actor; and
//! serves resolution requests against a consistent view of the index.

mod engine;
mod mocks;
mod mutation;
mod query;
mod state;

#[cfg(test)]
mod testing;

pub use engine::{DependencyGraph, InitFuture};
pub use mocks::{mock_id, MockRegistry};
pub use state::{BuildPhase, BuildState, UpdateMode};
