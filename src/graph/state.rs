//
//  state.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use serde::Serialize;
use std::sync::Arc;

use crate::error::InitError;

/// Whether the next change may be applied incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    Clean,
    /// A previous incremental update failed; the index may be inconsistent.
    NeedsFullRebuild,
}

#[derive(Debug, Clone)]
pub enum BuildPhase {
    Initializing,
    Ready,
    Failed(Arc<InitError>),
}

impl BuildPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// The published "index is consistent" signal.
#[derive(Debug, Clone)]
pub struct BuildState {
    pub phase: BuildPhase,
    /// Changes fully processed by the update actor.
    pub settled: u64,
    pub mode: UpdateMode,
    /// Recovery rebuilds run by the update actor (the initial build is not counted).
    pub full_rebuilds: u64,
    pub incremental_updates: u64,
}

impl BuildState {
    pub(crate) fn initial() -> Self {
        Self {
            phase: BuildPhase::Initializing,
            settled: 0,
            mode: UpdateMode::Clean,
            full_rebuilds: 0,
            incremental_updates: 0,
        }
    }

    /// Ready and caught up with every change scheduled up to `target`.
    pub fn has_settled(&self, target: u64) -> bool {
        self.phase.is_ready() && self.settled >= target
    }
}

impl Default for BuildState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_requires_ready() {
        let mut state = BuildState::initial();
        assert!(!state.has_settled(0));

        state.phase = BuildPhase::Ready;
        assert!(state.has_settled(0));
        assert!(!state.has_settled(1));

        state.settled = 1;
        assert!(state.has_settled(1));
    }
}
