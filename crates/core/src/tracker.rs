//! Change tracking for schedule validity.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Shared, monotonic version counter for one model.
///
/// Every effective rate or structure change bumps the version. A schedule
/// resolved at version `v` stays valid while the version is still `v`.
/// Clones share the same counter. Scheduling runs on a single thread, so
/// the counter is not `Send`.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    version: Rc<Cell<u64>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current version.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Records a change and returns the new version.
    pub fn bump(&self) -> u64 {
        let next = self.version.get() + 1;
        self.version.set(next);
        next
    }
}

/// Lifecycle point at which firing multipliers are propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Before the first firing of a run.
    Setup,

    /// After a completed iteration.
    Iteration,
}
