//! Run-dependency wait group.
//!
//! Work that must finish before the embedded application may start registers
//! a named dependency and releases it on completion, on success and failure
//! paths alike. The application is released only once the set is empty.
//!
//! Unlike a process-wide counter, the wait group is owned by the session and
//! lent to each component that needs to register work.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BridgeError;

/// Named unit of outstanding startup work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DependencyId {
    /// Initial load from the persistent backing.
    SyncFs,
    /// Asset bundle presence check and download.
    Baseset,
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncFs => f.write_str("syncfs"),
            Self::Baseset => f.write_str("baseset"),
        }
    }
}

/// Counted wait group keyed by [`DependencyId`].
///
/// Every [`add`](Self::add) must be paired with exactly one
/// [`remove`](Self::remove). Lifetime totals are kept so observers can check
/// the pairing after the fact.
#[derive(Debug, Clone, Default)]
pub struct RunDependencies {
    outstanding: BTreeMap<DependencyId, u32>,
    added: u64,
    removed: u64,
}

impl RunDependencies {
    /// Create an empty wait group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of blocking work.
    pub fn add(&mut self, id: DependencyId) {
        *self.outstanding.entry(id).or_insert(0) += 1;
        self.added += 1;
        debug!(dependency = %id, pending = self.pending(), "run dependency added");
    }

    /// Release one unit of blocking work.
    ///
    /// Returns `true` when this release emptied the set.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedDependency` if `id` has no outstanding
    /// registration. The set is left unchanged.
    pub fn remove(&mut self, id: DependencyId) -> Result<bool, BridgeError> {
        let Some(count) = self.outstanding.get_mut(&id) else {
            return Err(BridgeError::UnbalancedDependency(id));
        };

        *count -= 1;
        if *count == 0 {
            self.outstanding.remove(&id);
        }
        self.removed += 1;
        debug!(dependency = %id, pending = self.pending(), "run dependency removed");

        Ok(self.outstanding.is_empty())
    }

    /// No work outstanding.
    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Total outstanding registrations across all names.
    pub fn pending(&self) -> u32 {
        self.outstanding.values().sum()
    }

    /// Outstanding registrations for one name.
    pub fn outstanding(&self, id: DependencyId) -> u32 {
        self.outstanding.get(&id).copied().unwrap_or(0)
    }

    /// Lifetime number of registrations.
    pub fn added(&self) -> u64 {
        self.added
    }

    /// Lifetime number of releases.
    pub fn removed(&self) -> u64 {
        self.removed
    }
}
