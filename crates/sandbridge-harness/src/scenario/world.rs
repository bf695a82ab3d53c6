//! World state after scenario execution.
//!
//! The World holds one report per simulated session plus the backing store
//! as the last session left it, and provides oracle helpers.

use sandbridge_core::{BundleState, EndpointSpec, SessionPhase, UiNotification};

use crate::{Journal, sim_sandbox::BackingStore};

/// Outcome of one simulated session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Effects recorded by the driver.
    pub journal: Journal,
    /// Phase the session ended in.
    pub phase: SessionPhase,
    /// Bundle state the session ended in.
    pub bundle: BundleState,
    /// Lifetime run-dependency registrations.
    pub dependencies_added: u64,
    /// Lifetime run-dependency releases.
    pub dependencies_removed: u64,
    /// Registrations still outstanding.
    pub dependencies_pending: u32,
    /// Endpoint resolutions performed, in order.
    pub resolutions: Vec<(EndpointSpec, Option<String>)>,
}

/// World state containing every session and the backing store.
#[derive(Debug, Clone, Default)]
pub struct World {
    sessions: Vec<SessionReport>,
    backing: BackingStore,
}

impl World {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_session(&mut self, report: SessionReport) {
        self.sessions.push(report);
    }

    pub(crate) fn set_backing(&mut self, backing: BackingStore) {
        self.backing = backing;
    }

    /// All session reports in execution order.
    pub fn sessions(&self) -> &[SessionReport] {
        &self.sessions
    }

    /// Report of session `index`.
    pub fn session(&self, index: usize) -> Option<&SessionReport> {
        self.sessions.get(index)
    }

    /// Backing store after the last session.
    pub fn backing(&self) -> &BackingStore {
        &self.backing
    }

    /// Downloads across all sessions.
    pub fn total_downloads(&self) -> usize {
        self.sessions.iter().map(|s| s.journal.downloads.len()).sum()
    }

    /// Whether every session delivered `WarningFs` at most once.
    pub fn warned_at_most_once(&self) -> bool {
        self.sessions.iter().all(|s| s.journal.count(UiNotification::WarningFs) <= 1)
    }

    /// Whether every session released each registration it made.
    pub fn dependencies_balanced(&self) -> bool {
        self.sessions.iter().all(|s| {
            s.dependencies_pending == 0 && s.dependencies_added == s.dependencies_removed
        })
    }

    /// Whether every session reached the running phase.
    pub fn all_running(&self) -> bool {
        self.sessions.iter().all(|s| s.phase == SessionPhase::Running)
    }
}
