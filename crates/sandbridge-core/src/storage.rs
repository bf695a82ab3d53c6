//! Storage sync manager.
//!
//! Bridges the sandbox's in-memory filesystem to a durable backing store with
//! explicit, application-driven checkpoints.
//!
//! # Lifecycle
//!
//! ```text
//! initialize ──> mount ──> LoadFromBacking ──> load_settled
//!                               (SyncFs dependency held)
//!
//! sync_out ──> FlushToBacking(id) ──> flush_settled(id) ──> follow-up
//!      └──> WarningFs (first call of the session only)
//! ```
//!
//! Load and flush failures are logged and otherwise treated like success.
//! The browser can evict or deny the backing store at will; the one-time
//! warning is how the user learns that durability is best-effort.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    action::{BridgeAction, UiNotification},
    deps::{DependencyId, RunDependencies},
    error::{BridgeError, StorageError},
    sandbox::{Sandbox, ensure_dir},
};

/// Root directory of persistent state. Fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountPoint(PathBuf);

impl MountPoint {
    /// Mount point at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Path of the mount point.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// Directory layout of persistent state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    /// Personal directory; the mount point.
    pub personal_dir: PathBuf,
    /// Content download directory, relative to the personal directory.
    pub content_download: String,
    /// Baseset directory, relative to the content download directory.
    pub baseset: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            personal_dir: PathBuf::from("/home/web_user/.openttd"),
            content_download: "content_download".to_string(),
            baseset: "baseset".to_string(),
        }
    }
}

impl StorageLayout {
    /// Mount point of the persistent backing.
    pub fn mount_point(&self) -> MountPoint {
        MountPoint::new(self.personal_dir.clone())
    }

    /// Directory downloaded content lands in.
    pub fn content_download_dir(&self) -> PathBuf {
        self.personal_dir.join(&self.content_download)
    }

    /// Directory asset bundles land in.
    pub fn baseset_dir(&self) -> PathBuf {
        self.content_download_dir().join(&self.baseset)
    }
}

/// Whether the best-effort warning has been shown this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No flush requested yet.
    #[default]
    NotYetSyncedOut,
    /// Warning delivered; never reset within a session.
    Warned,
}

/// Ticket identifying one flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlushId(pub u64);

impl fmt::Display for FlushId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What to do once a flush settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushFollowUp {
    /// Nothing; fire-and-forget.
    Nothing,
    /// Emit `SyncSettled` for the caller's completion callback.
    Acknowledge,
    /// Notify the host UI of exit.
    Exit,
    /// Notify the host UI of abort.
    Abort,
    /// Notify the host UI and reload the environment.
    BootstrapReload,
}

/// Storage sync manager state machine.
#[derive(Debug, Clone)]
pub struct StorageSync {
    mount: MountPoint,
    state: SyncState,
    next_flush: u64,
    in_flight: BTreeMap<FlushId, FlushFollowUp>,
}

impl StorageSync {
    /// Create a manager for `mount`. Nothing is mounted until
    /// [`initialize`](Self::initialize).
    pub fn new(mount: MountPoint) -> Self {
        Self { mount, state: SyncState::default(), next_flush: 0, in_flight: BTreeMap::new() }
    }

    /// Mount point.
    pub fn mount(&self) -> &MountPoint {
        &self.mount
    }

    /// Warning state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Flushes requested but not yet settled.
    pub fn flushes_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Mount the persistent backing and start the initial load.
    ///
    /// Registers [`DependencyId::SyncFs`]; [`load_settled`](Self::load_settled)
    /// releases it. A failed mount is logged and the load is requested anyway,
    /// it will settle as a failure and startup proceeds.
    pub fn initialize<S: Sandbox + ?Sized>(
        &mut self,
        sandbox: &mut S,
        deps: &mut RunDependencies,
    ) -> Vec<BridgeAction> {
        let path = self.mount.as_path();

        let mut ancestors: Vec<&Path> =
            path.ancestors().filter(|p| p.parent().is_some()).collect();
        ancestors.reverse();
        for dir in ancestors {
            if let Err(e) = ensure_dir(sandbox, dir) {
                warn!(path = %dir.display(), error = %e, "cannot create mount point");
            }
        }

        match sandbox.mount_persistent(path) {
            Ok(()) => info!(mount = %path.display(), "persistent backing mounted"),
            Err(e) => warn!(error = %e, "persistent backing not mounted"),
        }

        deps.add(DependencyId::SyncFs);
        vec![BridgeAction::LoadFromBacking { mount: path.to_path_buf() }]
    }

    /// Initial load settled. Releases [`DependencyId::SyncFs`].
    ///
    /// Success and failure proceed identically.
    pub fn load_settled(
        &mut self,
        result: Result<(), StorageError>,
        deps: &mut RunDependencies,
    ) -> Result<(), BridgeError> {
        match result {
            Ok(()) => info!(mount = %self.mount.as_path().display(), "loaded persistent state"),
            Err(e) => warn!(error = %e, "initial load failed, continuing with empty state"),
        }
        deps.remove(DependencyId::SyncFs)?;
        Ok(())
    }

    /// Flush the in-memory tree to the backing store.
    ///
    /// The first call of the session also emits [`UiNotification::WarningFs`].
    pub fn sync_out(&mut self, follow_up: FlushFollowUp) -> Vec<BridgeAction> {
        let id = FlushId(self.next_flush);
        self.next_flush += 1;
        self.in_flight.insert(id, follow_up);
        debug!(flush = %id, ?follow_up, "flush requested");

        let mut actions =
            vec![BridgeAction::FlushToBacking { id, mount: self.mount.as_path().to_path_buf() }];

        if self.state == SyncState::NotYetSyncedOut {
            self.state = SyncState::Warned;
            actions.push(BridgeAction::Notify(UiNotification::WarningFs));
        }

        actions
    }

    /// Flush, then notify the host UI of exit.
    pub fn on_exit(&mut self) -> Vec<BridgeAction> {
        self.sync_out(FlushFollowUp::Exit)
    }

    /// Flush, then notify the host UI of abort.
    pub fn on_abort(&mut self) -> Vec<BridgeAction> {
        self.sync_out(FlushFollowUp::Abort)
    }

    /// A flush settled. Returns the follow-up actions for its ticket.
    ///
    /// # Errors
    ///
    /// Returns `UnknownFlush` if `id` was never issued or already settled.
    pub fn flush_settled(
        &mut self,
        id: FlushId,
        result: Result<(), StorageError>,
    ) -> Result<Vec<BridgeAction>, BridgeError> {
        let follow_up = self.in_flight.remove(&id).ok_or(BridgeError::UnknownFlush(id))?;

        match result {
            Ok(()) => debug!(flush = %id, "flush settled"),
            Err(e) => warn!(flush = %id, error = %e, "flush failed, state may not persist"),
        }

        let actions = match follow_up {
            FlushFollowUp::Nothing => vec![],
            FlushFollowUp::Acknowledge => vec![BridgeAction::SyncSettled { id }],
            FlushFollowUp::Exit => vec![BridgeAction::Notify(UiNotification::Exit)],
            FlushFollowUp::Abort => vec![BridgeAction::Notify(UiNotification::Abort)],
            FlushFollowUp::BootstrapReload => vec![
                BridgeAction::Notify(UiNotification::BootstrapReload),
                BridgeAction::ReloadEnvironment,
            ],
        };

        Ok(actions)
    }
}
