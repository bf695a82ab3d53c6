//! Asset bootstrap orchestrator.
//!
//! Guarantees the mandatory asset bundle is present under persistent storage
//! before the embedded application starts, fetching it at most once per
//! version.
//!
//! # State Machine
//!
//! ```text
//! ┌───────────┐  present   ┌─────────┐
//! │ Unchecked │───────────>│ Present │
//! └───────────┘            └─────────┘
//!       │ absent                ^
//!       v                       │ download ok
//! ┌─────────────┐───────────────┘
//! │ Downloading │
//! └─────────────┘───────────────┐
//!                               v download failed
//!                          ┌────────┐
//!                          │ Failed │
//!                          └────────┘
//! ```
//!
//! Making the bundle available gates startup. Making it durable does not: a
//! fetched bundle is flushed once, fire-and-forget, after the main loop has
//! started.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    action::{BridgeAction, UiNotification},
    deps::{DependencyId, RunDependencies},
    error::{BridgeError, DownloadError},
    sandbox::{Sandbox, ensure_dir},
    storage::StorageLayout,
};

/// Versioned asset archive. The version lives in the file name, so renaming
/// is the only upgrade path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBundle {
    /// File name under the baseset directory.
    pub file_name: String,
    /// Where to fetch it from.
    pub url: String,
}

impl Default for AssetBundle {
    fn default() -> Self {
        Self {
            file_name: "opengfx-0.6.0.tar".to_string(),
            url: "https://installer.cdn.openttd.org/emscripten/opengfx-0.6.0.tar".to_string(),
        }
    }
}

/// Lifecycle of the bundle within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleState {
    /// Storage not inspected yet.
    #[default]
    Unchecked,
    /// Fetch in flight.
    Downloading,
    /// Bundle on disk.
    Present,
    /// Fetch failed this session.
    Failed,
}

/// Bootstrap orchestrator state machine.
#[derive(Debug, Clone)]
pub struct BootstrapOrchestrator {
    layout: StorageLayout,
    bundle: AssetBundle,
    state: BundleState,
    downloaded_this_session: bool,
}

impl BootstrapOrchestrator {
    /// Create an orchestrator for `bundle` under `layout`.
    pub fn new(layout: StorageLayout, bundle: AssetBundle) -> Self {
        Self { layout, bundle, state: BundleState::Unchecked, downloaded_this_session: false }
    }

    /// Current bundle state.
    pub fn state(&self) -> BundleState {
        self.state
    }

    /// Whether a fetch was started this session and has not failed.
    pub fn downloaded_this_session(&self) -> bool {
        self.downloaded_this_session
    }

    /// Full path of the versioned bundle.
    pub fn bundle_path(&self) -> PathBuf {
        self.layout.baseset_dir().join(&self.bundle.file_name)
    }

    /// Inspect storage after the initial load and fetch the bundle if absent.
    ///
    /// Always touches [`DependencyId::Baseset`]: held across the fetch when
    /// one starts, added and released immediately otherwise.
    ///
    /// Directory creation failures are logged; a missing directory surfaces
    /// later as a failed download.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedDependency` only if the wait group was corrupted.
    pub fn run<S: Sandbox + ?Sized>(
        &mut self,
        sandbox: &mut S,
        deps: &mut RunDependencies,
    ) -> Result<Vec<BridgeAction>, BridgeError> {
        // Parents before children: mkdir does not create intermediates.
        for dir in [self.layout.content_download_dir(), self.layout.baseset_dir()] {
            if let Err(e) = ensure_dir(sandbox, &dir) {
                warn!(path = %dir.display(), error = %e, "cannot create content directory");
            }
        }

        let destination = self.bundle_path();
        deps.add(DependencyId::Baseset);

        if sandbox.exists(&destination) {
            deps.remove(DependencyId::Baseset)?;
            self.state = BundleState::Present;
            info!(bundle = %self.bundle.file_name, "asset bundle already present");
            return Ok(vec![]);
        }

        self.state = BundleState::Downloading;
        self.downloaded_this_session = true;
        info!(bundle = %self.bundle.file_name, url = %self.bundle.url, "downloading asset bundle");

        Ok(vec![BridgeAction::Download { url: self.bundle.url.clone(), destination }])
    }

    /// The fetch settled. Releases [`DependencyId::Baseset`].
    ///
    /// # Errors
    ///
    /// Returns `NoDownloadInFlight` if no fetch was started.
    pub fn download_settled(
        &mut self,
        result: Result<(), DownloadError>,
        deps: &mut RunDependencies,
    ) -> Result<Vec<BridgeAction>, BridgeError> {
        if self.state != BundleState::Downloading {
            return Err(BridgeError::NoDownloadInFlight);
        }
        deps.remove(DependencyId::Baseset)?;

        match result {
            Ok(()) => {
                self.state = BundleState::Present;
                info!(bundle = %self.bundle.file_name, "asset bundle downloaded");
                Ok(vec![])
            },
            Err(e) => {
                self.state = BundleState::Failed;
                self.downloaded_this_session = false;
                warn!(error = %e, "asset bundle download failed");
                Ok(vec![BridgeAction::Notify(UiNotification::BootstrapFailed)])
            },
        }
    }

    /// Consume the pending post-start flush, if any.
    ///
    /// Returns `true` at most once per session, and only after a successful
    /// fetch.
    pub fn take_post_start_flush(&mut self) -> bool {
        std::mem::take(&mut self.downloaded_this_session)
    }
}
