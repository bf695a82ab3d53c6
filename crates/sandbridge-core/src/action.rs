//! Bridge actions
//!
//! Actions produced by the bridge state machines for a driver to execute.

use std::path::PathBuf;

use crate::storage::FlushId;

/// Notifications delivered to the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiNotification {
    /// Storage is best-effort and may be cleared by the browser. Sent at
    /// most once per session.
    WarningFs,
    /// The application exited and its state has been flushed.
    Exit,
    /// The application aborted and its state has been flushed.
    Abort,
    /// Progress of the application's own content bootstrap.
    BootstrapProgress {
        /// Units completed.
        current: u64,
        /// Units expected.
        total: u64,
    },
    /// Bootstrap could not complete. Only a reload recovers.
    BootstrapFailed,
    /// Bootstrap finished and the environment is about to reload.
    BootstrapReload,
}

/// Actions produced by the bridge.
///
/// The driver executes these:
/// - `LoadFromBacking`, `FlushToBacking` and `Download` complete later and
///   are answered with the matching [`crate::BridgeEvent`].
/// - `StartApplication` is answered with
///   [`crate::BridgeEvent::ApplicationStarted`] once the main loop runs.
/// - The rest are fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeAction {
    /// Populate the in-memory tree under `mount` from the persistent backing.
    LoadFromBacking {
        /// Mount point to load.
        mount: PathBuf,
    },

    /// Write the in-memory tree under `mount` to the persistent backing.
    FlushToBacking {
        /// Ticket to report back on completion.
        id: FlushId,
        /// Mount point to flush.
        mount: PathBuf,
    },

    /// Fetch `url` directly into the virtual filesystem at `destination`.
    Download {
        /// Source URL.
        url: String,
        /// Target file path.
        destination: PathBuf,
    },

    /// Start the embedded application's main loop.
    StartApplication {
        /// Startup argument set.
        args: Vec<String>,
    },

    /// Deliver a notification to the host UI.
    Notify(UiNotification),

    /// A flush requested with acknowledgement has settled.
    SyncSettled {
        /// Ticket of the settled flush.
        id: FlushId,
    },

    /// Register a server reachable through a WebSocket proxy.
    AddServer {
        /// `host:port` of the server.
        address: String,
    },

    /// Open `url` in a new browsing context.
    Navigate {
        /// Target URL.
        url: String,
    },

    /// Reload the whole hosting environment.
    ReloadEnvironment,
}
