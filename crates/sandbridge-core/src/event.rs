//! Bridge events
//!
//! Inputs to [`crate::BridgeSession::handle`]: completions reported by the
//! driver, and hooks invoked by the embedded application or host UI.

use crate::{
    error::{DownloadError, StorageError},
    storage::FlushId,
};

/// Pointer button as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Left button, or the only button.
    Primary,
    /// Middle button.
    Auxiliary,
    /// Right button.
    Secondary,
    /// Any further button.
    Other(u16),
}

impl PointerButton {
    /// Map a DOM `MouseEvent.button` code.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Primary,
            1 => Self::Auxiliary,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }
}

/// Events consumed by the bridge session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// Initial load from the persistent backing settled.
    LoadCompleted(Result<(), StorageError>),

    /// A flush settled.
    FlushCompleted {
        /// Ticket from the `FlushToBacking` action.
        id: FlushId,
        /// Outcome reported by the backing store.
        result: Result<(), StorageError>,
    },

    /// Asset download settled.
    DownloadFinished(Result<(), DownloadError>),

    /// The embedded application's main loop is running.
    ApplicationStarted,

    /// Manual checkpoint requested.
    RequestSync {
        /// Emit `SyncSettled` once the flush completes.
        acknowledge: bool,
    },

    /// The application is exiting.
    RequestExit,

    /// The application is aborting.
    RequestAbort,

    /// Application bootstrap progress.
    BootstrapProgress {
        /// Units completed.
        current: u64,
        /// Units expected.
        total: u64,
    },

    /// Application bootstrap failed.
    BootstrapFailed,

    /// Application bootstrap finished; persist and reload.
    BootstrapReload,

    /// Enumerate servers reachable through a WebSocket proxy.
    PrepareServerList,

    /// Open an external URL handed over as a buffer and explicit length.
    ///
    /// The first `len` bytes are decoded as UTF-8, lossily, clamped to the
    /// buffer.
    OpenUrl {
        /// Raw URL buffer.
        bytes: Vec<u8>,
        /// Number of meaningful bytes in `bytes`.
        len: usize,
    },

    /// Pointer button pressed.
    PointerDown(PointerButton),

    /// Pointer button released.
    PointerUp(PointerButton),
}

impl BridgeEvent {
    /// `OpenUrl` covering the whole of `url`.
    pub fn open_url(url: &str) -> Self {
        Self::OpenUrl { bytes: url.as_bytes().to_vec(), len: url.len() }
    }
}
