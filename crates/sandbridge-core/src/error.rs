//! Error types for the bridge.
//!
//! Storage and download failures are values the driver reports back to the
//! bridge; they are absorbed or turned into UI notifications and never
//! returned to callers. [`BridgeError`] is reserved for misuse of the state
//! machine itself.

use std::path::PathBuf;

use thiserror::Error;

use crate::{deps::DependencyId, session::SessionPhase, storage::FlushId};

/// Failure of a synchronous virtual filesystem primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    /// Directory or file already present at the path.
    #[error("path already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Parent directory does not exist.
    #[error("parent directory missing for {}", .0.display())]
    MissingParent(PathBuf),

    /// Persistent backing could not be mounted.
    #[error("cannot mount persistent backing at {}: {reason}", path.display())]
    Mount {
        /// Requested mount point.
        path: PathBuf,
        /// Reason reported by the sandbox.
        reason: String,
    },
}

/// Load or flush against the persistent backing failed.
///
/// The browser may evict or deny the backing store at any time, so this is
/// an expected outcome rather than an exceptional one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Backing store refused or lost the operation.
    #[error("persistent backing unavailable: {0}")]
    Unavailable(String),
}

/// Asset download failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("download of {url} failed: {reason}")]
pub struct DownloadError {
    /// Source URL.
    pub url: String,
    /// Reason reported by the fetch machinery.
    pub reason: String,
}

/// Contract violations detected by the bridge state machines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Operation not valid in the current session phase.
    #[error("invalid state {phase:?} for operation: {operation}")]
    InvalidState {
        /// Phase the session was in.
        phase: SessionPhase,
        /// Operation attempted.
        operation: String,
    },

    /// Flush completion reported for a ticket that was never issued.
    #[error("unknown flush ticket {0}")]
    UnknownFlush(FlushId),

    /// A run-dependency was released more often than it was registered.
    #[error("run dependency {0} released without a matching registration")]
    UnbalancedDependency(DependencyId),

    /// Download completion reported while no download was in flight.
    #[error("no asset download in flight")]
    NoDownloadInFlight,
}
