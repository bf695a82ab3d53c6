//! Synchronous virtual filesystem primitives.
//!
//! The sandbox's in-memory filesystem answers these calls immediately, so the
//! state machines call them directly rather than emitting actions. Anything
//! that completes later (backing load and flush, downloads) goes through
//! [`crate::BridgeAction`] instead.

use std::path::Path;

use crate::error::SandboxError;

/// Virtual filesystem exposed by the host sandbox.
pub trait Sandbox {
    /// Create a single directory.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the path is present and `MissingParent` if
    /// the parent directory is not.
    fn create_dir(&mut self, path: &Path) -> Result<(), SandboxError>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Attach the persistent backing to an existing directory.
    ///
    /// # Errors
    ///
    /// Returns `Mount` if the backing cannot be attached.
    fn mount_persistent(&mut self, path: &Path) -> Result<(), SandboxError>;
}

/// Create `path` unless it is already present.
///
/// Returns `Ok(true)` when the directory was created by this call.
pub(crate) fn ensure_dir<S: Sandbox + ?Sized>(
    sandbox: &mut S,
    path: &Path,
) -> Result<bool, SandboxError> {
    if sandbox.exists(path) {
        return Ok(false);
    }
    match sandbox.create_dir(path) {
        Ok(()) => Ok(true),
        Err(SandboxError::AlreadyExists(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
