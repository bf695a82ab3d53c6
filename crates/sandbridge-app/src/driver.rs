//! Driver trait for abstracting sandbox effects.
//!
//! The [`Driver`] trait decouples the bridge runtime from the sandbox it
//! runs in. The browser build forwards to the virtual filesystem, the
//! persistent backing and the host UI; the harness forwards to an in-memory
//! simulation. The generic [`crate::Runtime`] handles all orchestration.

use std::{future::Future, path::Path};

use sandbridge_core::{DownloadError, FlushId, Sandbox, StorageError, UiNotification};

/// Abstracts sandbox effects for the bridge runtime.
///
/// Execution is single-threaded and cooperative, so neither the driver nor
/// its futures need to be `Send`.
pub trait Driver {
    /// Platform-specific error type.
    type Error: std::error::Error + 'static;

    /// Synchronous virtual filesystem.
    type Sandbox: Sandbox;

    /// Access the virtual filesystem.
    fn sandbox(&mut self) -> &mut Self::Sandbox;

    /// Populate the in-memory tree under `mount` from the persistent backing.
    ///
    /// Failures are reported, never retried.
    fn load_from_backing(
        &mut self,
        mount: &Path,
    ) -> impl Future<Output = Result<(), StorageError>>;

    /// Write the in-memory tree under `mount` to the persistent backing.
    fn flush_to_backing(
        &mut self,
        mount: &Path,
    ) -> impl Future<Output = Result<(), StorageError>>;

    /// Fetch `url` into the virtual filesystem at `destination`.
    fn download(
        &mut self,
        url: &str,
        destination: &Path,
    ) -> impl Future<Output = Result<(), DownloadError>>;

    /// Start the embedded application's main loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the application cannot be started.
    fn start_application(&mut self, args: &[String]) -> Result<(), Self::Error>;

    /// Deliver a notification to the host UI.
    ///
    /// # Errors
    ///
    /// Returns an error if the host UI is gone.
    fn notify(&mut self, notification: UiNotification) -> Result<(), Self::Error>;

    /// Run the completion callback of an acknowledged manual sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback cannot be reached.
    fn sync_settled(&mut self, id: FlushId) -> Result<(), Self::Error>;

    /// Offer a proxied server to the application's server browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the application rejects the entry.
    fn add_server(&mut self, address: &str) -> Result<(), Self::Error>;

    /// Open `url` in a new browsing context.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot be opened.
    fn navigate(&mut self, url: &str) -> Result<(), Self::Error>;

    /// Reload the hosting environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the reload cannot be scheduled.
    fn reload(&mut self) -> Result<(), Self::Error>;
}
