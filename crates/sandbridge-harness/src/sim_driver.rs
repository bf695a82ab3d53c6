//! Simulated bridge driver.
//!
//! Executes bridge effects against a [`SimSandbox`] and a [`SharedBacking`],
//! records every externally visible effect in a [`Journal`], and injects
//! load, flush and download failures from a seeded RNG.

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandbridge_app::Driver;
use sandbridge_core::{DownloadError, FlushId, StorageError, UiNotification};
use thiserror::Error;
use tracing::debug;

use crate::sim_sandbox::{SharedBacking, SimSandbox};

/// Failure probabilities for simulated asynchronous work.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaultPlan {
    /// Probability the initial load fails.
    pub load_failure_rate: f64,
    /// Probability a flush fails.
    pub flush_failure_rate: f64,
    /// Probability the asset download fails.
    pub download_failure_rate: f64,
    /// RNG seed.
    pub seed: u64,
}

/// Everything the driver was asked to do, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    /// Notifications delivered to the host UI.
    pub notifications: Vec<UiNotification>,
    /// Argument set the application was started with.
    pub started_with: Option<Vec<String>>,
    /// URLs fetched.
    pub downloads: Vec<String>,
    /// Loads attempted.
    pub loads: usize,
    /// Flushes attempted.
    pub flushes: usize,
    /// Flushes that failed.
    pub failed_flushes: usize,
    /// Acknowledged manual syncs.
    pub settled_syncs: Vec<FlushId>,
    /// Servers offered to the server browser.
    pub servers: Vec<String>,
    /// URLs opened in a new context.
    pub navigations: Vec<String>,
    /// Environment reloads requested.
    pub reloads: usize,
}

impl Journal {
    /// Occurrences of `notification`.
    pub fn count(&self, notification: UiNotification) -> usize {
        self.notifications.iter().filter(|n| **n == notification).count()
    }
}

/// Driver misuse detected by the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// The application was started twice in one session.
    #[error("application already started")]
    AlreadyStarted,
}

/// Simulated driver for one browser session.
pub struct SimDriver {
    sandbox: SimSandbox,
    backing: SharedBacking,
    faults: FaultPlan,
    rng: ChaCha8Rng,
    journal: Journal,
}

impl SimDriver {
    /// Fresh session over `backing` with no faults.
    pub fn new(backing: SharedBacking) -> Self {
        Self::with_faults(backing, FaultPlan::default())
    }

    /// Fresh session over `backing` with the given fault plan.
    pub fn with_faults(backing: SharedBacking, faults: FaultPlan) -> Self {
        Self {
            sandbox: SimSandbox::new(),
            backing,
            rng: ChaCha8Rng::seed_from_u64(faults.seed),
            faults,
            journal: Journal::default(),
        }
    }

    /// Recorded effects.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Volatile filesystem.
    pub fn sim_sandbox(&self) -> &SimSandbox {
        &self.sandbox
    }

    /// Shared backing store.
    pub fn backing(&self) -> &SharedBacking {
        &self.backing
    }

    fn roll(&mut self, rate: f64) -> bool {
        rate > 0.0 && self.rng.gen_bool(rate.min(1.0))
    }
}

impl Driver for SimDriver {
    type Error = SimError;
    type Sandbox = SimSandbox;

    fn sandbox(&mut self) -> &mut SimSandbox {
        &mut self.sandbox
    }

    async fn load_from_backing(&mut self, mount: &Path) -> Result<(), StorageError> {
        self.journal.loads += 1;
        if self.roll(self.faults.load_failure_rate) {
            return Err(StorageError::Unavailable("injected load failure".to_string()));
        }
        let backing = self.backing.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.sandbox.load_from(mount, &backing)
    }

    async fn flush_to_backing(&mut self, mount: &Path) -> Result<(), StorageError> {
        self.journal.flushes += 1;
        let result = if self.roll(self.faults.flush_failure_rate) {
            Err(StorageError::Unavailable("injected flush failure".to_string()))
        } else {
            let mut backing =
                self.backing.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            self.sandbox.flush_to(mount, &mut backing)
        };
        if result.is_err() {
            self.journal.failed_flushes += 1;
        }
        result
    }

    async fn download(&mut self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        self.journal.downloads.push(url.to_string());
        if self.roll(self.faults.download_failure_rate) {
            return Err(DownloadError {
                url: url.to_string(),
                reason: "injected download failure".to_string(),
            });
        }
        self.sandbox
            .write_file(destination, url.as_bytes())
            .map_err(|e| DownloadError { url: url.to_string(), reason: e.to_string() })
    }

    fn start_application(&mut self, args: &[String]) -> Result<(), SimError> {
        if self.journal.started_with.is_some() {
            return Err(SimError::AlreadyStarted);
        }
        debug!(?args, "application started");
        self.journal.started_with = Some(args.to_vec());
        Ok(())
    }

    fn notify(&mut self, notification: UiNotification) -> Result<(), SimError> {
        debug!(?notification, "ui notified");
        self.journal.notifications.push(notification);
        Ok(())
    }

    fn sync_settled(&mut self, id: FlushId) -> Result<(), SimError> {
        self.journal.settled_syncs.push(id);
        Ok(())
    }

    fn add_server(&mut self, address: &str) -> Result<(), SimError> {
        self.journal.servers.push(address.to_string());
        Ok(())
    }

    fn navigate(&mut self, url: &str) -> Result<(), SimError> {
        self.journal.navigations.push(url.to_string());
        Ok(())
    }

    fn reload(&mut self) -> Result<(), SimError> {
        self.journal.reloads += 1;
        Ok(())
    }
}
