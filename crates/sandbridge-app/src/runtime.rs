//! Generic bridge runtime.
//!
//! Interprets [`BridgeAction`]s against a [`Driver`] and feeds completions
//! back into the [`BridgeSession`]. Actions are executed one at a time, in
//! the order the session produced them, on a single task. Completion events
//! are queued behind the actions already pending, the way callbacks queue
//! behind earlier work on a browser event loop.

use std::collections::VecDeque;

use sandbridge_core::{
    BridgeAction, BridgeConfig, BridgeError, BridgeEvent, BridgeSession, Protocol,
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::Driver;

/// Errors surfaced by the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError<E: std::error::Error + 'static> {
    /// The session rejected an event.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The driver failed to execute an action.
    #[error("driver error: {0}")]
    Driver(#[source] E),
}

/// Bridge runtime generic over the driver.
pub struct Runtime<D: Driver> {
    session: BridgeSession,
    driver: D,
    queue: VecDeque<BridgeAction>,
}

impl<D: Driver> Runtime<D> {
    /// Create a runtime. Nothing happens until [`start`](Self::start).
    pub fn new(config: BridgeConfig, driver: D) -> Self {
        Self { session: BridgeSession::new(config), driver, queue: VecDeque::new() }
    }

    /// Session state.
    pub fn session(&self) -> &BridgeSession {
        &self.session
    }

    /// Driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Consume the runtime and return the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Mount, load, bootstrap, and start the application.
    ///
    /// Returns once every action the startup produced has been executed.
    /// If the asset download failed, the application is not started and the
    /// host UI has been notified.
    pub async fn start(&mut self) -> Result<(), RuntimeError<D::Error>> {
        let actions = self.session.initialize(self.driver.sandbox())?;
        self.queue.extend(actions);
        self.drain().await
    }

    /// Deliver a host or application hook and execute the resulting actions.
    pub async fn dispatch(&mut self, event: BridgeEvent) -> Result<(), RuntimeError<D::Error>> {
        self.feed(event)?;
        self.drain().await
    }

    /// Resolve the endpoint for one connection attempt.
    pub fn resolve_endpoint(&self, host: &str, port: u16, protocol: Protocol) -> Option<String> {
        self.session.resolve_endpoint(host, port, protocol)
    }

    fn feed(&mut self, event: BridgeEvent) -> Result<(), RuntimeError<D::Error>> {
        trace!(?event, "event");
        let actions = self.session.handle(event, self.driver.sandbox())?;
        self.queue.extend(actions);
        Ok(())
    }

    async fn drain(&mut self) -> Result<(), RuntimeError<D::Error>> {
        while let Some(action) = self.queue.pop_front() {
            self.execute(action).await?;
        }
        Ok(())
    }

    async fn execute(&mut self, action: BridgeAction) -> Result<(), RuntimeError<D::Error>> {
        debug!(?action, "executing");

        match action {
            BridgeAction::LoadFromBacking { mount } => {
                let result = self.driver.load_from_backing(&mount).await;
                self.feed(BridgeEvent::LoadCompleted(result))
            },
            BridgeAction::FlushToBacking { id, mount } => {
                let result = self.driver.flush_to_backing(&mount).await;
                self.feed(BridgeEvent::FlushCompleted { id, result })
            },
            BridgeAction::Download { url, destination } => {
                let result = self.driver.download(&url, &destination).await;
                self.feed(BridgeEvent::DownloadFinished(result))
            },
            BridgeAction::StartApplication { args } => {
                self.driver.start_application(&args).map_err(RuntimeError::Driver)?;
                self.feed(BridgeEvent::ApplicationStarted)
            },
            BridgeAction::Notify(notification) => {
                self.driver.notify(notification).map_err(RuntimeError::Driver)
            },
            BridgeAction::SyncSettled { id } => {
                self.driver.sync_settled(id).map_err(RuntimeError::Driver)
            },
            BridgeAction::AddServer { address } => {
                self.driver.add_server(&address).map_err(RuntimeError::Driver)
            },
            BridgeAction::Navigate { url } => {
                self.driver.navigate(&url).map_err(RuntimeError::Driver)
            },
            BridgeAction::ReloadEnvironment => self.driver.reload().map_err(RuntimeError::Driver),
        }
    }
}
