//! Sandbox runtime bridge core logic
//!
//! Pure state machines that let an application embedded in a browser sandbox
//! behave like a persistent, networked desktop program: durable storage over
//! an in-memory filesystem, redirection of raw connections to browser-legal
//! endpoints, and a one-time download of mandatory assets.
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O. Synchronous filesystem primitives are
//! reached through the [`Sandbox`] trait, which the caller passes in.
//! Asynchronous work (loading from the persistent backing, flushing to it,
//! downloading assets) is described by [`BridgeAction`]s. A driver executes
//! those actions and reports completion back as [`BridgeEvent`]s.
//!
//! # Components
//!
//! - [`endpoint`]: Endpoint resolver (pinned proxies, secure-page policy)
//! - [`storage`]: Storage sync manager (mount, load, flush, one-time warning)
//! - [`bootstrap`]: Asset bootstrap orchestrator (download at most once)
//! - [`input`]: Input timing guard (defer navigation until button release)
//! - [`deps`]: Run-dependency wait group gating application start
//! - [`session`]: The long-lived bridge session tying the above together
//! - [`sandbox`]: Virtual filesystem seam
//! - [`launch`]: Startup arguments and known servers
//! - [`config`]: Bridge configuration
//! - [`error`]: Error types

pub mod action;
pub mod bootstrap;
pub mod config;
pub mod deps;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod input;
pub mod launch;
pub mod sandbox;
pub mod session;
pub mod storage;

pub use action::{BridgeAction, UiNotification};
pub use bootstrap::{AssetBundle, BootstrapOrchestrator, BundleState};
pub use config::BridgeConfig;
pub use deps::{DependencyId, RunDependencies};
pub use endpoint::{
    EndpointResolver, EndpointSpec, PageTransport, PinnedEndpoint, Protocol, ResolverConfig,
};
pub use error::{BridgeError, DownloadError, SandboxError, StorageError};
pub use event::{BridgeEvent, PointerButton};
pub use input::{ButtonState, InputGuard, decode_url};
pub use launch::{KnownServers, LaunchArgs};
pub use sandbox::Sandbox;
pub use session::{BridgeSession, SessionPhase};
pub use storage::{FlushFollowUp, FlushId, MountPoint, StorageLayout, StorageSync, SyncState};
