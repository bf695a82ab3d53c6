//! Bridge session.
//!
//! One long-lived object per page load. It owns every session-scoped flag
//! (warning shown, bundle fetched) and the run-dependency wait group, and
//! routes [`BridgeEvent`]s to the component state machines.
//!
//! # Phases
//!
//! ```text
//! Created ──initialize──> Loading ──LoadCompleted──> Bootstrapping
//!                                                        │ wait group empty,
//!                                                        │ bundle present
//!                                                        v
//!                         Running <──ApplicationStarted── Ready
//! ```
//!
//! Ordering guarantees:
//! - mount precedes the initial load
//! - the initial load precedes the bundle existence check
//! - the bundle fetch precedes the post-start flush
//! - `WarningFs` is emitted at most once

use tracing::{debug, info, warn};

use crate::{
    action::{BridgeAction, UiNotification},
    bootstrap::{BootstrapOrchestrator, BundleState},
    config::BridgeConfig,
    deps::RunDependencies,
    endpoint::{EndpointResolver, Protocol},
    error::BridgeError,
    event::BridgeEvent,
    input::{InputGuard, decode_url},
    launch::{KnownServers, LaunchArgs},
    sandbox::Sandbox,
    storage::{FlushFollowUp, StorageSync},
};

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing mounted.
    Created,
    /// Initial load in flight.
    Loading,
    /// Bundle check or fetch in flight.
    Bootstrapping,
    /// Wait group drained; application start requested.
    Ready,
    /// Application main loop running.
    Running,
}

/// The bridge session state machine.
#[derive(Debug, Clone)]
pub struct BridgeSession {
    phase: SessionPhase,
    deps: RunDependencies,
    storage: StorageSync,
    bootstrap: BootstrapOrchestrator,
    resolver: EndpointResolver,
    input: InputGuard,
    launch: LaunchArgs,
    servers: KnownServers,
}

impl BridgeSession {
    /// Create a session from configuration.
    pub fn new(config: BridgeConfig) -> Self {
        let BridgeConfig { layout, bundle, resolver, launch, servers } = config;
        Self {
            phase: SessionPhase::Created,
            deps: RunDependencies::new(),
            storage: StorageSync::new(layout.mount_point()),
            bootstrap: BootstrapOrchestrator::new(layout, bundle),
            resolver: EndpointResolver::new(resolver),
            input: InputGuard::new(),
            launch,
            servers,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Run-dependency wait group.
    pub fn dependencies(&self) -> &RunDependencies {
        &self.deps
    }

    /// Storage sync manager.
    pub fn storage(&self) -> &StorageSync {
        &self.storage
    }

    /// Bootstrap orchestrator.
    pub fn bootstrap(&self) -> &BootstrapOrchestrator {
        &self.bootstrap
    }

    /// Input timing guard.
    pub fn input(&self) -> &InputGuard {
        &self.input
    }

    /// Resolve the endpoint for one connection attempt.
    ///
    /// Pure; valid in any phase.
    pub fn resolve_endpoint(&self, host: &str, port: u16, protocol: Protocol) -> Option<String> {
        let endpoint = self.resolver.resolve(host, port, protocol);
        debug!(host, port, %protocol, ?endpoint, "endpoint resolved");
        endpoint
    }

    /// Mount the persistent backing and start the initial load.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if called more than once.
    pub fn initialize<S: Sandbox + ?Sized>(
        &mut self,
        sandbox: &mut S,
    ) -> Result<Vec<BridgeAction>, BridgeError> {
        self.expect_phase(&[SessionPhase::Created], "initialize")?;
        self.phase = SessionPhase::Loading;
        Ok(self.storage.initialize(sandbox, &mut self.deps))
    }

    /// Process an event and return the actions to execute.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for events that do not fit the current phase,
    /// `UnknownFlush` for unmatched flush completions, and
    /// `NoDownloadInFlight` for unmatched download completions.
    pub fn handle<S: Sandbox + ?Sized>(
        &mut self,
        event: BridgeEvent,
        sandbox: &mut S,
    ) -> Result<Vec<BridgeAction>, BridgeError> {
        match event {
            BridgeEvent::LoadCompleted(result) => {
                self.expect_phase(&[SessionPhase::Loading], "load_completed")?;
                self.phase = SessionPhase::Bootstrapping;

                // The bundle check registers its dependency before the load
                // releases its own, so the wait group never drains early.
                let mut actions = self.bootstrap.run(sandbox, &mut self.deps)?;
                self.storage.load_settled(result, &mut self.deps)?;
                actions.extend(self.release_if_ready());
                Ok(actions)
            },

            BridgeEvent::DownloadFinished(result) => {
                self.expect_phase(&[SessionPhase::Bootstrapping], "download_finished")?;
                let mut actions = self.bootstrap.download_settled(result, &mut self.deps)?;
                actions.extend(self.release_if_ready());
                Ok(actions)
            },

            BridgeEvent::ApplicationStarted => {
                self.expect_phase(&[SessionPhase::Ready], "application_started")?;
                self.phase = SessionPhase::Running;
                info!("application running");

                if self.bootstrap.take_post_start_flush() {
                    debug!("persisting downloaded asset bundle");
                    return Ok(self.storage.sync_out(FlushFollowUp::Nothing));
                }
                Ok(vec![])
            },

            BridgeEvent::FlushCompleted { id, result } => self.storage.flush_settled(id, result),

            BridgeEvent::RequestSync { acknowledge } => {
                self.expect_loaded("request_sync")?;
                let follow_up =
                    if acknowledge { FlushFollowUp::Acknowledge } else { FlushFollowUp::Nothing };
                Ok(self.storage.sync_out(follow_up))
            },

            BridgeEvent::RequestExit => {
                self.expect_loaded("request_exit")?;
                Ok(self.storage.on_exit())
            },

            BridgeEvent::RequestAbort => {
                self.expect_loaded("request_abort")?;
                Ok(self.storage.on_abort())
            },

            BridgeEvent::BootstrapProgress { current, total } => {
                Ok(vec![BridgeAction::Notify(UiNotification::BootstrapProgress {
                    current: current.min(total),
                    total,
                })])
            },

            BridgeEvent::BootstrapFailed => {
                Ok(vec![BridgeAction::Notify(UiNotification::BootstrapFailed)])
            },

            BridgeEvent::BootstrapReload => {
                self.expect_loaded("bootstrap_reload")?;
                Ok(self.storage.sync_out(FlushFollowUp::BootstrapReload))
            },

            BridgeEvent::PrepareServerList => Ok(self.servers.prepare()),

            BridgeEvent::OpenUrl { bytes, len } => {
                Ok(self.input.request_navigation(decode_url(&bytes, len)))
            },

            BridgeEvent::PointerDown(button) => {
                self.input.pointer_down(button);
                Ok(vec![])
            },

            BridgeEvent::PointerUp(button) => Ok(self.input.pointer_up(button)),
        }
    }

    /// Request application start once the wait group drains.
    ///
    /// A failed bundle fetch keeps the session in `Bootstrapping`; only a
    /// reload recovers.
    fn release_if_ready(&mut self) -> Vec<BridgeAction> {
        if self.phase != SessionPhase::Bootstrapping || !self.deps.is_empty() {
            return vec![];
        }
        if self.bootstrap.state() == BundleState::Failed {
            warn!("asset bundle missing, application not started");
            return vec![];
        }
        self.phase = SessionPhase::Ready;
        info!(dependencies = self.deps.added(), "startup dependencies satisfied");
        vec![BridgeAction::StartApplication { args: self.launch.to_argv() }]
    }

    /// Flushing before the initial load would overwrite the backing store
    /// with an empty tree.
    fn expect_loaded(&self, operation: &str) -> Result<(), BridgeError> {
        self.expect_phase(
            &[SessionPhase::Bootstrapping, SessionPhase::Ready, SessionPhase::Running],
            operation,
        )
    }

    fn expect_phase(&self, allowed: &[SessionPhase], operation: &str) -> Result<(), BridgeError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(BridgeError::InvalidState { phase: self.phase, operation: operation.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeSet,
        path::{Path, PathBuf},
    };

    use super::*;
    use crate::{
        bootstrap::AssetBundle,
        error::{DownloadError, SandboxError, StorageError},
        event::PointerButton,
        storage::FlushId,
    };

    #[derive(Default)]
    struct Tree {
        paths: BTreeSet<PathBuf>,
    }

    impl Sandbox for Tree {
        fn create_dir(&mut self, path: &Path) -> Result<(), SandboxError> {
            if !self.paths.insert(path.to_path_buf()) {
                return Err(SandboxError::AlreadyExists(path.to_path_buf()));
            }
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.paths.contains(path)
        }

        fn mount_persistent(&mut self, _path: &Path) -> Result<(), SandboxError> {
            Ok(())
        }
    }

    fn started_session(tree: &mut Tree) -> BridgeSession {
        let mut session = BridgeSession::new(BridgeConfig::default());
        session.initialize(tree).unwrap();
        session.handle(BridgeEvent::LoadCompleted(Ok(())), tree).unwrap();
        session.handle(BridgeEvent::DownloadFinished(Ok(())), tree).unwrap();
        session.handle(BridgeEvent::ApplicationStarted, tree).unwrap();
        session
    }

    #[test]
    fn startup_with_download() {
        let mut tree = Tree::default();
        let mut session = BridgeSession::new(BridgeConfig::default());

        let actions = session.initialize(&mut tree).unwrap();
        assert_eq!(session.phase(), SessionPhase::Loading);
        assert!(matches!(actions.as_slice(), [BridgeAction::LoadFromBacking { .. }]));
        assert!(tree.exists(Path::new("/home/web_user/.openttd")));

        let actions = session.handle(BridgeEvent::LoadCompleted(Ok(())), &mut tree).unwrap();
        assert_eq!(session.phase(), SessionPhase::Bootstrapping);
        assert!(matches!(actions.as_slice(), [BridgeAction::Download { .. }]));
        assert_eq!(session.dependencies().pending(), 1);

        let actions = session.handle(BridgeEvent::DownloadFinished(Ok(())), &mut tree).unwrap();
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert_eq!(
            actions,
            vec![BridgeAction::StartApplication { args: LaunchArgs::default().to_argv() }]
        );

        let actions = session.handle(BridgeEvent::ApplicationStarted, &mut tree).unwrap();
        assert_eq!(session.phase(), SessionPhase::Running);
        assert!(matches!(actions[0], BridgeAction::FlushToBacking { id: FlushId(0), .. }));
        assert_eq!(actions[1], BridgeAction::Notify(UiNotification::WarningFs));
    }

    #[test]
    fn startup_with_bundle_present_skips_download() {
        let mut tree = Tree::default();
        let layout = BridgeConfig::default().layout;
        let mut session = BridgeSession::new(BridgeConfig::default());
        session.initialize(&mut tree).unwrap();
        tree.paths.insert(layout.content_download_dir());
        tree.paths.insert(layout.baseset_dir());
        tree.paths.insert(session.bootstrap().bundle_path());

        let actions = session.handle(BridgeEvent::LoadCompleted(Ok(())), &mut tree).unwrap();
        assert!(matches!(actions.as_slice(), [BridgeAction::StartApplication { .. }]));

        let actions = session.handle(BridgeEvent::ApplicationStarted, &mut tree).unwrap();
        assert!(actions.is_empty());
        assert_eq!(session.dependencies().added(), session.dependencies().removed());
    }

    #[test]
    fn failed_load_still_proceeds() {
        let mut tree = Tree::default();
        let mut session = BridgeSession::new(BridgeConfig::default());
        session.initialize(&mut tree).unwrap();

        let failed = BridgeEvent::LoadCompleted(Err(StorageError::Unavailable("denied".into())));
        let actions = session.handle(failed, &mut tree).unwrap();
        assert!(matches!(actions.as_slice(), [BridgeAction::Download { .. }]));
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let mut tree = Tree::default();
        let mut session = BridgeSession::new(BridgeConfig::default());
        session.initialize(&mut tree).unwrap();
        assert!(matches!(
            session.initialize(&mut tree),
            Err(BridgeError::InvalidState { phase: SessionPhase::Loading, .. })
        ));
    }

    #[test]
    fn sync_before_load_is_rejected() {
        let mut tree = Tree::default();
        let mut session = BridgeSession::new(BridgeConfig::default());
        session.initialize(&mut tree).unwrap();

        let result = session.handle(BridgeEvent::RequestSync { acknowledge: false }, &mut tree);
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
        assert_eq!(session.storage().flushes_in_flight(), 0);
    }

    #[test]
    fn exit_notifies_after_flush() {
        let mut tree = Tree::default();
        let mut session = started_session(&mut tree);

        let actions = session.handle(BridgeEvent::RequestExit, &mut tree).unwrap();
        let id = match actions.as_slice() {
            [BridgeAction::FlushToBacking { id, .. }] => *id,
            other => unreachable!("unexpected actions {other:?}"),
        };

        let actions =
            session.handle(BridgeEvent::FlushCompleted { id, result: Ok(()) }, &mut tree).unwrap();
        assert_eq!(actions, vec![BridgeAction::Notify(UiNotification::Exit)]);
    }

    #[test]
    fn bootstrap_progress_is_clamped() {
        let mut tree = Tree::default();
        let mut session = BridgeSession::new(BridgeConfig::default());
        let actions = session
            .handle(BridgeEvent::BootstrapProgress { current: 12, total: 10 }, &mut tree)
            .unwrap();
        assert_eq!(
            actions,
            vec![BridgeAction::Notify(UiNotification::BootstrapProgress { current: 10, total: 10 })]
        );
    }

    #[test]
    fn navigation_waits_for_release() {
        let mut tree = Tree::default();
        let mut session = started_session(&mut tree);

        session.handle(BridgeEvent::PointerDown(PointerButton::Primary), &mut tree).unwrap();
        let actions = session.handle(BridgeEvent::open_url("https://a"), &mut tree).unwrap();
        assert!(actions.is_empty());

        let actions =
            session.handle(BridgeEvent::PointerUp(PointerButton::Primary), &mut tree).unwrap();
        assert_eq!(actions, vec![BridgeAction::Navigate { url: "https://a".into() }]);
    }

    #[test]
    fn failed_download_does_not_start_application() {
        let mut tree = Tree::default();
        let mut session = BridgeSession::new(BridgeConfig::default());
        session.initialize(&mut tree).unwrap();
        session.handle(BridgeEvent::LoadCompleted(Ok(())), &mut tree).unwrap();

        let failed = BridgeEvent::DownloadFinished(Err(DownloadError {
            url: AssetBundle::default().url,
            reason: "503".into(),
        }));
        let actions = session.handle(failed, &mut tree).unwrap();

        assert_eq!(actions, vec![BridgeAction::Notify(UiNotification::BootstrapFailed)]);
        assert_eq!(session.phase(), SessionPhase::Bootstrapping);
        assert!(session.dependencies().is_empty());
        assert!(matches!(
            session.handle(BridgeEvent::ApplicationStarted, &mut tree),
            Err(BridgeError::InvalidState { phase: SessionPhase::Bootstrapping, .. })
        ));
    }

    #[test]
    fn reload_after_failed_download_flushes_then_reloads() {
        let mut tree = Tree::default();
        let mut session = BridgeSession::new(BridgeConfig::default());
        session.initialize(&mut tree).unwrap();
        session.handle(BridgeEvent::LoadCompleted(Ok(())), &mut tree).unwrap();
        let error = DownloadError { url: AssetBundle::default().url, reason: "offline".into() };
        session.handle(BridgeEvent::DownloadFinished(Err(error)), &mut tree).unwrap();

        let actions = session.handle(BridgeEvent::BootstrapReload, &mut tree).unwrap();
        let id = match actions.first() {
            Some(BridgeAction::FlushToBacking { id, .. }) => *id,
            other => unreachable!("unexpected actions {other:?}"),
        };
        let actions =
            session.handle(BridgeEvent::FlushCompleted { id, result: Ok(()) }, &mut tree).unwrap();
        assert_eq!(
            actions,
            vec![
                BridgeAction::Notify(UiNotification::BootstrapReload),
                BridgeAction::ReloadEnvironment
            ]
        );
    }

    #[test]
    fn open_url_decodes_declared_length() {
        let mut tree = Tree::default();
        let mut session = started_session(&mut tree);

        let truncated =
            BridgeEvent::OpenUrl { bytes: b"https://www.openttd.org/\0junk".to_vec(), len: 24 };
        assert_eq!(
            session.handle(truncated, &mut tree).unwrap(),
            vec![BridgeAction::Navigate { url: "https://www.openttd.org/".into() }]
        );

        let overlong = BridgeEvent::OpenUrl { bytes: b"https://a".to_vec(), len: 64 };
        assert_eq!(
            session.handle(overlong, &mut tree).unwrap(),
            vec![BridgeAction::Navigate { url: "https://a".into() }]
        );
    }

    #[test]
    fn open_url_replaces_invalid_utf8_and_waits_for_release() {
        let mut tree = Tree::default();
        let mut session = started_session(&mut tree);
        session.handle(BridgeEvent::PointerDown(PointerButton::Primary), &mut tree).unwrap();

        let mut bytes = b"https://caf".to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b".example/");
        let len = bytes.len();
        let actions = session.handle(BridgeEvent::OpenUrl { bytes, len }, &mut tree).unwrap();
        assert!(actions.is_empty());
        assert_eq!(session.input().pending(), Some("https://caf\u{fffd}.example/"));

        let actions =
            session.handle(BridgeEvent::PointerUp(PointerButton::Primary), &mut tree).unwrap();
        assert_eq!(
            actions,
            vec![BridgeAction::Navigate { url: "https://caf\u{fffd}.example/".into() }]
        );
    }
}
