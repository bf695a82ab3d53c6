//! Scenario builder API.
//!
//! Provides a declarative API for constructing multi-session bridge
//! scenarios that enforce the Oracle Pattern.

use sandbridge_app::Runtime;
use sandbridge_core::{BridgeConfig, BridgeEvent, EndpointSpec, PageTransport, Protocol};

use crate::{
    FaultPlan, SimDriver,
    scenario::{OracleFn, SessionReport, World},
    sim_sandbox::{BackingStore, create_shared_backing},
};

/// One step executed in every session after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Deliver a host or application hook.
    Event(BridgeEvent),
    /// Resolve the endpoint for a connection attempt.
    Connect(EndpointSpec),
}

/// Scenario builder.
///
/// Configure sessions, steps and faults, then call `.oracle()` to get a
/// [`RunnableScenario`].
pub struct Scenario {
    name: String,
    config: BridgeConfig,
    faults: FaultPlan,
    sessions: usize,
    preinstalled: bool,
    steps: Vec<Step>,
}

impl Scenario {
    /// Create a single-session scenario with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: BridgeConfig::default(),
            faults: FaultPlan::default(),
            sessions: 1,
            preinstalled: false,
            steps: Vec::new(),
        }
    }

    /// Replace the bridge configuration.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Serve the hosting page over a secure transport.
    pub fn secure_page(mut self) -> Self {
        self.config.resolver.page = PageTransport::Secure;
        self
    }

    /// Seed the backing store with the configured asset bundle.
    pub fn bundle_preinstalled(mut self) -> Self {
        self.preinstalled = true;
        self
    }

    /// Inject faults. Each session reseeds from `faults.seed + index`.
    pub fn faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Run `count` sessions back to back over one backing store.
    pub fn sessions(mut self, count: usize) -> Self {
        self.sessions = count;
        self
    }

    /// Deliver `event` in every session after startup.
    pub fn event(mut self, event: BridgeEvent) -> Self {
        self.steps.push(Step::Event(event));
        self
    }

    /// Resolve a connection attempt in every session after startup.
    pub fn connect(mut self, host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        self.steps.push(Step::Connect(EndpointSpec::new(host, port, protocol)));
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// For each session:
    /// 1. A fresh volatile filesystem is created over the shared backing
    /// 2. The runtime starts: mount, load, bootstrap, application start
    /// 3. Every step is delivered in order
    ///
    /// The oracle then verifies the final world.
    pub fn run(self) -> Result<(), String> {
        let executor = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| format!("Scenario '{}': executor: {e}", self.scenario.name))?;

        let world = executor.block_on(self.execute())?;
        (self.oracle)(&world)
    }

    async fn execute(&self) -> Result<World, String> {
        let Scenario { name, config, faults, sessions, preinstalled, steps } = &self.scenario;
        let backing = create_shared_backing();

        if *preinstalled {
            let path = config.layout.baseset_dir().join(&config.bundle.file_name);
            let mut store = backing.lock().map_err(|_| format!("Scenario '{name}': poisoned"))?;
            store.seed_file(&path, config.bundle.url.as_bytes());
        }

        let mut world = World::new();

        for index in 0..*sessions {
            let plan = FaultPlan { seed: faults.seed.wrapping_add(index as u64), ..*faults };
            let driver = SimDriver::with_faults(backing.clone(), plan);
            let mut runtime = Runtime::new(config.clone(), driver);

            runtime
                .start()
                .await
                .map_err(|e| format!("Scenario '{name}': session {index} start failed: {e}"))?;

            let mut resolutions = Vec::new();
            for step in steps {
                match step {
                    Step::Event(event) => {
                        runtime.dispatch(event.clone()).await.map_err(|e| {
                            format!("Scenario '{name}': session {index} {event:?} failed: {e}")
                        })?;
                    },
                    Step::Connect(spec) => {
                        let endpoint =
                            runtime.resolve_endpoint(&spec.host, spec.port, spec.protocol);
                        resolutions.push((spec.clone(), endpoint));
                    },
                }
            }

            let session = runtime.session();
            let deps = session.dependencies();
            world.record_session(SessionReport {
                journal: runtime.driver().journal().clone(),
                phase: session.phase(),
                bundle: session.bootstrap().state(),
                dependencies_added: deps.added(),
                dependencies_removed: deps.removed(),
                dependencies_pending: deps.pending(),
                resolutions,
            });
        }

        let snapshot: BackingStore =
            backing.lock().map_err(|_| format!("Scenario '{name}': poisoned"))?.clone();
        world.set_backing(snapshot);

        Ok(world)
    }
}
