//! Deterministic simulation harness for the sandbox runtime bridge.
//!
//! In-memory implementations of the sandbox filesystem, the persistent
//! backing store and the bridge driver, with seeded fault injection, for
//! reproducible tests across several simulated browser sessions.

pub mod scenario;
pub mod sim_driver;
pub mod sim_sandbox;

pub use sim_driver::{FaultPlan, Journal, SimDriver, SimError};
pub use sim_sandbox::{BackingStore, SharedBacking, SimSandbox, create_shared_backing};
