//! Scenario testing framework.
//!
//! Scenarios describe one or more browser sessions over a shared backing
//! store, the hooks invoked in each, and an oracle that verifies the final
//! [`World`]. A scenario cannot run without an oracle.

mod builder;
pub mod oracle;
mod world;

pub use builder::{RunnableScenario, Scenario, Step};
pub use world::{SessionReport, World};

/// Verification function run against the final world.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;
