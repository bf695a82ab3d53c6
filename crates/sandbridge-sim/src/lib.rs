//! Simulated browser sessions for the sandbox runtime bridge
//!
//! Builds a [`sandbridge_core::BridgeConfig`] from command-line flags and runs
//! one or more sessions over a shared backing store, logging what the bridge
//! did in each.

pub mod args;
pub mod session;

pub use args::{Args, ConnectTarget, ParseTargetError};
pub use session::{SimOutcome, run_sessions};
