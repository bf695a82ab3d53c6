//! Application layer for the sandbox runtime bridge
//!
//! A generic runtime that executes [`sandbridge_core::BridgeAction`]s against
//! a platform [`Driver`], so the browser build and the deterministic
//! simulation run the same orchestration code.
//!
//! # Components
//!
//! - [`Driver`]: Trait for platform-specific effects
//! - [`Runtime`]: Single-task orchestration loop using a Driver

mod driver;
mod runtime;

pub use driver::Driver;
pub use runtime::{Runtime, RuntimeError};
