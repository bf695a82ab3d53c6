//! Reusable oracle functions.

use sandbridge_core::UiNotification;

use crate::scenario::{OracleFn, World};

/// Every session reached the running phase.
pub fn all_running() -> OracleFn {
    Box::new(|world: &World| {
        if world.all_running() {
            Ok(())
        } else {
            Err("not every session reached the running phase".to_string())
        }
    })
}

/// No session delivered the storage warning more than once.
pub fn warned_at_most_once() -> OracleFn {
    Box::new(|world: &World| {
        if world.warned_at_most_once() {
            Ok(())
        } else {
            Err("storage warning delivered more than once in a session".to_string())
        }
    })
}

/// Every session that flushed delivered the storage warning exactly once.
pub fn warned_once_if_flushed() -> OracleFn {
    Box::new(|world: &World| {
        for (index, session) in world.sessions().iter().enumerate() {
            let warnings = session.journal.count(UiNotification::WarningFs);
            let expected = usize::from(session.journal.flushes > 0);
            if warnings != expected {
                return Err(format!(
                    "session {index}: {warnings} warnings for {} flushes",
                    session.journal.flushes
                ));
            }
        }
        Ok(())
    })
}

/// No session that reported a failed bootstrap started the application.
pub fn not_started_after_failed_bootstrap() -> OracleFn {
    Box::new(|world: &World| {
        for (index, session) in world.sessions().iter().enumerate() {
            let failed = session.journal.count(UiNotification::BootstrapFailed) > 0;
            if failed && session.journal.started_with.is_some() {
                return Err(format!(
                    "session {index}: application started after failed bootstrap"
                ));
            }
        }
        Ok(())
    })
}

/// Every run-dependency registration was released.
pub fn dependencies_balanced() -> OracleFn {
    Box::new(|world: &World| {
        if world.dependencies_balanced() {
            Ok(())
        } else {
            Err("run dependencies left unbalanced".to_string())
        }
    })
}

/// The asset bundle was fetched exactly `expected` times across sessions.
pub fn downloads(expected: usize) -> OracleFn {
    Box::new(move |world: &World| {
        let actual = world.total_downloads();
        if actual == expected {
            Ok(())
        } else {
            Err(format!("expected {expected} downloads, saw {actual}"))
        }
    })
}

/// Combine oracles; the first failure wins.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world: &World| {
        for oracle in &oracles {
            oracle(world)?;
        }
        Ok(())
    })
}
