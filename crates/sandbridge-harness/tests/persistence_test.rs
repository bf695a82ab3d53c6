//! Multi-session persistence tests.
//!
//! Each session starts from an empty volatile filesystem; only what a flush
//! copied into the shared backing store survives into the next one.

use sandbridge_core::{BundleState, UiNotification};
use sandbridge_harness::{
    FaultPlan,
    scenario::{Scenario, oracle},
};

#[test]
fn bundle_fetched_in_first_session_is_reused() {
    let result = Scenario::new("second visit")
        .sessions(3)
        .oracle(oracle::all_of(vec![
            oracle::downloads(1),
            oracle::dependencies_balanced(),
            oracle::warned_at_most_once(),
            oracle::all_running(),
            Box::new(|world| {
                let sessions = world.sessions();
                assert_eq!(sessions[0].journal.downloads.len(), 1);
                assert_eq!(sessions[0].journal.flushes, 1);
                for later in &sessions[1..] {
                    assert!(later.journal.downloads.is_empty());
                    assert_eq!(later.journal.flushes, 0);
                    assert_eq!(later.bundle, BundleState::Present);
                }
                Ok(())
            }),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}

#[test]
fn failed_flush_means_refetch_next_session() {
    let faults = FaultPlan { flush_failure_rate: 1.0, ..FaultPlan::default() };

    let result = Scenario::new("flush always fails")
        .sessions(2)
        .faults(faults)
        .oracle(oracle::all_of(vec![
            oracle::downloads(2),
            oracle::warned_once_if_flushed(),
            Box::new(|world| {
                assert_eq!(world.backing().file_count(), 0);
                for session in world.sessions() {
                    assert_eq!(session.journal.failed_flushes, 1);
                    assert_eq!(session.journal.count(UiNotification::WarningFs), 1);
                }
                Ok(())
            }),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}

#[test]
fn failed_load_starts_from_empty_state() {
    let faults = FaultPlan { load_failure_rate: 1.0, ..FaultPlan::default() };

    let result = Scenario::new("load denied")
        .bundle_preinstalled()
        .faults(faults)
        .oracle(oracle::all_of(vec![
            oracle::downloads(1),
            oracle::all_running(),
            oracle::dependencies_balanced(),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}

#[test]
fn failed_download_blocks_start_and_notifies() {
    let faults = FaultPlan { download_failure_rate: 1.0, ..FaultPlan::default() };

    let result = Scenario::new("download fails")
        .faults(faults)
        .oracle(oracle::all_of(vec![
            oracle::dependencies_balanced(),
            Box::new(|world| {
                let session = world.session(0).ok_or("missing session")?;
                assert_eq!(session.bundle, BundleState::Failed);
                assert_eq!(session.journal.started_with, None);
                assert_eq!(session.journal.notifications, vec![UiNotification::BootstrapFailed]);
                assert_eq!(session.journal.flushes, 0);
                Ok(())
            }),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}
