//! Session loop.

use sandbridge_app::{Runtime, RuntimeError};
use sandbridge_core::{BridgeConfig, BridgeEvent, EndpointSpec, SessionPhase, UiNotification};
use sandbridge_harness::{FaultPlan, Journal, SharedBacking, SimDriver, SimError};
use tracing::{Instrument, info, info_span, warn};

/// What one simulated session did.
#[derive(Debug, Clone)]
pub struct SimOutcome {
    /// Phase the session ended in.
    pub phase: SessionPhase,
    /// Recorded driver effects.
    pub journal: Journal,
    /// Resolved endpoints for each requested connection.
    pub resolutions: Vec<(EndpointSpec, Option<String>)>,
}

/// Run `sessions` sessions back to back over `backing`.
///
/// Each session reseeds its faults from `faults.seed + index`.
///
/// # Errors
///
/// Returns the first runtime error. Storage and download failures are not
/// errors; they show up in the journal.
pub async fn run_sessions(
    config: &BridgeConfig,
    backing: &SharedBacking,
    faults: FaultPlan,
    sessions: usize,
    hooks: &[BridgeEvent],
    connect: &[EndpointSpec],
) -> Result<Vec<SimOutcome>, RuntimeError<SimError>> {
    let mut outcomes = Vec::with_capacity(sessions);

    for index in 0..sessions {
        let plan = FaultPlan { seed: faults.seed.wrapping_add(index as u64), ..faults };
        let driver = SimDriver::with_faults(backing.clone(), plan);
        let outcome = run_session(config, driver, hooks, connect)
            .instrument(info_span!("session", index))
            .await?;
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

async fn run_session(
    config: &BridgeConfig,
    driver: SimDriver,
    hooks: &[BridgeEvent],
    connect: &[EndpointSpec],
) -> Result<SimOutcome, RuntimeError<SimError>> {
    let mut runtime = Runtime::new(config.clone(), driver);
    runtime.start().await?;

    for hook in hooks {
        runtime.dispatch(hook.clone()).await?;
    }

    let resolutions: Vec<_> = connect
        .iter()
        .map(|spec| (spec.clone(), runtime.resolve_endpoint(&spec.host, spec.port, spec.protocol)))
        .collect();
    for (spec, endpoint) in &resolutions {
        match endpoint {
            Some(endpoint) => info!(%spec, %endpoint, "connection redirected"),
            None => info!(%spec, "connection uses default resolution"),
        }
    }

    let phase = runtime.session().phase();
    let journal = runtime.into_driver().journal().clone();

    info!(
        ?phase,
        downloads = journal.downloads.len(),
        flushes = journal.flushes,
        failed_flushes = journal.failed_flushes,
        "session finished"
    );
    if journal.count(UiNotification::BootstrapFailed) > 0 {
        warn!("asset bundle unavailable; application not started");
    }

    Ok(SimOutcome { phase, journal, resolutions })
}

#[cfg(test)]
mod tests {
    use sandbridge_core::Protocol;
    use sandbridge_harness::create_shared_backing;

    use super::*;

    #[tokio::test]
    async fn second_session_reuses_bundle() {
        let backing = create_shared_backing();
        let connect = [EndpointSpec::new("content.openttd.org", 3978, Protocol::Tcp)];

        let outcomes = run_sessions(
            &BridgeConfig::default(),
            &backing,
            FaultPlan::default(),
            2,
            &[BridgeEvent::RequestExit],
            &connect,
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].journal.downloads.len(), 1);
        assert!(outcomes[1].journal.downloads.is_empty());
        for outcome in &outcomes {
            assert_eq!(outcome.phase, SessionPhase::Running);
            assert_eq!(outcome.journal.count(UiNotification::Exit), 1);
            assert_eq!(
                outcome.resolutions[0].1.as_deref(),
                Some("wss://bananas-server.openttd.org/")
            );
        }
    }

    #[tokio::test]
    async fn failed_download_leaves_session_bootstrapping() {
        let faults = FaultPlan { download_failure_rate: 1.0, ..FaultPlan::default() };

        let outcomes = run_sessions(
            &BridgeConfig::default(),
            &create_shared_backing(),
            faults,
            1,
            &[],
            &[],
        )
        .await
        .unwrap();

        assert_eq!(outcomes[0].phase, SessionPhase::Bootstrapping);
        assert_eq!(outcomes[0].journal.started_with, None);
        assert_eq!(outcomes[0].journal.count(UiNotification::BootstrapFailed), 1);
    }
}
