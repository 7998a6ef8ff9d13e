//! Periodic sweep of stale limiter windows and expired CSRF tokens.
//!
//! The limiter and CSRF store only clean up when asked; this task asks on a
//! fixed interval so long-running processes stay bounded.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::security::state::SecurityState;

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub rate_windows: usize,
    pub csrf_tokens: usize,
}

/// Run one sweep over every tier and the CSRF store.
pub fn run_cleanup(security: &SecurityState) -> CleanupReport {
    let report = CleanupReport {
        rate_windows: security.policy().cleanup(),
        csrf_tokens: security.csrf.cleanup(),
    };

    metrics::record_cleanup("rate_window", report.rate_windows);
    metrics::record_cleanup("csrf_token", report.csrf_tokens);
    if report.rate_windows > 0 || report.csrf_tokens > 0 {
        tracing::debug!(
            rate_windows = report.rate_windows,
            csrf_tokens = report.csrf_tokens,
            "Cleanup sweep removed stale entries"
        );
    }
    report
}

/// Sweep every `every` until shutdown.
pub fn spawn_cleanup_task(
    security: SecurityState,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = every.as_secs(), "Cleanup sweep started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_cleanup(&security);
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Cleanup sweep stopping");
                    break;
                }
            }
        }
    })
}
