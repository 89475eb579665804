//! Engine: runs check cycles over all endpoints and dispatches alerts

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::endpoint::EndpointSpec;
use crate::history::AlertHistory;
use crate::io::HttpTransport;
use crate::notifier::{Alert, Notifier};
use crate::probe::probe_for;
use crate::result::CheckResult;
use crate::retry::{check_with_retry, panic_message, RetryPolicy};

/// Pause after a cycle that crashed, before trying again
pub const FAILED_CYCLE_PAUSE: Duration = Duration::from_secs(60);

/// Counters for one pass over all endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub checked: usize,
    pub healthy: usize,
    pub failed: usize,
    pub alerts_sent: usize,
    pub alerts_suppressed: usize,
    pub alerts_failed: usize,
}

/// What happened to the alert for a failed endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent,
    Suppressed,
    Failed,
}

/// The engine checks every endpoint in order and alerts on failures
pub struct Engine {
    endpoints: Vec<EndpointSpec>,
    transport: Arc<dyn HttpTransport>,
    notifier: Arc<dyn Notifier>,
    history: AlertHistory,
    policy: RetryPolicy,
    timeout: Duration,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("endpoints", &self.endpoints.len())
            .field("notifier", &self.notifier.type_name())
            .field("history", &self.history)
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Engine {
    pub fn new(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn Notifier>,
        history: AlertHistory,
    ) -> Self {
        Self {
            endpoints: config.endpoints(),
            transport,
            notifier,
            history,
            policy: RetryPolicy::new(config.max_retries),
            timeout: config.timeout(),
        }
    }

    pub fn endpoints(&self) -> &[EndpointSpec] {
        &self.endpoints
    }

    pub fn history(&self) -> &AlertHistory {
        &self.history
    }

    /// Check every endpoint once. Never stops early on a failing endpoint.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        let websites = self
            .endpoints
            .iter()
            .filter(|e| matches!(e, EndpointSpec::Website { .. }))
            .count();
        tracing::info!(
            "Running checks for {} websites and {} APIs",
            websites,
            self.endpoints.len() - websites
        );

        let mut summary = CycleSummary::default();

        for endpoint in &self.endpoints {
            let probe = probe_for(endpoint, self.timeout);
            let result = check_with_retry(
                endpoint,
                probe.as_ref(),
                self.transport.as_ref(),
                &self.policy,
            )
            .await;
            summary.checked += 1;

            if result.healthy {
                summary.healthy += 1;
                let status = result.status_code.map(|s| s.to_string());
                tracing::info!(
                    "✓ {} - OK ({}, {}ms)",
                    endpoint,
                    status.unwrap_or_default(),
                    result.response_time_ms.unwrap_or_default()
                );
                continue;
            }

            summary.failed += 1;
            tracing::error!(
                "✗ {} - FAILED: {}",
                endpoint,
                result.error.as_deref().unwrap_or("Unknown error")
            );

            match handle_failure(&mut self.history, self.notifier.as_ref(), endpoint, result)
                .await
            {
                AlertOutcome::Sent => summary.alerts_sent += 1,
                AlertOutcome::Suppressed => summary.alerts_suppressed += 1,
                AlertOutcome::Failed => summary.alerts_failed += 1,
            }
        }

        tracing::info!(
            "Cycle complete: {} checked, {} healthy, {} failed, {} alerts sent, {} suppressed",
            summary.checked,
            summary.healthy,
            summary.failed,
            summary.alerts_sent,
            summary.alerts_suppressed
        );
        summary
    }

    /// Run one cycle, containing any crash inside it. Returns `None` if the cycle crashed.
    pub async fn run_once(&mut self) -> Option<CycleSummary> {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(summary) => Some(summary),
            Err(panic) => {
                tracing::error!(
                    "Critical error during monitoring: {}",
                    panic_message(&*panic)
                );
                None
            }
        }
    }

    /// Run cycles every `interval` until `cancel` fires
    pub async fn run_continuous(&mut self, interval: Duration, cancel: CancellationToken) {
        tracing::info!(
            "Starting continuous monitoring (interval: {}s)",
            interval.as_secs()
        );

        loop {
            let pause = match self.run_once().await {
                Some(_) => interval,
                None => FAILED_CYCLE_PAUSE,
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cancel.cancelled() => {
                    tracing::info!("Monitoring stopped by user");
                    break;
                }
            }
        }
    }
}

/// Alert for a failed endpoint unless it is still cooling down
pub async fn handle_failure(
    history: &mut AlertHistory,
    notifier: &dyn Notifier,
    endpoint: &EndpointSpec,
    result: CheckResult,
) -> AlertOutcome {
    let now = Utc::now();
    let id = endpoint.id();

    if !history.should_alert(id, now) {
        tracing::info!("Alert for {} suppressed due to cooldown", id);
        return AlertOutcome::Suppressed;
    }

    let alert = Alert::new(endpoint, result);
    match notifier.notify(&alert).await {
        Ok(()) => {
            history.record_alert(id, now);
            tracing::info!("Alert sent for {} via {}", id, notifier.type_name());
            AlertOutcome::Sent
        }
        Err(e) => {
            tracing::error!("Failed to send alert for {}: {}", id, e);
            AlertOutcome::Failed
        }
    }
}
