//! Bounded retries with exponential backoff around a probe

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;

use crate::endpoint::EndpointSpec;
use crate::io::HttpTransport;
use crate::probe::Probe;
use crate::result::{CheckResult, ProbeFailure, ProbeOutcome};

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

/// How many attempts a check gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// `max_retries` is the total number of attempts; values below 1 are raised to 1
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide after attempt number `attempt` (starting at 1) has failed
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_retries {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(backoff_delay(attempt))
        }
    }
}

/// `2^attempt` seconds, without jitter or cap
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

/// Probe until healthy or out of attempts; only the last attempt's failure is kept
pub async fn check_with_retry(
    endpoint: &EndpointSpec,
    probe: &dyn Probe,
    transport: &dyn HttpTransport,
    policy: &RetryPolicy,
) -> CheckResult {
    let mut attempt = 1;

    loop {
        let guarded = AssertUnwindSafe(probe.probe(transport));
        let outcome = match guarded.catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                ProbeOutcome::unreachable(ProbeFailure::Unexpected(panic_message(&*panic)))
            }
        };

        let decision = match outcome.failure() {
            None => None,
            Some(failure) => {
                if failure.is_unexpected() {
                    tracing::error!(
                        "Attempt {}/{} for {}: {}",
                        attempt,
                        policy.max_retries(),
                        endpoint.id(),
                        failure
                    );
                } else {
                    tracing::warn!(
                        "Attempt {}/{} for {}: {}",
                        attempt,
                        policy.max_retries(),
                        endpoint.id(),
                        failure
                    );
                }
                Some(policy.decide(attempt))
            }
        };

        match decision {
            Some(RetryDecision::Retry(delay)) => {
                tracing::debug!("Retrying {} in {}s", endpoint.id(), delay.as_secs());
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            None | Some(RetryDecision::GiveUp) => {
                return CheckResult::from_outcome(endpoint.kind(), outcome, Utc::now());
            }
        }
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
