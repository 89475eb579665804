//! Check outcomes

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::endpoint::EndpointKind;
use crate::io::TransportError;

/// Why the body of an API response did not match expectations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContentMismatch {
    #[error("response is not valid JSON ({0})")]
    InvalidJson(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("field '{key}' is missing")]
    MissingField { key: String },

    #[error("field '{key}' expected {expected}, got {actual}")]
    FieldMismatch {
        key: String,
        expected: Value,
        actual: Value,
    },
}

/// Why a single probe attempt was classified unhealthy
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProbeFailure {
    #[error("SSL Error: {0}")]
    Tls(String),

    #[error("Timeout after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Status: {actual} (expected {expected})")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("Status: {status}, Content: {mismatch}, Response: {body}")]
    Content {
        status: u16,
        mismatch: ContentMismatch,
        body: Value,
    },
}

impl ProbeFailure {
    pub fn is_tls(&self) -> bool {
        matches!(self, ProbeFailure::Tls(_))
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, ProbeFailure::Unexpected(_))
    }
}

impl From<TransportError> for ProbeFailure {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Tls(msg) => ProbeFailure::Tls(msg),
            TransportError::Timeout(after) => ProbeFailure::Timeout(after),
            TransportError::Request(msg) => ProbeFailure::Request(msg),
            TransportError::Unexpected(msg) => ProbeFailure::Unexpected(msg),
        }
    }
}

/// What was observed during one attempt, whether or not it was healthy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub status_code: Option<u16>,
    pub response_time_ms: Option<f64>,
    pub response_body: Option<Value>,
}

/// Verdict of a single probe attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Healthy(Observation),
    Unhealthy {
        failure: ProbeFailure,
        observation: Observation,
    },
}

impl ProbeOutcome {
    /// An attempt that never got a response
    pub fn unreachable(failure: ProbeFailure) -> Self {
        ProbeOutcome::Unhealthy {
            failure,
            observation: Observation::default(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy(_))
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            ProbeOutcome::Healthy(_) => None,
            ProbeOutcome::Unhealthy { failure, .. } => Some(failure),
        }
    }
}

/// Protocol-specific part of a check result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckDetails {
    Website { ssl_valid: bool },
    Api { response_body: Option<Value> },
}

/// Outcome of a full retry sequence for one endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub healthy: bool,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<f64>,
    /// Error of the last attempt; `None` exactly when healthy
    pub error: Option<String>,
    pub details: CheckDetails,
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    pub fn from_outcome(
        kind: EndpointKind,
        outcome: ProbeOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (observation, failure) = match outcome {
            ProbeOutcome::Healthy(observation) => (observation, None),
            ProbeOutcome::Unhealthy {
                failure,
                observation,
            } => (observation, Some(failure)),
        };

        let details = match kind {
            EndpointKind::Website => CheckDetails::Website {
                ssl_valid: !failure.as_ref().is_some_and(ProbeFailure::is_tls),
            },
            EndpointKind::Api => CheckDetails::Api {
                response_body: observation.response_body,
            },
        };

        Self {
            healthy: failure.is_none(),
            status_code: observation.status_code,
            response_time_ms: observation.response_time_ms,
            error: failure.map(|f| f.to_string()),
            details,
            timestamp,
        }
    }

    /// Certificate validity, for website checks only
    pub fn ssl_valid(&self) -> Option<bool> {
        match &self.details {
            CheckDetails::Website { ssl_valid } => Some(*ssl_valid),
            CheckDetails::Api { .. } => None,
        }
    }

    /// Parsed response body, for API checks only
    pub fn response_body_summary(&self) -> Option<&Value> {
        match &self.details {
            CheckDetails::Website { .. } => None,
            CheckDetails::Api { response_body } => response_body.as_ref(),
        }
    }
}

/// Milliseconds rounded to two decimal places
pub fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}
