//! Probe strategies: one HTTP attempt and its health verdict

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::endpoint::{ApiEndpoint, EndpointSpec};
use crate::io::{HttpResponse, HttpTransport, ProbeRequest};
use crate::result::{round_millis, ContentMismatch, Observation, ProbeFailure, ProbeOutcome};

/// A single-attempt health check for one kind of endpoint
#[async_trait]
pub trait Probe: Send + Sync {
    /// The request this probe sends
    fn request(&self) -> ProbeRequest;

    /// Judge a response. Deterministic for a given response.
    fn classify(&self, response: &HttpResponse) -> ProbeOutcome;

    /// Send one request and classify the result; transport failures are reported, not retried
    async fn probe(&self, transport: &dyn HttpTransport) -> ProbeOutcome {
        match transport.get(&self.request()).await {
            Ok(response) => self.classify(&response),
            Err(e) => ProbeOutcome::unreachable(e.into()),
        }
    }
}

/// Plain website: any 2xx or 3xx after following redirects is healthy
#[derive(Debug, Clone)]
pub struct WebsiteProbe {
    url: String,
    timeout: Duration,
}

impl WebsiteProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Probe for WebsiteProbe {
    fn request(&self) -> ProbeRequest {
        ProbeRequest {
            url: self.url.clone(),
            timeout: self.timeout,
            verify_tls: true,
            follow_redirects: true,
            accept_json: false,
        }
    }

    fn classify(&self, response: &HttpResponse) -> ProbeOutcome {
        classify_website(response)
    }
}

/// JSON API: exact status plus optional shallow body expectations, redirects not followed
#[derive(Debug, Clone)]
pub struct ApiProbe {
    api: ApiEndpoint,
    timeout: Duration,
}

impl ApiProbe {
    pub fn new(api: ApiEndpoint, timeout: Duration) -> Self {
        Self { api, timeout }
    }
}

#[async_trait]
impl Probe for ApiProbe {
    fn request(&self) -> ProbeRequest {
        ProbeRequest {
            url: self.api.url.clone(),
            timeout: self.timeout,
            verify_tls: self.api.verify_tls,
            follow_redirects: false,
            accept_json: true,
        }
    }

    fn classify(&self, response: &HttpResponse) -> ProbeOutcome {
        classify_api(&self.api, response)
    }
}

/// Pick the probe implementation for an endpoint
pub fn probe_for(endpoint: &EndpointSpec, timeout: Duration) -> Box<dyn Probe> {
    match endpoint {
        EndpointSpec::Website { url } => Box::new(WebsiteProbe::new(url.clone(), timeout)),
        EndpointSpec::Api(api) => Box::new(ApiProbe::new(api.clone(), timeout)),
    }
}

pub fn classify_website(response: &HttpResponse) -> ProbeOutcome {
    let observation = Observation {
        status_code: Some(response.status),
        response_time_ms: Some(round_millis(response.elapsed)),
        response_body: None,
    };

    if (200..400).contains(&response.status) {
        ProbeOutcome::Healthy(observation)
    } else {
        ProbeOutcome::Unhealthy {
            failure: ProbeFailure::Status(response.status),
            observation,
        }
    }
}

pub fn classify_api(api: &ApiEndpoint, response: &HttpResponse) -> ProbeOutcome {
    let (response_body, mismatch) = if api.expected_fields.is_empty() {
        (None, None)
    } else {
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(body) => {
                let mismatch = check_fields(&api.expected_fields, &body).err();
                (Some(body), mismatch)
            }
            Err(e) => (
                Some(json!({"error": "Invalid JSON response"})),
                Some(ContentMismatch::InvalidJson(e.to_string())),
            ),
        }
    };

    let failure = if response.status != api.expected_status {
        Some(ProbeFailure::StatusMismatch {
            expected: api.expected_status,
            actual: response.status,
        })
    } else {
        mismatch.map(|mismatch| ProbeFailure::Content {
            status: response.status,
            mismatch,
            body: response_body.clone().unwrap_or(Value::Null),
        })
    };

    let observation = Observation {
        status_code: Some(response.status),
        response_time_ms: Some(round_millis(response.elapsed)),
        response_body,
    };

    match failure {
        None => ProbeOutcome::Healthy(observation),
        Some(failure) => ProbeOutcome::Unhealthy {
            failure,
            observation,
        },
    }
}

/// Every expected key must be present at the top level with an equal value
pub fn check_fields(
    expected: &BTreeMap<String, Value>,
    body: &Value,
) -> Result<(), ContentMismatch> {
    let object = body.as_object().ok_or(ContentMismatch::NotAnObject)?;

    for (key, expected_value) in expected {
        let Some(actual) = object.get(key) else {
            return Err(ContentMismatch::MissingField { key: key.clone() });
        };
        if !values_equal(expected_value, actual) {
            return Err(ContentMismatch::FieldMismatch {
                key: key.clone(),
                expected: expected_value.clone(),
                actual: actual.clone(),
            });
        }
    }

    Ok(())
}

fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        _ => expected == actual,
    }
}
