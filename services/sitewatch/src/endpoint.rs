//! Endpoint descriptors

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protocol family of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Website,
    Api,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Website => write!(f, "Website"),
            EndpointKind::Api => write!(f, "API"),
        }
    }
}

/// A JSON API endpoint together with what a healthy response looks like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub name: String,
    pub url: String,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    /// Top-level keys of the JSON body and the scalar each must equal
    #[serde(default)]
    pub expected_fields: BTreeMap<String, Value>,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

impl ApiEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            expected_status: default_expected_status(),
            expected_fields: BTreeMap::new(),
            verify_tls: true,
        }
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_expected_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.expected_fields.insert(key.into(), value.into());
        self
    }
}

/// Something to probe
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointSpec {
    Website { url: String },
    Api(ApiEndpoint),
}

impl EndpointSpec {
    pub fn website(url: impl Into<String>) -> Self {
        EndpointSpec::Website { url: url.into() }
    }

    /// Key under which alerts for this endpoint are deduplicated
    pub fn id(&self) -> &str {
        self.url()
    }

    pub fn url(&self) -> &str {
        match self {
            EndpointSpec::Website { url } => url,
            EndpointSpec::Api(api) => &api.url,
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            EndpointSpec::Website { .. } => EndpointKind::Website,
            EndpointSpec::Api(_) => EndpointKind::Api,
        }
    }
}

impl fmt::Display for EndpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointSpec::Website { url } => write!(f, "Website: {}", url),
            EndpointSpec::Api(api) => write!(f, "API: {} ({})", api.name, api.url),
        }
    }
}

/// Whether a URL starts with an `http://` or `https://` scheme
pub fn has_http_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn default_expected_status() -> u16 {
    200
}

fn default_true() -> bool {
    true
}
