//! HTTP transport abstraction for testability

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// User agent sent with every probe
pub const USER_AGENT: &str = concat!("sitewatch/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 10;

/// One probe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: String,
    pub timeout: Duration,
    pub verify_tls: bool,
    pub follow_redirects: bool,
    /// Ask for a JSON response with an `Accept` header and read the body;
    /// otherwise only the status is read
    pub accept_json: bool,
}

/// HTTP response to a probe
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Time from dispatch until the response headers arrived
    pub elapsed: Duration,
}

/// Why a probe request produced no response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("TLS failure: {0}")]
    Tls(String),

    #[error("timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// Abstraction over the HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpTransport: Send + Sync {
    /// Send a GET request described by `request`
    async fn get(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport using reqwest
///
/// Redirect and certificate policy are fixed per `reqwest::Client`, so one
/// client is kept for each combination.
pub struct ReqwestTransport {
    clients: [reqwest::Client; 4],
}

impl ReqwestTransport {
    pub fn new() -> crate::Result<Self> {
        Ok(Self {
            clients: [
                build_client(false, false)?,
                build_client(false, true)?,
                build_client(true, false)?,
                build_client(true, true)?,
            ],
        })
    }

    fn client(&self, follow_redirects: bool, verify_tls: bool) -> &reqwest::Client {
        &self.clients[usize::from(follow_redirects) * 2 + usize::from(verify_tls)]
    }
}

fn build_client(follow_redirects: bool, verify_tls: bool) -> crate::Result<reqwest::Client> {
    let policy = if follow_redirects {
        reqwest::redirect::Policy::limited(MAX_REDIRECTS)
    } else {
        reqwest::redirect::Policy::none()
    };

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(policy)
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(|e| crate::SitewatchError::Http(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!("GET {}", request.url);

        let mut builder = self
            .client(request.follow_redirects, request.verify_tls)
            .get(&request.url)
            .timeout(request.timeout);
        if request.accept_json {
            builder = builder.header(reqwest::header::ACCEPT, "application/json");
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&e, request.timeout))?;
        let elapsed = started.elapsed();

        let status = response.status().as_u16();
        let body = if request.accept_json {
            response
                .bytes()
                .await
                .map_err(|e| classify_error(&e, request.timeout))?
                .to_vec()
        } else {
            Vec::new()
        };

        tracing::debug!(
            "GET {} -> {} ({} bytes, {:?})",
            request.url,
            status,
            body.len(),
            elapsed
        );
        Ok(HttpResponse {
            status,
            body,
            elapsed,
        })
    }
}

fn classify_error(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout(timeout);
    }

    // The top-level message embeds the URL, so only the causes are inspected for TLS markers.
    let causes = source_chain(error);
    let detail = if causes.is_empty() {
        error.to_string()
    } else {
        format!("{}: {}", error, causes)
    };

    if is_tls_failure(&causes) {
        return TransportError::Tls(detail);
    }

    if error.is_connect()
        || error.is_request()
        || error.is_body()
        || error.is_redirect()
        || error.is_decode()
        || error.is_status()
    {
        return TransportError::Request(detail);
    }

    TransportError::Unexpected(detail)
}

fn source_chain(error: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

/// Whether an error description points at a certificate or TLS handshake problem
pub fn is_tls_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    ["certificate", "tls", "ssl"]
        .iter()
        .any(|marker| lower.contains(marker))
}
