//! Notifier trait and alert message rendering

use async_trait::async_trait;

use crate::endpoint::{EndpointKind, EndpointSpec};
use crate::result::CheckResult;

/// A failed check that should be reported
#[derive(Debug, Clone)]
pub struct Alert {
    /// Deduplication key (the endpoint URL)
    pub endpoint_id: String,
    /// Human readable label used in logs
    pub display_name: String,
    pub kind: EndpointKind,
    pub result: CheckResult,
}

impl Alert {
    pub fn new(endpoint: &EndpointSpec, result: CheckResult) -> Self {
        Self {
            endpoint_id: endpoint.id().to_string(),
            display_name: endpoint.to_string(),
            kind: endpoint.kind(),
            result,
        }
    }
}

/// Rendered alert ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

/// Trait for delivering alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the notifier type name (e.g. "email")
    fn type_name(&self) -> &str;

    /// Deliver one alert
    async fn notify(&self, alert: &Alert) -> crate::Result<()>;
}

/// Render the subject and plain-text body of an alert
pub fn compose_alert(alert: &Alert) -> AlertMessage {
    let result = &alert.result;
    let time = result.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
    let error = result.error.as_deref().unwrap_or("Unknown error");
    let status = result
        .status_code
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let response_time = result
        .response_time_ms
        .map(|ms| ms.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    match alert.kind {
        EndpointKind::Website => {
            let ssl_valid = result
                .ssl_valid()
                .map(|v| if v { "True" } else { "False" })
                .unwrap_or("Unknown");
            AlertMessage {
                subject: format!("[ALERT] Website Issue: {}", alert.endpoint_id),
                body: format!(
                    "Website Monitoring Alert\n\
                     ------------------------\n\
                     Time: {time}\n\
                     Website: {url}\n\
                     Status: DOWN\n\
                     \n\
                     Error Details:\n\
                     - Error: {error}\n\
                     - HTTP Status: {status}\n\
                     - Response Time: {response_time} ms\n\
                     - SSL Valid: {ssl_valid}\n\
                     \n\
                     Recommended Actions:\n\
                     1. Check if the website is accessible from your browser\n\
                     2. Verify server status and logs\n\
                     3. Check the application process manager if applicable\n\
                     4. Review recent deployments or changes\n\
                     \n\
                     This is an automated alert from your website monitoring system.\n",
                    url = alert.endpoint_id,
                ),
            }
        }
        EndpointKind::Api => {
            let empty = serde_json::Value::Object(Default::default());
            let data =
                serde_json::to_string_pretty(result.response_body_summary().unwrap_or(&empty))
                    .unwrap_or_else(|_| "{}".to_string());
            AlertMessage {
                subject: format!("[ALERT] API Issue: {}", alert.endpoint_id),
                body: format!(
                    "API Monitoring Alert\n\
                     --------------------\n\
                     Time: {time}\n\
                     API Endpoint: {url}\n\
                     Status: DOWN\n\
                     \n\
                     Error Details:\n\
                     - Error: {error}\n\
                     - HTTP Status: {status}\n\
                     - Response Time: {response_time} ms\n\
                     - Response Data: {data}\n\
                     \n\
                     Recommended Actions:\n\
                     1. Check if the API service is running\n\
                     2. Check the API service logs\n\
                     3. Verify dependent services such as caches and databases\n\
                     4. Review recent API deployments or changes\n\
                     \n\
                     This is an automated alert from your API monitoring system.\n",
                    url = alert.endpoint_id,
                ),
            }
        }
    }
}
