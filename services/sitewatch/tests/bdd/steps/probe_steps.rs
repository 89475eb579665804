//! BDD step definitions for single-endpoint checks

use cucumber::{given, then, when};

use sitewatch::endpoint::ApiEndpoint;
use sitewatch::io::TransportError;
use sitewatch::probe::probe_for;
use sitewatch::retry::{check_with_retry, RetryPolicy};

use crate::world::{reply, SitewatchWorld};

#[given(expr = "a website {string}")]
fn website(world: &mut SitewatchWorld, url: String) {
    world.config.websites.push(url);
}

#[given(expr = "an API {string} at {string} expecting status {int}")]
fn api_expecting_status(world: &mut SitewatchWorld, name: String, url: String, status: u16) {
    world
        .config
        .api_endpoints
        .push(ApiEndpoint::new(name, url).with_expected_status(status));
}

#[given(expr = "an API {string} at {string} expecting field {string} to be {string}")]
fn api_expecting_field(
    world: &mut SitewatchWorld,
    name: String,
    url: String,
    key: String,
    value: String,
) {
    world
        .config
        .api_endpoints
        .push(ApiEndpoint::new(name, url).with_expected_field(key, value));
}

#[given(expr = "{string} responds with status {int}")]
fn responds_with_status(world: &mut SitewatchWorld, url: String, status: u16) {
    world.transport.push(&url, reply(status, ""));
}

#[given(expr = "{string} responds with status {int} and body {string}")]
fn responds_with_body(world: &mut SitewatchWorld, url: String, status: u16, body: String) {
    world.transport.push(&url, reply(status, &body));
}

#[given(expr = "{string} fails with a TLS error {string}")]
fn fails_with_tls(world: &mut SitewatchWorld, url: String, detail: String) {
    world.transport.push(&url, Err(TransportError::Tls(detail)));
}

#[given(expr = "{string} times out")]
fn times_out(world: &mut SitewatchWorld, url: String) {
    let reply = Err(TransportError::Timeout(world.config.timeout()));
    world.transport.push(&url, reply);
}

#[given(expr = "the monitor allows {int} attempt(s) per check")]
fn attempts_per_check(world: &mut SitewatchWorld, attempts: u32) {
    world.config.max_retries = attempts;
}

#[when(expr = "{string} is checked")]
async fn endpoint_is_checked(world: &mut SitewatchWorld, url: String) {
    let endpoint = world
        .config
        .endpoints()
        .into_iter()
        .find(|e| e.url() == url)
        .unwrap_or_else(|| panic!("no endpoint configured for {}", url));

    let probe = probe_for(&endpoint, world.config.timeout());
    let policy = RetryPolicy::new(world.config.max_retries);
    let result =
        check_with_retry(&endpoint, probe.as_ref(), world.transport.as_ref(), &policy).await;
    world.check_result = Some(result);
}

#[then("the result should be healthy")]
fn result_healthy(world: &mut SitewatchWorld) {
    let result = world.check_result.as_ref().expect("no check result");
    assert!(result.healthy, "expected healthy, got {:?}", result);
    assert!(result.error.is_none());
}

#[then("the result should be unhealthy")]
fn result_unhealthy(world: &mut SitewatchWorld) {
    let result = world.check_result.as_ref().expect("no check result");
    assert!(!result.healthy, "expected unhealthy, got {:?}", result);
}

#[then(expr = "the result status code should be {int}")]
fn result_status(world: &mut SitewatchWorld, status: u16) {
    let result = world.check_result.as_ref().expect("no check result");
    assert_eq!(result.status_code, Some(status));
}

#[then("the result should have no status code")]
fn result_no_status(world: &mut SitewatchWorld) {
    let result = world.check_result.as_ref().expect("no check result");
    assert_eq!(result.status_code, None);
    assert_eq!(result.response_time_ms, None);
}

#[then(expr = "the result error should be {string}")]
fn result_error(world: &mut SitewatchWorld, expected: String) {
    let result = world.check_result.as_ref().expect("no check result");
    assert_eq!(result.error.as_deref(), Some(expected.as_str()));
}

#[then(expr = "the result error should contain {string}")]
fn result_error_contains(world: &mut SitewatchWorld, fragment: String) {
    let result = world.check_result.as_ref().expect("no check result");
    let error = result.error.as_deref().unwrap_or_default();
    assert!(
        error.contains(&fragment),
        "error {:?} does not contain {:?}",
        error,
        fragment
    );
}

#[then(expr = "SSL should be reported as {word}")]
fn ssl_reported(world: &mut SitewatchWorld, verdict: String) {
    let result = world.check_result.as_ref().expect("no check result");
    let expected = match verdict.as_str() {
        "valid" => true,
        "invalid" => false,
        other => panic!("Unknown SSL verdict: {}", other),
    };
    assert_eq!(result.ssl_valid(), Some(expected));
}

#[then(expr = "the response time should be recorded")]
fn response_time_recorded(world: &mut SitewatchWorld) {
    let result = world.check_result.as_ref().expect("no check result");
    assert_eq!(result.response_time_ms, Some(25.0));
}
