//! BDD step definitions for check cycles and alert throttling

use chrono::{TimeDelta, Utc};
use cucumber::{given, then, when};

use sitewatch::history::AlertHistory;
use sitewatch::notifier::compose_alert;

use crate::world::SitewatchWorld;

#[given("the alert notifier is working")]
fn notifier_working(world: &mut SitewatchWorld) {
    world.notifier();
}

#[given("the alert notifier is failing")]
fn notifier_failing(world: &mut SitewatchWorld) {
    world.notifier = Some(std::sync::Arc::new(crate::world::RecordingNotifier {
        failing: true,
        ..Default::default()
    }));
}

#[given(expr = "an alert cooldown of {int} minutes")]
fn alert_cooldown(world: &mut SitewatchWorld, minutes: u64) {
    world.config.alert_cooldown_seconds = minutes * 60;
}

#[given(expr = "an alert for {string} was sent {int} minutes ago")]
fn alert_sent_ago(world: &mut SitewatchWorld, url: String, minutes: i64) {
    let at = Utc::now() - TimeDelta::minutes(minutes);
    world.history_mut().record_alert(&url, at);
    world.recorded_alerts.insert(url, at);
}

#[when("a check cycle runs")]
async fn check_cycle_runs(world: &mut SitewatchWorld) {
    let summary = world.engine().run_cycle().await;
    world.summary = Some(summary);
}

#[when("the monitor restarts")]
fn monitor_restarts(world: &mut SitewatchWorld) {
    world.engine = None;
    let path = world.history_path();
    world.history = Some(AlertHistory::load(path, world.config.alert_cooldown()));
}

#[then(expr = "{int} alert(s) should have been sent")]
fn alerts_sent(world: &mut SitewatchWorld, count: usize) {
    let summary = world.summary.as_ref().expect("no cycle has run");
    assert_eq!(summary.alerts_sent, count);
}

#[then(expr = "{int} alert delivery attempt(s) should have been made in total")]
fn delivery_attempts(world: &mut SitewatchWorld, count: usize) {
    assert_eq!(world.notifier().attempt_count(), count);
}

#[then(expr = "{int} alert(s) should have been suppressed")]
fn alerts_suppressed(world: &mut SitewatchWorld, count: usize) {
    let summary = world.summary.as_ref().expect("no cycle has run");
    assert_eq!(summary.alerts_suppressed, count);
}

#[then(expr = "{int} alert delivery/deliveries should have failed")]
fn alerts_failed(world: &mut SitewatchWorld, count: usize) {
    let summary = world.summary.as_ref().expect("no cycle has run");
    assert_eq!(summary.alerts_failed, count);
}

#[then(expr = "the cycle should report {int} healthy and {int} failed")]
fn cycle_counts(world: &mut SitewatchWorld, healthy: usize, failed: usize) {
    let summary = world.summary.as_ref().expect("no cycle has run");
    assert_eq!(summary.healthy, healthy);
    assert_eq!(summary.failed, failed);
    assert_eq!(summary.checked, healthy + failed);
}

#[then(expr = "the alert subject should be {string}")]
fn alert_subject(world: &mut SitewatchWorld, subject: String) {
    let alert = world
        .notifier()
        .last_alert()
        .expect("no alert was attempted");
    assert_eq!(compose_alert(&alert).subject, subject);
}

#[then(expr = "the alert body should contain {string}")]
fn alert_body_contains(world: &mut SitewatchWorld, fragment: String) {
    let alert = world
        .notifier()
        .last_alert()
        .expect("no alert was attempted");
    let body = compose_alert(&alert).body;
    assert!(
        body.contains(&fragment),
        "alert body does not contain {:?}:\n{}",
        fragment,
        body
    );
}

#[then(expr = "the alert history should have an entry for {string}")]
fn history_has_entry(world: &mut SitewatchWorld, url: String) {
    let history = world.current_history().expect("no alert history");
    assert!(history.last_alert(&url).is_some());
}

#[then(expr = "the alert history should have no entry for {string}")]
fn history_has_no_entry(world: &mut SitewatchWorld, url: String) {
    let history = world.current_history().expect("no alert history");
    assert!(history.last_alert(&url).is_none());
}

#[then(expr = "the stored alert time for {string} should be unchanged")]
fn stored_time_unchanged(world: &mut SitewatchWorld, url: String) {
    let recorded = *world
        .recorded_alerts
        .get(&url)
        .expect("no alert was recorded in setup");
    let history = world.current_history().expect("no alert history");
    assert_eq!(history.last_alert(&url), Some(recorded));
}

#[then(expr = "the stored alert time for {string} should be newer")]
fn stored_time_newer(world: &mut SitewatchWorld, url: String) {
    let recorded = *world
        .recorded_alerts
        .get(&url)
        .expect("no alert was recorded in setup");
    let history = world.current_history().expect("no alert history");
    let stored = history.last_alert(&url).expect("no stored alert time");
    assert!(stored > recorded);
}

#[then(expr = "the history file should mention {string}")]
fn history_file_mentions(world: &mut SitewatchWorld, url: String) {
    let path = world.history_path();
    let content = std::fs::read_to_string(&path).expect("history file missing");
    let parsed: serde_json::Value =
        serde_json::from_str(&content).expect("history file is not JSON");
    assert!(parsed.get(&url).and_then(|v| v.as_str()).is_some());
}
