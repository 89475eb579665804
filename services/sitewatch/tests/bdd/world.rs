//! BDD test world for sitewatch

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cucumber::World;
use tokio::time::Instant;

use sitewatch::config::{Config, ALERT_HISTORY_FILE};
use sitewatch::engine::{CycleSummary, Engine};
use sitewatch::history::AlertHistory;
use sitewatch::io::{HttpResponse, HttpTransport, ProbeRequest, TransportError};
use sitewatch::notifier::{Alert, Notifier};
use sitewatch::result::CheckResult;

/// Transport that replays a per-URL script, repeating the last entry
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Vec<Result<HttpResponse, TransportError>>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn push(&self, url: &str, reply: Result<HttpResponse, TransportError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push(reply);
    }

    /// Times at which `url` was requested
    pub fn calls_to(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((request.url.clone(), Instant::now()));
            calls.iter().filter(|(url, _)| *url == request.url).count()
        };

        let scripts = self.scripts.lock().unwrap();
        match scripts.get(&request.url) {
            Some(script) if !script.is_empty() => {
                script[(attempt - 1).min(script.len() - 1)].clone()
            }
            _ => Err(TransportError::Request(format!(
                "no scripted reply for {}",
                request.url
            ))),
        }
    }
}

pub fn reply(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status,
        body: body.as_bytes().to_vec(),
        elapsed: Duration::from_millis(25),
    })
}

/// Notifier that records every alert and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub failing: bool,
    pub attempts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn last_alert(&self) -> Option<Alert> {
        self.attempts.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn type_name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, alert: &Alert) -> sitewatch::Result<()> {
        self.attempts.lock().unwrap().push(alert.clone());
        if self.failing {
            Err(sitewatch::SitewatchError::Notifier(
                "SMTP submission failed: connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default, World)]
pub struct SitewatchWorld {
    pub config: Config,
    pub temp_dir: Option<tempfile::TempDir>,
    pub transport: Arc<ScriptedTransport>,
    pub notifier: Option<Arc<RecordingNotifier>>,
    pub history: Option<AlertHistory>,
    pub engine: Option<Engine>,

    // Outcomes
    pub check_result: Option<CheckResult>,
    pub summary: Option<CycleSummary>,
    pub recorded_alerts: HashMap<String, DateTime<Utc>>,
}

impl SitewatchWorld {
    pub fn history_path(&mut self) -> PathBuf {
        let dir = self
            .temp_dir
            .get_or_insert_with(|| tempfile::tempdir().expect("failed to create temp dir"));
        dir.path().join(ALERT_HISTORY_FILE)
    }

    pub fn history_mut(&mut self) -> &mut AlertHistory {
        if self.history.is_none() {
            let path = self.history_path();
            self.history = Some(AlertHistory::new(path, self.config.alert_cooldown()));
        }
        self.history.as_mut().expect("history just created")
    }

    pub fn notifier(&mut self) -> Arc<RecordingNotifier> {
        let notifier = self
            .notifier
            .get_or_insert_with(|| Arc::new(RecordingNotifier::default()));
        Arc::clone(notifier)
    }

    /// The engine, built from the current setup on first use
    pub fn engine(&mut self) -> &mut Engine {
        if self.engine.is_none() {
            let notifier = self.notifier();
            let history = match self.history.take() {
                Some(history) => history,
                None => {
                    let path = self.history_path();
                    AlertHistory::new(path, self.config.alert_cooldown())
                }
            };
            let transport: Arc<dyn HttpTransport> = self.transport.clone();
            self.engine = Some(Engine::new(&self.config, transport, notifier, history));
        }
        self.engine.as_mut().expect("engine just created")
    }

    /// Current view of the alert history, wherever it lives
    pub fn current_history(&self) -> Option<&AlertHistory> {
        match &self.engine {
            Some(engine) => Some(engine.history()),
            None => self.history.as_ref(),
        }
    }
}
