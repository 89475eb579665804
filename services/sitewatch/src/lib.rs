//! Sitewatch - website and API uptime monitor
//!
//! Probes configured endpoints on a schedule, retries failures with backoff,
//! and emails an alert per failing endpoint at most once per cooldown window.

pub mod config;
pub mod email;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod history;
pub mod io;
pub mod logging;
pub mod notifier;
pub mod probe;
pub mod result;
pub mod retry;

pub use config::{load_config, Config};
pub use error::{Result, SitewatchError};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::email::{EmailNotifier, SmtpMailSender};
use crate::engine::Engine;
use crate::history::AlertHistory;
use crate::io::ReqwestTransport;

/// How long the monitor keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// A single check cycle, then exit
    Once,
    /// Check cycles every interval until interrupted
    Continuous,
}

/// Run the monitor with the given configuration
pub async fn run(config: Config, mode: RunMode) -> Result<()> {
    let transport = Arc::new(ReqwestTransport::new()?);
    let sender = Arc::new(SmtpMailSender::new(&config.smtp)?);
    let notifier = Arc::new(EmailNotifier::new(&config, sender)?);
    let history = AlertHistory::load(config.history_path(), config.alert_cooldown());

    let mut engine = Engine::new(&config, transport, notifier, history);

    tracing::info!("Website Monitor initialized");
    tracing::info!(
        "Monitoring {} websites and {} APIs",
        config.websites.len(),
        config.api_endpoints.len()
    );

    match mode {
        RunMode::Once => {
            engine.run_once().await;
        }
        RunMode::Continuous => {
            let cancel = CancellationToken::new();
            let cancel_for_signal = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => tracing::info!("Shutdown signal received"),
                    Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
                }
                cancel_for_signal.cancel();
            });

            let interval = config.check_interval();
            engine.run_continuous(interval, cancel).await;
        }
    }

    Ok(())
}
