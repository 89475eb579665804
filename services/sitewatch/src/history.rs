//! Durable per-endpoint record of the last alert sent, used to throttle alerts

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone, Utc};

use crate::SitewatchError;

/// Where an endpoint stands with respect to alert throttling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    NoHistory,
    InCooldown { until: DateTime<Utc> },
    CooledDown,
}

/// Last-alert timestamps keyed by endpoint id, mirrored to a JSON file
#[derive(Debug)]
pub struct AlertHistory {
    path: PathBuf,
    cooldown: TimeDelta,
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl AlertHistory {
    /// An empty history that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>, cooldown: Duration) -> Self {
        Self {
            path: path.into(),
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
            entries: BTreeMap::new(),
        }
    }

    /// Load the history from `path`; a missing or unreadable file yields an empty history
    pub fn load(path: impl Into<PathBuf>, cooldown: Duration) -> Self {
        let mut history = Self::new(path, cooldown);
        match read_entries(&history.path) {
            Ok(entries) => {
                tracing::debug!(
                    "Loaded {} alert history entries from {:?}",
                    entries.len(),
                    history.path
                );
                history.entries = entries;
            }
            Err(e) => {
                tracing::warn!("Could not load alert history: {}", e);
            }
        }
        history
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &BTreeMap<String, DateTime<Utc>> {
        &self.entries
    }

    pub fn last_alert(&self, id: &str) -> Option<DateTime<Utc>> {
        self.entries.get(id).copied()
    }

    pub fn state(&self, id: &str, now: DateTime<Utc>) -> AlertState {
        let Some(last) = self.last_alert(id) else {
            return AlertState::NoHistory;
        };

        match last.checked_add_signed(self.cooldown) {
            Some(until) if now > until => AlertState::CooledDown,
            Some(until) => AlertState::InCooldown { until },
            None => AlertState::InCooldown {
                until: DateTime::<Utc>::MAX_UTC,
            },
        }
    }

    /// Whether an alert for `id` may be sent at `now`
    pub fn should_alert(&self, id: &str, now: DateTime<Utc>) -> bool {
        !matches!(self.state(id, now), AlertState::InCooldown { .. })
    }

    /// Remember that an alert for `id` went out at `now` and flush to disk
    ///
    /// A failed flush is logged; the in-memory entry still counts for this process.
    pub fn record_alert(&mut self, id: &str, now: DateTime<Utc>) {
        self.entries.insert(id.to_string(), now);
        if let Err(e) = self.save() {
            tracing::error!("Could not save alert history: {}", e);
        }
    }

    /// Rewrite the whole history file
    pub fn save(&self) -> crate::Result<()> {
        let serialized: BTreeMap<&str, String> = self
            .entries
            .iter()
            .map(|(id, at)| (id.as_str(), format_timestamp(at)))
            .collect();
        let content = serde_json::to_string_pretty(&serialized)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(
            "Saved {} alert history entries to {:?}",
            self.entries.len(),
            self.path
        );
        Ok(())
    }
}

fn read_entries(path: &Path) -> crate::Result<BTreeMap<String, DateTime<Utc>>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SitewatchError::History(format!("Failed to read {:?}: {}", path, e)))?;
    let raw: BTreeMap<String, String> = serde_json::from_str(&content)
        .map_err(|e| SitewatchError::History(format!("Failed to parse {:?}: {}", path, e)))?;

    let mut entries = BTreeMap::new();
    for (id, value) in raw {
        match parse_timestamp(&value) {
            Some(at) => {
                entries.insert(id, at);
            }
            None => tracing::warn!(
                "Ignoring alert history entry for {}: bad timestamp {:?}",
                id,
                value
            ),
        }
    }
    Ok(entries)
}

/// ISO-8601 with only as many fractional digits as needed
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an RFC 3339 timestamp, or a naive one in local time
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
}
