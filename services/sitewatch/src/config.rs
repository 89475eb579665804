//! Configuration types for the sitewatch service

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::{has_http_scheme, ApiEndpoint, EndpointSpec};
use crate::SitewatchError;

/// File name of the alert history inside the log directory
pub const ALERT_HISTORY_FILE: &str = "alert_history.json";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Recipient of alert emails
    #[serde(default)]
    pub alert_email: Option<String>,
    #[serde(default)]
    pub websites: Vec<String>,
    #[serde(default)]
    pub api_endpoints: Vec<ApiEndpoint>,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_alert_cooldown")]
    pub alert_cooldown_seconds: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smtp: SmtpConfig::default(),
            alert_email: None,
            websites: Vec::new(),
            api_endpoints: Vec::new(),
            check_interval_seconds: default_check_interval(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            alert_cooldown_seconds: default_alert_cooldown(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
        }
    }
}

/// Mail submission settings
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_server")]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            username: None,
            password: None,
        }
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Build the configuration from a `.env` file (if any) and the process environment
    pub fn from_env() -> crate::Result<Self> {
        check_env_file(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build and validate the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let config = Config {
            smtp: SmtpConfig {
                server: get("SMTP_SERVER").unwrap_or(defaults.smtp.server),
                port: parse_var("SMTP_PORT", get("SMTP_PORT"), defaults.smtp.port)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
            },
            alert_email: get("ALERT_EMAIL").map(|v| v.trim().to_string()),
            websites: parse_websites(&get("WEBSITES").unwrap_or_default()),
            api_endpoints: parse_api_endpoints(&get("API_ENDPOINTS").unwrap_or_default())?,
            check_interval_seconds: parse_var(
                "CHECK_INTERVAL",
                get("CHECK_INTERVAL"),
                defaults.check_interval_seconds,
            )?,
            timeout_seconds: parse_var("TIMEOUT", get("TIMEOUT"), defaults.timeout_seconds)?,
            max_retries: parse_var("MAX_RETRIES", get("MAX_RETRIES"), defaults.max_retries)?,
            alert_cooldown_seconds: parse_var(
                "ALERT_COOLDOWN",
                get("ALERT_COOLDOWN"),
                defaults.alert_cooldown_seconds,
            )?,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: get("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the monitor cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

        if !present(&self.smtp.username) || !present(&self.smtp.password) {
            return Err(SitewatchError::Config(
                "SMTP credentials not configured".to_string(),
            ));
        }

        if !present(&self.alert_email) {
            return Err(SitewatchError::Config(
                "Alert email not configured".to_string(),
            ));
        }

        if self.websites.is_empty() && self.api_endpoints.is_empty() {
            return Err(SitewatchError::Config(
                "No websites or APIs configured for monitoring".to_string(),
            ));
        }

        if let Some(url) = self.websites.iter().find(|url| !has_http_scheme(url)) {
            return Err(SitewatchError::Config(format!("Invalid URL: {}", url)));
        }

        for api in &self.api_endpoints {
            if !has_http_scheme(&api.url) {
                return Err(SitewatchError::Config(format!(
                    "Invalid API URL: {}",
                    api.url
                )));
            }
        }

        if self.max_retries == 0 {
            return Err(SitewatchError::Config(
                "MAX_RETRIES must be at least 1".to_string(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(SitewatchError::Config(
                "TIMEOUT must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }

    /// All endpoints in check order: websites first, then APIs
    pub fn endpoints(&self) -> Vec<EndpointSpec> {
        self.websites
            .iter()
            .map(EndpointSpec::website)
            .chain(self.api_endpoints.iter().cloned().map(EndpointSpec::Api))
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_seconds)
    }

    pub fn history_path(&self) -> PathBuf {
        self.log_dir.join(ALERT_HISTORY_FILE)
    }
}

/// A missing `.env` file is fine; one that exists but cannot be read or parsed is not
fn check_env_file(loaded: dotenvy::Result<PathBuf>) -> crate::Result<()> {
    match loaded {
        Ok(path) => {
            tracing::debug!("Loaded environment from {:?}", path);
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(SitewatchError::Config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

fn parse_var<T>(key: &str, value: Option<String>, default: T) -> crate::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            SitewatchError::Config(format!("Invalid value for {}: {:?} ({})", key, raw, e))
        }),
    }
}

/// Parse a comma-separated list of website URLs
pub fn parse_websites(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `name|url|expected_status|key:value,key:value|verify_tls` entries separated by `;`
///
/// Everything after the url is optional. Entries with fewer than two fields are skipped;
/// an expected status that is present but not a number is an error.
pub fn parse_api_endpoints(raw: &str) -> crate::Result<Vec<ApiEndpoint>> {
    let mut endpoints = Vec::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split('|').map(str::trim).collect();
        if parts.len() < 2 {
            tracing::debug!("Skipping malformed API endpoint entry {:?}", entry);
            continue;
        }

        let mut api = ApiEndpoint::new(parts[0], parts[1]);

        if let Some(status) = parts.get(2).filter(|s| !s.is_empty()) {
            api.expected_status = status.parse().map_err(|e| {
                SitewatchError::Config(format!(
                    "Invalid expected status {:?} for API {}: {}",
                    status, parts[1], e
                ))
            })?;
        }

        if let Some(fields) = parts.get(3).filter(|s| !s.is_empty()) {
            for pair in fields.split(',') {
                if let Some((key, value)) = pair.split_once(':') {
                    api.expected_fields
                        .insert(key.trim().to_string(), parse_expected_value(value.trim()));
                }
            }
        }

        if let Some(verify) = parts.get(4).filter(|s| !s.is_empty()) {
            api.verify_tls = !matches!(verify.to_ascii_lowercase().as_str(), "false" | "no" | "0");
        }

        endpoints.push(api);
    }

    Ok(endpoints)
}

/// Interpret an expected field value: booleans, unsigned integers, otherwise a string
pub fn parse_expected_value(raw: &str) -> Value {
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<u64>() {
            return Value::from(n);
        }
    }

    Value::String(raw.to_string())
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_check_interval() -> u64 {
    300
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_alert_cooldown() -> u64 {
    3600
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Load and validate configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SitewatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
