//! Error types for the sitewatch service

/// Errors that can occur in the sitewatch service
#[derive(Debug, thiserror::Error)]
pub enum SitewatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notifier error: {0}")]
    Notifier(String),

    #[error("Alert history error: {0}")]
    History(String),
}

/// Result type alias for sitewatch operations
pub type Result<T> = std::result::Result<T, SitewatchError>;
