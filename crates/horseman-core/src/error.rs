use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HorsemanError {
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("Timed out after {0}ms")]
    Timeout(u64),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid price query: {0}")]
    InvalidQuery(String),
    #[error("Unauthorized: watermark mismatch")]
    Unauthorized,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Selector error: {0}")]
    Selector(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl HorsemanError {
    /// Whether the failure happened inside the browser session rather than in
    /// validating the caller's input.
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            HorsemanError::Browser(_) | HorsemanError::Navigation { .. } | HorsemanError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HorsemanError>;
