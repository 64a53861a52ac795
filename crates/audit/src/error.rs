//! Error types for health audits

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Page driver error: {0}")]
    Driver(String),

    #[error("Health check failed: {count} issue(s) detected")]
    ChecksFailed { count: usize },

    #[error("Audit spec parse error: {0}")]
    SpecParse(String),

    #[error("Alert transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;
