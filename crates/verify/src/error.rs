//! Error types for UI verification

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {timeout_ms} ms waiting for {awaited}; last observed: {last_observed}")]
    TimeoutExceeded {
        awaited: String,
        last_observed: String,
        timeout_ms: u64,
    },

    #[error("Navigation to {url} did not complete within {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Capture to {path} failed: {reason}")]
    CaptureFailed { path: PathBuf, reason: String },

    #[error("Invalid assertion: {0}")]
    InvalidAssertion(String),

    #[error("Invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    BridgeNotFound,

    #[error("Application at {url} not reachable after {attempts} attempts")]
    TargetUnreachable { url: String, attempts: usize },

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type VerifyResult<T> = Result<T, VerifyError>;
