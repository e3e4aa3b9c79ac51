//! Harness configuration
//!
//! Defaults match the local dev server. A YAML file can override any field;
//! CLI flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{VerifyError, VerifyResult};
use crate::playwright::{Browser, PlaywrightConfig};
use crate::runner::RunnerConfig;
use crate::wait::WaitPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Where the application under test is served
    pub base_url: String,

    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// `node_modules` directory that provides `playwright`
    pub node_modules: Option<PathBuf>,

    pub navigation_timeout_ms: u64,
    pub assertion_timeout_ms: u64,
    pub poll_interval_ms: u64,

    /// Extra attempts for a failed scenario
    pub retries: u32,

    /// How long to wait for the application to answer HTTP before running
    pub readiness_timeout_ms: u64,

    pub evidence_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_modules: None,
            navigation_timeout_ms: 30_000,
            assertion_timeout_ms: 5_000,
            poll_interval_ms: 100,
            retries: 0,
            readiness_timeout_ms: 30_000,
            evidence_dir: PathBuf::from("verification-results/screenshots"),
            output_dir: PathBuf::from("verification-results"),
        }
    }
}

impl HarnessConfig {
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> VerifyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| VerifyError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> VerifyResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(VerifyError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(VerifyError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.assertion_timeout_ms < self.poll_interval_ms {
            return Err(VerifyError::Config(
                "assertion_timeout_ms must be at least poll_interval_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_millis(self.assertion_timeout_ms),
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn runner(&self) -> RunnerConfig {
        RunnerConfig {
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            wait: self.wait_policy(),
            retries: self.retries,
        }
    }

    pub fn playwright(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser,
            headless: self.headless,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            node_modules: self.node_modules.clone(),
            ..Default::default()
        }
    }
}
