//! The single browser tab shared by a run

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::driver::{AxNode, PageDriver};
use crate::error::VerifyResult;

/// An open browser tab plus the application base URL.
///
/// Scenarios borrow the session mutably one at a time. Nothing about the
/// page state left behind by a previous scenario is guaranteed, which is why
/// every scenario starts with a navigation.
pub struct PageSession {
    driver: Box<dyn PageDriver>,
    base_url: String,
    closed: bool,
}

impl PageSession {
    pub fn new(driver: Box<dyn PageDriver>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            driver,
            base_url,
            closed: false,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a root-relative path onto the base URL; absolute URLs pass through
    pub fn absolute_url(&self, url: &str) -> String {
        if url.contains("://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    pub async fn navigate(&mut self, url: &str, timeout: Duration) -> VerifyResult<()> {
        debug!("Loading {}", url);
        self.driver.navigate(url, timeout).await
    }

    pub async fn current_url(&mut self) -> VerifyResult<String> {
        self.driver.current_url().await
    }

    pub async fn snapshot(&mut self) -> VerifyResult<Vec<AxNode>> {
        self.driver.snapshot().await
    }

    pub async fn click(&mut self, node_id: u64) -> VerifyResult<()> {
        self.driver.click(node_id).await
    }

    pub async fn screenshot(&mut self, path: &Path) -> VerifyResult<()> {
        self.driver.screenshot(path, true).await
    }

    /// Close the tab. Further calls are no-ops.
    pub async fn close(&mut self) -> VerifyResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.close().await
    }
}
