//! Playwright browser automation
//!
//! A single long-lived `node` process runs the embedded bridge script and
//! keeps one browser tab open for the whole run. Requests and responses are
//! line-delimited JSON over the child's stdin/stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::driver::{AxNode, PageDriver};
use crate::error::{VerifyError, VerifyResult};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Extra time the bridge gets on top of the operation's own timeout
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(VerifyError::Config(format!("Unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// `node_modules` directory holding `playwright`; defaults to `./node_modules`
    pub node_modules: Option<PathBuf>,
    /// How long browser launch may take
    pub launch_timeout: Duration,
    /// Bound for snapshot, URL, click and screenshot requests
    pub command_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_modules: None,
            launch_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Op<'a> {
    Navigate { url: &'a str, timeout_ms: u64 },
    Url,
    Snapshot,
    Click { node: u64, timeout_ms: u64 },
    Screenshot { path: &'a Path, full_page: bool },
    Close,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(flatten)]
    op: Op<'a>,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: i64,
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl Response {
    fn is_timeout(&self) -> bool {
        self.kind.as_deref() == Some("timeout")
    }

    fn failure(&self) -> String {
        format!(
            "{}: {}",
            self.kind.as_deref().unwrap_or("error"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

/// Playwright-backed [`PageDriver`]
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    command_timeout: Duration,
    // Holds bridge.js for the lifetime of the child
    _script_dir: TempDir,
}

impl PlaywrightDriver {
    /// Start the bridge process and wait for the browser to come up
    pub async fn launch(config: &PlaywrightConfig) -> VerifyResult<Self> {
        let node_path = match &config.node_modules {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?.join("node_modules"),
        };

        Self::check_playwright_installed(&node_path).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        info!(
            "Launching {} (headless: {}) via Playwright bridge",
            config.browser.as_str(),
            config.headless
        );

        let mut child = Command::new("node")
            .arg(&script_path)
            .arg(config.browser.as_str())
            .arg(config.headless.to_string())
            .arg(config.viewport_width.to_string())
            .arg(config.viewport_height.to_string())
            .env("NODE_PATH", &node_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VerifyError::Driver(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VerifyError::Driver("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VerifyError::Driver("bridge stdout unavailable".to_string()))?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            command_timeout: config.command_timeout,
            _script_dir: script_dir,
        };

        let ready = driver.read_response(0, config.launch_timeout).await?;
        if !ready.ok {
            return Err(VerifyError::Driver(format!(
                "browser launch failed: {}",
                ready.failure()
            )));
        }

        debug!("Playwright bridge ready");
        Ok(driver)
    }

    /// Check if Playwright is resolvable from `node_path`
    async fn check_playwright_installed(node_path: &Path) -> VerifyResult<()> {
        let status = Command::new("node")
            .args(["-e", "require.resolve('playwright')"])
            .env("NODE_PATH", node_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(VerifyError::BridgeNotFound),
        }
    }

    async fn exchange(&mut self, op: Op<'_>, wait: Duration) -> VerifyResult<Response> {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&Request { id, op })?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| VerifyError::Driver(format!("bridge write failed: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| VerifyError::Driver(format!("bridge write failed: {}", e)))?;

        self.read_response(id as i64, wait).await
    }

    async fn read_response(&mut self, id: i64, wait: Duration) -> VerifyResult<Response> {
        match timeout(wait, self.next_response(id)).await {
            Ok(result) => result,
            Err(_) => Err(VerifyError::Driver(format!(
                "bridge did not answer request {} within {} ms",
                id,
                wait.as_millis()
            ))),
        }
    }

    async fn next_response(&mut self, id: i64) -> VerifyResult<Response> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| VerifyError::Driver(format!("bridge read failed: {}", e)))?
                .ok_or_else(|| VerifyError::Driver("bridge exited".to_string()))?;

            match serde_json::from_str::<Response>(&line) {
                Ok(response) if response.id == id => return Ok(response),
                Ok(response) => {
                    warn!("Ignoring bridge response {} while waiting for {}", response.id, id)
                }
                Err(_) => debug!("[bridge] {}", line),
            }
        }
    }

    async fn request(&mut self, op: Op<'_>) -> VerifyResult<serde_json::Value> {
        let wait = self.command_timeout + RESPONSE_GRACE;
        let response = self.exchange(op, wait).await?;
        if response.ok {
            Ok(response.result)
        } else {
            Err(VerifyError::Driver(response.failure()))
        }
    }
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn navigate(&mut self, url: &str, limit: Duration) -> VerifyResult<()> {
        let timeout_ms = limit.as_millis() as u64;
        let response = self
            .exchange(Op::Navigate { url, timeout_ms }, limit + RESPONSE_GRACE)
            .await?;

        if response.ok {
            Ok(())
        } else if response.is_timeout() {
            Err(VerifyError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms,
            })
        } else {
            Err(VerifyError::Driver(response.failure()))
        }
    }

    async fn current_url(&mut self) -> VerifyResult<String> {
        let value = self.request(Op::Url).await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| VerifyError::Driver(format!("unexpected url response: {}", value)))
    }

    async fn snapshot(&mut self) -> VerifyResult<Vec<AxNode>> {
        let value = self.request(Op::Snapshot).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn click(&mut self, node_id: u64) -> VerifyResult<()> {
        let timeout_ms = self.command_timeout.as_millis() as u64;
        self.request(Op::Click {
            node: node_id,
            timeout_ms,
        })
        .await?;
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> VerifyResult<()> {
        self.request(Op::Screenshot { path, full_page }).await?;
        Ok(())
    }

    async fn close(&mut self) -> VerifyResult<()> {
        if let Err(e) = self.request(Op::Close).await {
            debug!("Bridge close request failed: {}", e);
        }

        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("Playwright bridge exited with {}", status);
                Ok(())
            }
            _ => {
                warn!("Playwright bridge did not exit, killing it");
                self.child.kill().await?;
                Ok(())
            }
        }
    }
}
