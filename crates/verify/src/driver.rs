//! Browser capability consumed by the harness
//!
//! The harness never talks to a browser engine directly. Everything it needs
//! (load a URL, read the accessibility tree, click, screenshot) goes through
//! [`PageDriver`], so the same scenarios run against Playwright or against an
//! in-memory page in tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VerifyResult;

/// One element of an accessibility snapshot, in document order.
///
/// `id` is only meaningful within the snapshot that produced it; a later
/// snapshot may assign different ids to the same element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxNode {
    pub id: u64,

    #[serde(default)]
    pub parent: Option<u64>,

    /// Computed role, explicit `role` attribute first, then the implicit one
    #[serde(default)]
    pub role: Option<String>,

    /// Accessible name, whitespace-collapsed
    #[serde(default)]
    pub name: String,

    /// Rendered text, whitespace-collapsed
    #[serde(default)]
    pub text: String,

    /// Hidden by styling (`display`, `visibility`, `hidden`, `aria-hidden`)
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub width: f64,

    #[serde(default)]
    pub height: f64,
}

impl AxNode {
    /// Laid out with non-zero dimensions and not hidden by styling.
    pub fn is_visible(&self) -> bool {
        !self.hidden && self.width > 0.0 && self.height > 0.0
    }
}

/// Automation protocol capability for a single browser tab.
#[async_trait]
pub trait PageDriver: Send {
    /// Load `url` and return once the load event fired.
    ///
    /// Implementations report an unfinished load with
    /// [`crate::VerifyError::NavigationTimeout`].
    async fn navigate(&mut self, url: &str, timeout: Duration) -> VerifyResult<()>;

    /// Full current URL, fragment included.
    async fn current_url(&mut self) -> VerifyResult<String>;

    /// Fresh accessibility snapshot of the current document.
    async fn snapshot(&mut self) -> VerifyResult<Vec<AxNode>>;

    /// Dispatch a click on the node with `node_id` from the latest snapshot.
    async fn click(&mut self, node_id: u64) -> VerifyResult<()>;

    /// Write a PNG screenshot of the page to `path`.
    async fn screenshot(&mut self, path: &Path, full_page: bool) -> VerifyResult<()>;

    /// Release the tab and any backing process.
    async fn close(&mut self) -> VerifyResult<()>;
}
