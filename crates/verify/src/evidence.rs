//! Screenshot evidence
//!
//! Screenshots are diagnostic. A failed capture is reported on its step but
//! never decides whether a scenario passed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{VerifyError, VerifyResult};
use crate::session::PageSession;

/// A screenshot that was written and checked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
    pub width: u32,
    pub height: u32,
}

/// Derives collision-free screenshot paths for one run.
///
/// Layout: `<root>/<run-id>/<scenario>/<attempt>-<step>-<name>.png`. The run id
/// combines a UTC timestamp with the process id.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    root: PathBuf,
    run_id: String,
}

impl EvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let run_id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ"),
            std::process::id()
        );
        Self::with_run_id(root, run_id)
    }

    pub fn with_run_id(root: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> PathBuf {
        self.root.join(&self.run_id)
    }

    pub fn path_for(&self, scenario: &str, attempt: u32, step: usize, name: &str) -> PathBuf {
        self.run_dir()
            .join(scenario_dir(scenario))
            .join(format!("{}-{:02}-{}.png", attempt, step, slug(name)))
    }
}

/// Directory name for a scenario. Names that do not survive slugging
/// unchanged get a short hash of the raw name, so distinct names never share
/// a directory.
pub fn scenario_dir(name: &str) -> String {
    let slugged = slug(name);
    if slugged == name {
        return slugged;
    }
    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    format!("{}-{}", slugged, &digest[..8])
}

/// Lowercase, alphanumerics and dashes only
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Take a full-page screenshot to `path` and verify it decodes as an image.
pub async fn capture(session: &mut PageSession, path: &Path) -> VerifyResult<Evidence> {
    let failed = |reason: String| VerifyError::CaptureFailed {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
    }

    session
        .screenshot(path)
        .await
        .map_err(|e| failed(e.to_string()))?;

    let data = std::fs::read(path).map_err(|e| failed(e.to_string()))?;
    if data.is_empty() {
        return Err(failed("screenshot file is empty".to_string()));
    }

    let img = image::load_from_memory(&data).map_err(|e| failed(e.to_string()))?;
    let (width, height) = img.dimensions();

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let sha256 = hex::encode(hasher.finalize());

    debug!("Screenshot {} is {}x{} ({} bytes)", path.display(), width, height, data.len());
    info!("Captured {}", path.display());

    Ok(Evidence {
        path: path.to_path_buf(),
        sha256,
        bytes: data.len() as u64,
        width,
        height,
    })
}
