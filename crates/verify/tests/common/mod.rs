//! In-memory stand-in for the dashboard application and its browser tab

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use dashboard_verify::{AxNode, PageDriver, PageSession, VerifyError, VerifyResult};

pub const BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Default)]
struct AppState {
    url: String,
    /// Fragment a click asked for, applied once its delay passed
    pending_route: Option<(String, Instant)>,
    dialog_at: Option<Instant>,
    last_snapshot: Vec<AxNode>,

    navigations: Vec<String>,
    clicks: Vec<String>,
    snapshots: usize,

    // knobs
    route_delay: Duration,
    dialog_delay: Duration,
    unreachable: HashSet<String>,
    failing_loads: usize,
    hidden_links: HashSet<String>,
    late_links: HashMap<String, Duration>,
    loaded_at: Option<Instant>,
    broken_screenshots: bool,
    snapshot_delay: Duration,
}

/// Simulated application. Clones share state, so a test can keep one handle
/// while the session owns the driver.
#[derive(Clone, Default)]
pub struct FakeApp {
    state: Arc<Mutex<AppState>>,
}

impl FakeApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> PageSession {
        PageSession::new(Box::new(self.clone()), BASE_URL)
    }

    fn with<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Clicked fragment links take effect after `delay`
    pub fn route_delay(self, delay: Duration) -> Self {
        self.with(|s| s.route_delay = delay);
        self
    }

    pub fn dialog_delay(self, delay: Duration) -> Self {
        self.with(|s| s.dialog_delay = delay);
        self
    }

    /// Loads of `path` never finish
    pub fn unreachable(self, path: &str) -> Self {
        self.with(|s| s.unreachable.insert(path.to_string()));
        self
    }

    /// The next `n` loads of any page time out
    pub fn failing_loads(self, n: usize) -> Self {
        self.with(|s| s.failing_loads = n);
        self
    }

    pub fn hidden_link(self, name: &str) -> Self {
        self.with(|s| s.hidden_links.insert(name.to_string()));
        self
    }

    /// `name` is only rendered `after` the page loaded
    pub fn late_link(self, name: &str, after: Duration) -> Self {
        self.with(|s| s.late_links.insert(name.to_string(), after));
        self
    }

    /// Every snapshot takes `delay` to come back
    pub fn slow_snapshots(self, delay: Duration) -> Self {
        self.with(|s| s.snapshot_delay = delay);
        self
    }

    pub fn broken_screenshots(self) -> Self {
        self.with(|s| s.broken_screenshots = true);
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.with(|s| s.navigations.clone())
    }

    pub fn clicks(&self) -> Vec<String> {
        self.with(|s| s.clicks.clone())
    }

    pub fn snapshots(&self) -> usize {
        self.with(|s| s.snapshots)
    }

    pub fn url(&self) -> String {
        self.with(|s| {
            settle(s);
            s.url.clone()
        })
    }
}

fn settle(state: &mut AppState) {
    if let Some((fragment, at)) = state.pending_route.clone() {
        if Instant::now() >= at {
            let base = state.url.split('#').next().unwrap_or_default().to_string();
            state.url = format!("{}#{}", base, fragment);
            state.pending_route = None;
        }
    }
}

struct Page {
    nodes: Vec<AxNode>,
    hrefs: HashMap<u64, String>,
}

impl Page {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            hrefs: HashMap::new(),
        }
    }

    fn add(&mut self, parent: Option<u64>, role: Option<&str>, name: &str, text: &str) -> u64 {
        let id = self.nodes.len() as u64 + 1;
        self.nodes.push(AxNode {
            id,
            parent,
            role: role.map(String::from),
            name: name.to_string(),
            text: text.to_string(),
            hidden: false,
            width: 160.0,
            height: 24.0,
        });
        id
    }

    fn link(&mut self, parent: u64, name: &str, href: &str) -> u64 {
        let id = self.add(Some(parent), Some("link"), name, name);
        self.hrefs.insert(id, href.to_string());
        id
    }
}

fn render(state: &AppState) -> Page {
    let (path, fragment) = match state.url.strip_prefix(BASE_URL) {
        Some(rest) => match rest.split_once('#') {
            Some((path, fragment)) => (path.to_string(), fragment.to_string()),
            None => (rest.to_string(), String::new()),
        },
        None => (String::new(), String::new()),
    };

    let since_load = state
        .loaded_at
        .map(|at| Instant::now().saturating_duration_since(at))
        .unwrap_or_default();

    let mut page = Page::new();
    let body = page.add(None, None, "", "");

    let nav_links: Vec<(&str, &str)> = match path.as_str() {
        "/patient-dashboard" => vec![
            ("My Documents", "#documents"),
            ("Search Documents", "#search"),
            ("My Appointments", "#appointments"),
            ("Book Appointment", "#book"),
            ("Upload Documents", "#upload"),
            ("Family Access", "#family"),
        ],
        "/doctor-dashboard" => vec![
            ("Dashboard", "#overview"),
            ("My Patients", "#patients"),
            ("Appointments", "#appointments"),
        ],
        "/hospital-dashboard" => vec![
            ("Dashboard", "#overview"),
            ("Patients", "#patients"),
            ("Add Patient", "#add-patient"),
            ("Doctors", "#doctors"),
            ("Appointments 3", "#appointments"),
            ("Add Record", "#add-record"),
        ],
        _ => Vec::new(),
    };

    if !nav_links.is_empty() {
        let nav = page.add(Some(body), Some("navigation"), "", "");
        for (name, href) in nav_links {
            if let Some(after) = state.late_links.get(name) {
                if since_load < *after {
                    continue;
                }
            }
            let id = page.link(nav, name, href);
            if state.hidden_links.contains(name) {
                page.nodes[id as usize - 1].hidden = true;
            }
        }
    }

    let main = page.add(Some(body), Some("main"), "", "");
    match path.as_str() {
        "/patient-dashboard" => {
            let heading = match fragment.as_str() {
                "search" => "Enhanced Document Search",
                "upload" => "Upload a new document",
                "family" => "Manage Family Access",
                "appointments" => "Upcoming Appointments",
                "book" => "Book an Appointment",
                _ => "My Documents",
            };
            page.add(Some(main), Some("heading"), heading, heading);
        }
        "/doctor-dashboard" | "/hospital-dashboard" => {
            page.add(Some(main), Some("heading"), "Overview", "Overview");
        }
        "/upload" => {
            page.add(Some(main), Some("heading"), "Upload", "Upload");
            page.add(Some(main), Some("button"), "Open Camera", "Open Camera");
            if let Some(at) = state.dialog_at {
                if Instant::now() >= at {
                    let dialog = page.add(Some(body), Some("dialog"), "Document Scanner", "");
                    page.add(Some(dialog), Some("button"), "Capture", "Capture");
                }
            }
        }
        _ => {
            page.add(Some(main), Some("heading"), "Page not found", "Page not found");
        }
    }

    // Derive container text from children, like innerText would
    for i in (0..page.nodes.len()).rev() {
        let node = page.nodes[i].clone();
        if let Some(parent) = node.parent {
            if node.hidden || node.text.is_empty() {
                continue;
            }
            let p = &mut page.nodes[parent as usize - 1];
            p.text = if p.text.is_empty() {
                node.text.clone()
            } else {
                format!("{} {}", node.text, p.text)
            };
        }
    }

    page
}

#[async_trait]
impl PageDriver for FakeApp {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> VerifyResult<()> {
        self.with(|s| {
            s.navigations.push(url.to_string());
            let path = url.strip_prefix(BASE_URL).unwrap_or(url);
            let path = path.split('#').next().unwrap_or_default();
            if s.unreachable.contains(path) || s.failing_loads > 0 {
                s.failing_loads = s.failing_loads.saturating_sub(1);
                return Err(VerifyError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            s.url = url.to_string();
            s.pending_route = None;
            s.dialog_at = None;
            s.loaded_at = Some(Instant::now());
            Ok(())
        })
    }

    async fn current_url(&mut self) -> VerifyResult<String> {
        Ok(self.url())
    }

    async fn snapshot(&mut self) -> VerifyResult<Vec<AxNode>> {
        let delay = self.with(|s| s.snapshot_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            settle(s);
            s.snapshots += 1;
            let page = render(s);
            s.last_snapshot = page.nodes.clone();
            Ok(page.nodes)
        })
    }

    async fn click(&mut self, node_id: u64) -> VerifyResult<()> {
        self.with(|s| {
            let page = render(s);
            let node = page
                .nodes
                .iter()
                .find(|n| n.id == node_id)
                .cloned()
                .ok_or_else(|| VerifyError::Driver(format!("no node {}", node_id)))?;
            s.clicks.push(node.name.clone());

            if let Some(href) = page.hrefs.get(&node_id) {
                let fragment = href.trim_start_matches('#').to_string();
                s.pending_route = Some((fragment, Instant::now() + s.route_delay));
            } else if node.name == "Open Camera" {
                s.dialog_at = Some(Instant::now() + s.dialog_delay);
            }
            Ok(())
        })
    }

    async fn screenshot(&mut self, path: &Path, _full_page: bool) -> VerifyResult<()> {
        if self.with(|s| s.broken_screenshots) {
            return Err(VerifyError::Driver("screenshot: target closed".to_string()));
        }
        image::RgbaImage::from_pixel(8, 6, image::Rgba([30, 60, 90, 255])).save(path)?;
        Ok(())
    }

    async fn close(&mut self) -> VerifyResult<()> {
        Ok(())
    }
}
