//! Dashboard UI Verification Harness
//!
//! Drives a headless browser against a running web application and checks
//! that role-specific dashboards expose the expected navigation, that
//! fragment-based tab routing responds to clicks, and captures screenshots
//! as evidence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Scenario Runner (runner.rs)                 │
//! │    run_all(&[Scenario]) -> RunReport                        │
//! │    run(&Scenario) -> ScenarioReport { Passed | Failed }     │
//! ├──────────────────────────┬──────────────────────────────────┤
//! │  Interaction Executor    │  Wait/Assertion Engine           │
//! │    navigate, click       │    wait_for(target, condition)   │
//! ├──────────────────────────┴──────────────────────────────────┤
//! │  Locator Resolver          role + name | text  -> handles   │
//! │  Evidence Capture          full-page PNG, unique paths      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageSession ── PageDriver ── PlaywrightDriver (node bridge)│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scenarios are ordered [`Step`]s:
//!
//! ```text
//! navigate { url }
//! click    { locator }
//! assert   { locator?, condition: visible | has_text | has_url, timeout_ms? }
//! capture  { name }
//! ```

pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod evidence;
pub mod executor;
pub mod locator;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod target;
pub mod wait;

pub use config::HarnessConfig;
pub use driver::{AxNode, PageDriver};
pub use error::{VerifyError, VerifyResult};
pub use evidence::{Evidence, EvidenceStore};
pub use locator::{ElementHandle, ElementLocator, Matcher, Role};
pub use runner::{RunReport, RunnerConfig, ScenarioReport, ScenarioRunner, Verdict};
pub use scenario::{Scenario, Step};
pub use session::PageSession;
pub use wait::{Condition, Target, WaitPolicy};
