//! Scenario runner: ordered steps on a shared session, isolated failures

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{VerifyError, VerifyResult};
use crate::evidence::{capture, Evidence, EvidenceStore};
use crate::executor;
use crate::scenario::{Scenario, Step};
use crate::session::PageSession;
use crate::wait::{wait_for, WaitPolicy};

/// Lifecycle of one scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Pending,
    Running,
    Passed,
    Failed,
}

impl ScenarioState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScenarioState::Passed | ScenarioState::Failed)
    }

    /// `Pending -> Running -> {Passed, Failed}`; terminal states are final.
    pub fn transition(self, next: ScenarioState) -> VerifyResult<ScenarioState> {
        use ScenarioState::*;
        match (self, next) {
            (Pending, Running) | (Running, Passed) | (Running, Failed) => Ok(next),
            _ => Err(VerifyError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScenarioState::Pending => "pending",
            ScenarioState::Running => "running",
            ScenarioState::Passed => "passed",
            ScenarioState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final outcome of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed { step: usize, reason: String },
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

/// Result of executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub step: String,
    pub success: bool,
    pub duration_ms: u64,
    /// What the step observed or did
    pub detail: Option<String>,
    pub error: Option<String>,
    /// Non-fatal problems, such as a failed capture
    pub warning: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub verdict: Verdict,
    pub attempts: u32,
    pub duration_ms: u64,
    pub steps: Vec<StepRecord>,
    pub evidence: Vec<Evidence>,
}

impl ScenarioReport {
    /// One-line failure description naming step, awaited condition and last state
    pub fn failure_summary(&self) -> Option<String> {
        match &self.verdict {
            Verdict::Passed => None,
            Verdict::Failed { step, reason } => {
                let label = self
                    .steps
                    .iter()
                    .find(|r| r.index == *step)
                    .map(|r| r.step.as_str())
                    .unwrap_or("validation");
                Some(format!("step {} ({}): {}", step, label, reason))
            }
        }
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Timing and retry policy for a run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub navigation_timeout: Duration,
    pub wait: WaitPolicy,
    /// Extra attempts for a failed scenario; 0 disables retry
    pub retries: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            wait: WaitPolicy::default(),
            retries: 0,
        }
    }
}

struct Attempt {
    verdict: Verdict,
    steps: Vec<StepRecord>,
    evidence: Vec<Evidence>,
}

/// Runs scenarios one after another against a borrowed session
pub struct ScenarioRunner<'s> {
    session: &'s mut PageSession,
    evidence: EvidenceStore,
    config: RunnerConfig,
}

impl<'s> ScenarioRunner<'s> {
    pub fn new(session: &'s mut PageSession, evidence: EvidenceStore, config: RunnerConfig) -> Self {
        Self {
            session,
            evidence,
            config,
        }
    }

    pub fn evidence_store(&self) -> &EvidenceStore {
        &self.evidence
    }

    /// Run every scenario; a failing scenario never stops the ones after it
    pub async fn run_all(&mut self, scenarios: &[Scenario]) -> RunReport {
        let start = Instant::now();
        let mut reports = Vec::with_capacity(scenarios.len());

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let report = self.run(scenario).await;
            match report.failure_summary() {
                None => info!("✓ {} ({} ms)", report.name, report.duration_ms),
                Some(failure) => error!("✗ {} - {}", report.name, failure),
            }
            reports.push(report);
        }

        let passed = reports.iter().filter(|r| r.verdict.is_passed()).count();
        let failed = reports.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        RunReport {
            run_id: self.evidence.run_id().to_string(),
            total: reports.len(),
            passed,
            failed,
            duration_ms,
            scenarios: reports,
        }
    }

    /// Run one scenario to completion or first failure, retrying per policy
    pub async fn run(&mut self, scenario: &Scenario) -> ScenarioReport {
        let start = Instant::now();
        let mut state = ScenarioState::Pending;
        debug!("Scenario {} is {}", scenario.name, state);

        if let Err(e) = scenario.validate() {
            return ScenarioReport {
                name: scenario.name.clone(),
                verdict: Verdict::Failed {
                    step: 0,
                    reason: e.to_string(),
                },
                attempts: 0,
                duration_ms: start.elapsed().as_millis() as u64,
                steps: Vec::new(),
                evidence: Vec::new(),
            };
        }

        let max_attempts = self.config.retries + 1;
        let mut attempt_no = 0;
        let mut evidence = Vec::new();

        let outcome = loop {
            attempt_no += 1;
            state = advance(ScenarioState::Pending, ScenarioState::Running);
            debug!("Scenario {} is {} (attempt {})", scenario.name, state, attempt_no);

            let attempt = self.run_attempt(scenario, attempt_no).await;
            evidence.extend(attempt.evidence.iter().cloned());

            if attempt.verdict.is_passed() || attempt_no >= max_attempts {
                break attempt;
            }

            warn!(
                "Scenario {} failed on attempt {}/{}, retrying",
                scenario.name, attempt_no, max_attempts
            );
        };

        let terminal = if outcome.verdict.is_passed() {
            ScenarioState::Passed
        } else {
            ScenarioState::Failed
        };
        state = advance(state, terminal);
        debug!("Scenario {} is {}", scenario.name, state);

        ScenarioReport {
            name: scenario.name.clone(),
            verdict: outcome.verdict,
            attempts: attempt_no,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: outcome.steps,
            evidence,
        }
    }

    async fn run_attempt(&mut self, scenario: &Scenario, attempt: u32) -> Attempt {
        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut evidence = Vec::new();

        for (index, step) in scenario.steps.iter().enumerate() {
            let started = Instant::now();
            debug!("Step {}: {}", index, step);

            let mut record = StepRecord {
                index,
                step: step.to_string(),
                success: true,
                duration_ms: 0,
                detail: None,
                error: None,
                warning: None,
            };

            let result = self
                .execute_step(scenario, attempt, index, step, &mut record, &mut evidence)
                .await;
            record.duration_ms = started.elapsed().as_millis() as u64;

            if let Err(e) = result {
                let reason = e.to_string();
                record.success = false;
                record.error = Some(reason.clone());
                steps.push(record);
                return Attempt {
                    verdict: Verdict::Failed { step: index, reason },
                    steps,
                    evidence,
                };
            }

            steps.push(record);
        }

        Attempt {
            verdict: Verdict::Passed,
            steps,
            evidence,
        }
    }

    async fn execute_step(
        &mut self,
        scenario: &Scenario,
        attempt: u32,
        index: usize,
        step: &Step,
        record: &mut StepRecord,
        evidence: &mut Vec<Evidence>,
    ) -> VerifyResult<()> {
        match step {
            Step::Navigate { url } => {
                let loaded =
                    executor::navigate(self.session, url, self.config.navigation_timeout).await?;
                record.detail = Some(format!("loaded {}", loaded));
            }
            Step::Click { locator } => {
                let clicked = executor::click(self.session, locator).await?;
                record.detail = Some(format!("clicked {}", clicked));
            }
            Step::Assert {
                target,
                condition,
                timeout_ms,
            } => {
                let policy = match timeout_ms {
                    Some(ms) => self.config.wait.with_timeout(Duration::from_millis(*ms)),
                    None => self.config.wait,
                };
                let observed = wait_for(self.session, target, condition, policy).await?;
                record.detail = Some(observed);
            }
            Step::Capture { name, path } => {
                let path = match path {
                    Some(path) => path.clone(),
                    None => self.evidence.path_for(&scenario.name, attempt, index, name),
                };
                match capture(self.session, &path).await {
                    Ok(shot) => {
                        record.detail = Some(shot.path.display().to_string());
                        evidence.push(shot);
                    }
                    Err(e) => {
                        warn!("{}", e);
                        record.warning = Some(e.to_string());
                    }
                }
            }
        }
        Ok(())
    }
}

fn advance(state: ScenarioState, next: ScenarioState) -> ScenarioState {
    match state.transition(next) {
        Ok(next) => next,
        Err(e) => {
            warn!("{}", e);
            state
        }
    }
}

/// Write the run report to `<output_dir>/run-report.json`
pub fn write_results(report: &RunReport, output_dir: &Path) -> VerifyResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("run-report.json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
