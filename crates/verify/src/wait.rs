//! Condition polling with bounded timeouts
//!
//! Every assertion is a wait: the condition is re-checked on a fixed interval
//! until it holds or the deadline passes. A timeout reports what was awaited
//! and the last thing observed, never just "false".

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::error::{VerifyError, VerifyResult};
use crate::locator::{resolve, ElementLocator, Matcher};
use crate::session::PageSession;

/// Something that must become true
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// First resolved element is laid out and not hidden
    Visible,

    /// First resolved element's rendered text contains the substring
    HasText(String),

    /// Full current URL, fragment included
    HasUrl(Matcher),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Visible => f.write_str("to be visible"),
            Condition::HasText(text) => write!(f, "to contain text \"{}\"", text),
            Condition::HasUrl(matcher) => write!(f, "to have URL {}", matcher),
        }
    }
}

/// What a condition is evaluated against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<ElementLocator>", into = "Option<ElementLocator>")]
pub enum Target {
    Element(ElementLocator),
    #[default]
    Page,
}

impl From<Option<ElementLocator>> for Target {
    fn from(locator: Option<ElementLocator>) -> Self {
        locator.map(Target::Element).unwrap_or(Target::Page)
    }
}

impl From<Target> for Option<ElementLocator> {
    fn from(target: Target) -> Self {
        match target {
            Target::Element(locator) => Some(locator),
            Target::Page => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Element(locator) => write!(f, "{}", locator),
            Target::Page => f.write_str("page"),
        }
    }
}

/// Timeout and polling interval for a wait
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            interval: Duration::from_millis(100),
        }
    }
}

enum Check {
    Satisfied(String),
    Pending(String),
}

/// Reject target/condition pairs that can never be evaluated
pub fn check_compatible(target: &Target, condition: &Condition) -> VerifyResult<()> {
    match (target, condition) {
        (Target::Element(_), Condition::Visible | Condition::HasText(_)) => Ok(()),
        (Target::Page, Condition::HasUrl(_)) => Ok(()),
        _ => Err(VerifyError::InvalidAssertion(format!(
            "{} cannot be expected {}",
            target, condition
        ))),
    }
}

/// Poll until `condition` holds for `target` or `policy.timeout` elapses.
///
/// Each evaluation is itself bounded by the remaining time, so a stalled
/// driver call cannot push the failure past the deadline.
///
/// Returns a description of the state that satisfied the condition.
pub async fn wait_for(
    session: &mut PageSession,
    target: &Target,
    condition: &Condition,
    policy: WaitPolicy,
) -> VerifyResult<String> {
    check_compatible(target, condition)?;

    let awaited = format!("{} {}", target, condition);
    let deadline = deadline_after(policy.timeout);
    let mut last_observed = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let observed = match timeout(remaining, evaluate(session, target, condition)).await {
            Ok(check) => match check? {
                Check::Satisfied(observed) => {
                    debug!("Satisfied: {} ({})", awaited, observed);
                    return Ok(observed);
                }
                Check::Pending(observed) => observed,
            },
            Err(_) => {
                let in_flight = match last_observed {
                    Some(previous) => format!("{}; evaluation still in flight", previous),
                    None => "evaluation still in flight".to_string(),
                };
                return Err(timed_out(awaited, in_flight, policy));
            }
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(awaited, observed, policy));
        }
        last_observed = Some(observed);

        sleep(policy.interval.min(deadline - now)).await;
    }
}

fn timed_out(awaited: String, last_observed: String, policy: WaitPolicy) -> VerifyError {
    VerifyError::TimeoutExceeded {
        awaited,
        last_observed,
        timeout_ms: policy.timeout.as_millis() as u64,
    }
}

/// `now + limit`, saturating to a far-future instant for huge limits
pub(crate) fn deadline_after(limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(limit)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

async fn evaluate(
    session: &mut PageSession,
    target: &Target,
    condition: &Condition,
) -> VerifyResult<Check> {
    match (target, condition) {
        (Target::Element(locator), Condition::Visible) => {
            let handles = match settle(resolve(session, locator).await)? {
                Ok(handles) => handles,
                Err(pending) => return Ok(pending),
            };
            let Some(first) = handles.first() else {
                return Ok(Check::Pending(format!("no elements matched {}", locator)));
            };
            if first.is_visible() {
                Ok(Check::Satisfied(first.describe()))
            } else {
                Ok(Check::Pending(format!(
                    "{} element(s), first is not visible: {}",
                    handles.len(),
                    first.describe()
                )))
            }
        }
        (Target::Element(locator), Condition::HasText(expected)) => {
            let handles = match settle(resolve(session, locator).await)? {
                Ok(handles) => handles,
                Err(pending) => return Ok(pending),
            };
            let Some(first) = handles.first() else {
                return Ok(Check::Pending(format!("no elements matched {}", locator)));
            };
            if first.text().contains(expected.as_str()) {
                Ok(Check::Satisfied(first.describe()))
            } else {
                Ok(Check::Pending(format!("text was \"{}\"", clip(first.text(), 120))))
            }
        }
        (Target::Page, Condition::HasUrl(matcher)) => {
            let url = match settle(session.current_url().await)? {
                Ok(url) => url,
                Err(pending) => return Ok(pending),
            };
            let expected = match matcher {
                Matcher::Exact(path) => Matcher::Exact(session.absolute_url(path)),
                other => other.clone(),
            };
            if expected.matches(&url) {
                Ok(Check::Satisfied(format!("url {}", url)))
            } else {
                Ok(Check::Pending(format!("url was {}", url)))
            }
        }
        _ => Err(VerifyError::InvalidAssertion(format!(
            "{} cannot be expected {}",
            target, condition
        ))),
    }
}

/// Driver errors while the page settles count as "not yet"
fn settle<T>(result: VerifyResult<T>) -> VerifyResult<Result<T, Check>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(VerifyError::Driver(reason)) => {
            Ok(Err(Check::Pending(format!("driver error: {}", reason))))
        }
        Err(e) => Err(e),
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    }
}
