//! Scenario model and YAML scenario files

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{VerifyError, VerifyResult};
use crate::locator::ElementLocator;
use crate::wait::{check_compatible, Condition, Target};

/// A named, ordered list of steps verifying one user-facing behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL (root-relative paths join the base URL)
    Navigate { url: String },

    /// Click the first element the locator resolves to
    Click { locator: ElementLocator },

    /// Wait for a condition on an element, or on the page when no locator is given
    Assert {
        #[serde(default, rename = "locator")]
        target: Target,
        condition: Condition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Full-page screenshot. `path` overrides the evidence store layout;
    /// keeping such paths distinct is then up to the scenario author.
    Capture {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
}

impl Step {
    pub fn navigate(url: impl Into<String>) -> Self {
        Step::Navigate { url: url.into() }
    }

    pub fn click(locator: ElementLocator) -> Self {
        Step::Click { locator }
    }

    pub fn expect_visible(locator: ElementLocator) -> Self {
        Step::Assert {
            target: Target::Element(locator),
            condition: Condition::Visible,
            timeout_ms: None,
        }
    }

    pub fn expect_text(locator: ElementLocator, text: impl Into<String>) -> Self {
        Step::Assert {
            target: Target::Element(locator),
            condition: Condition::HasText(text.into()),
            timeout_ms: None,
        }
    }

    /// Exact URL; root-relative expectations are joined onto the base URL
    pub fn expect_url(url: impl Into<String>) -> Self {
        Step::Assert {
            target: Target::Page,
            condition: Condition::HasUrl(crate::locator::Matcher::exact(url)),
            timeout_ms: None,
        }
    }

    pub fn capture(name: impl Into<String>) -> Self {
        Step::Capture {
            name: name.into(),
            path: None,
        }
    }

    /// Screenshot written to exactly `path`
    pub fn capture_to(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Step::Capture {
            name: name.into(),
            path: Some(path.into()),
        }
    }

    /// Override the assertion timeout; other steps are returned unchanged
    pub fn within_ms(self, ms: u64) -> Self {
        match self {
            Step::Assert { target, condition, .. } => Step::Assert {
                target,
                condition,
                timeout_ms: Some(ms),
            },
            other => other,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { url } => write!(f, "navigate:{}", url),
            Step::Click { locator } => write!(f, "click:{}", locator),
            Step::Assert { target, condition, .. } => write!(f, "assert:{} {}", target, condition),
            Step::Capture { name, .. } => write!(f, "capture:{}", name),
        }
    }
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// A runnable scenario is non-empty, starts by navigating, and pairs every
    /// assertion target with a condition it supports.
    pub fn validate(&self) -> VerifyResult<()> {
        let invalid = |reason: String| VerifyError::InvalidScenario {
            name: self.name.clone(),
            reason,
        };

        match self.steps.first() {
            None => return Err(invalid("no steps".to_string())),
            Some(Step::Navigate { .. }) => {}
            Some(other) => {
                return Err(invalid(format!("first step must navigate, found {}", other)))
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            if let Step::Assert { target, condition, .. } = step {
                check_compatible(target, condition)
                    .map_err(|e| invalid(format!("step {}: {}", index, e)))?;
            }
        }

        Ok(())
    }

    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        serde_yaml::from_str(yaml).map_err(VerifyError::from)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> VerifyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| VerifyError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by file path
    pub fn load_all(dir: &Path) -> VerifyResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}
