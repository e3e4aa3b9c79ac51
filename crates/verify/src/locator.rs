//! Locating elements by accessible role, name and text
//!
//! Locators are descriptions, not handles. Every [`resolve`] call takes a new
//! accessibility snapshot, so a locator stays valid across page mutations.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::driver::AxNode;
use crate::error::{VerifyError, VerifyResult};
use crate::session::PageSession;

/// Accessibility roles the harness can query by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    Link,
    Button,
    Dialog,
    Heading,
    Navigation,
    Main,
    Tab,
    Tabpanel,
    Menuitem,
    List,
    Listitem,
    Textbox,
    Checkbox,
    Radio,
    Combobox,
    Img,
    Region,
    Alert,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Link => "link",
            Role::Button => "button",
            Role::Dialog => "dialog",
            Role::Heading => "heading",
            Role::Navigation => "navigation",
            Role::Main => "main",
            Role::Tab => "tab",
            Role::Tabpanel => "tabpanel",
            Role::Menuitem => "menuitem",
            Role::List => "list",
            Role::Listitem => "listitem",
            Role::Textbox => "textbox",
            Role::Checkbox => "checkbox",
            Role::Radio => "radio",
            Role::Combobox => "combobox",
            Role::Img => "img",
            Role::Region => "region",
            Role::Alert => "alert",
        }
    }

    fn matches(&self, role: Option<&str>) -> bool {
        role.map(|r| r.eq_ignore_ascii_case(self.as_str()))
            .unwrap_or(false)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = VerifyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for Role {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = match s.trim().to_ascii_lowercase().as_str() {
            "link" => Role::Link,
            "button" => Role::Button,
            "dialog" => Role::Dialog,
            "heading" => Role::Heading,
            "navigation" => Role::Navigation,
            "main" => Role::Main,
            "tab" => Role::Tab,
            "tabpanel" => Role::Tabpanel,
            "menuitem" => Role::Menuitem,
            "list" => Role::List,
            "listitem" => Role::Listitem,
            "textbox" => Role::Textbox,
            "checkbox" => Role::Checkbox,
            "radio" => Role::Radio,
            "combobox" => Role::Combobox,
            "img" => Role::Img,
            "region" => Role::Region,
            "alert" => Role::Alert,
            other => return Err(VerifyError::SpecParse(format!("Unknown role: {}", other))),
        };
        Ok(role)
    }
}

/// How a name, text or URL is compared.
///
/// `Exact` compares against the whitespace-collapsed value, case-sensitive.
/// `Contains` and `Pattern` succeed on any matching substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MatcherRepr", into = "MatcherRepr")]
pub enum Matcher {
    Exact(String),
    Contains(String),
    Pattern(Regex),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MatcherRepr {
    Exact(String),
    Contains { contains: String },
    Pattern { pattern: String },
}

impl TryFrom<MatcherRepr> for Matcher {
    type Error = regex::Error;

    fn try_from(repr: MatcherRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            MatcherRepr::Exact(s) => Matcher::Exact(s),
            MatcherRepr::Contains { contains } => Matcher::Contains(contains),
            MatcherRepr::Pattern { pattern } => Matcher::Pattern(Regex::new(&pattern)?),
        })
    }
}

impl From<Matcher> for MatcherRepr {
    fn from(matcher: Matcher) -> Self {
        match matcher {
            Matcher::Exact(s) => MatcherRepr::Exact(s),
            Matcher::Contains(contains) => MatcherRepr::Contains { contains },
            Matcher::Pattern(re) => MatcherRepr::Pattern {
                pattern: re.as_str().to_string(),
            },
        }
    }
}

impl Matcher {
    pub fn exact(s: impl Into<String>) -> Self {
        Matcher::Exact(s.into())
    }

    pub fn contains(s: impl Into<String>) -> Self {
        Matcher::Contains(s.into())
    }

    pub fn pattern(pattern: &str) -> VerifyResult<Self> {
        Ok(Matcher::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Exact(expected) => normalize(value) == *expected,
            Matcher::Contains(needle) => normalize(value).contains(needle.as_str()),
            Matcher::Pattern(re) => re.is_match(value),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::Exact(a), Matcher::Exact(b)) => a == b,
            (Matcher::Contains(a), Matcher::Contains(b)) => a == b,
            (Matcher::Pattern(a), Matcher::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(s) => write!(f, "\"{}\"", s),
            Matcher::Contains(s) => write!(f, "containing \"{}\"", s),
            Matcher::Pattern(re) => write!(f, "matching /{}/", re.as_str()),
        }
    }
}

/// Collapse runs of whitespace and trim, the way accessible names are computed
pub fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Declarative, re-evaluatable element description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementLocator {
    /// Elements with `role`, optionally filtered by accessible name
    Role {
        role: Role,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<Matcher>,
    },

    /// Innermost elements whose rendered text matches
    Text { text: Matcher },
}

impl ElementLocator {
    pub fn role(role: Role) -> Self {
        ElementLocator::Role { role, name: None }
    }

    pub fn named(role: Role, name: impl Into<String>) -> Self {
        ElementLocator::Role {
            role,
            name: Some(Matcher::exact(name)),
        }
    }

    pub fn matching(role: Role, pattern: &str) -> VerifyResult<Self> {
        Ok(ElementLocator::Role {
            role,
            name: Some(Matcher::pattern(pattern)?),
        })
    }

    pub fn link(name: impl Into<String>) -> Self {
        Self::named(Role::Link, name)
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self::named(Role::Button, name)
    }

    /// Visible text lookup, substring semantics
    pub fn text(text: impl Into<String>) -> Self {
        ElementLocator::Text {
            text: Matcher::contains(text),
        }
    }
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementLocator::Role { role, name: Some(name) } => write!(f, "{} named {}", role, name),
            ElementLocator::Role { role, name: None } => write!(f, "{}", role),
            ElementLocator::Text { text } => write!(f, "text {}", text),
        }
    }
}

/// A resolved element, valid until the page mutates
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle {
    node: AxNode,
}

impl ElementHandle {
    pub fn id(&self) -> u64 {
        self.node.id
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn text(&self) -> &str {
        &self.node.text
    }

    pub fn is_visible(&self) -> bool {
        self.node.is_visible()
    }

    /// Short human-readable state, used in failure reports
    pub fn describe(&self) -> String {
        let role = self.node.role.as_deref().unwrap_or("generic");
        let mut out = format!(
            "{} \"{}\" {}x{}",
            role, self.node.name, self.node.width, self.node.height
        );
        if self.node.hidden {
            out.push_str(" hidden");
        }
        out
    }
}

/// Resolve a locator against the live page.
///
/// An empty result is not an error; callers decide whether absence matters.
pub async fn resolve(
    session: &mut PageSession,
    locator: &ElementLocator,
) -> VerifyResult<Vec<ElementHandle>> {
    let nodes = session.snapshot().await?;
    Ok(resolve_in(&nodes, locator))
}

/// Resolve a locator against an already captured snapshot, in document order
pub fn resolve_in(nodes: &[AxNode], locator: &ElementLocator) -> Vec<ElementHandle> {
    let matched: Vec<&AxNode> = match locator {
        ElementLocator::Role { role, name } => nodes
            .iter()
            .filter(|n| role.matches(n.role.as_deref()))
            .filter(|n| name.as_ref().map(|m| m.matches(&n.name)).unwrap_or(true))
            .collect(),
        ElementLocator::Text { text } => innermost(
            nodes
                .iter()
                .filter(|n| !n.text.is_empty() && text.matches(&n.text))
                .collect(),
            nodes,
        ),
    };

    matched
        .into_iter()
        .map(|node| ElementHandle { node: node.clone() })
        .collect()
}

/// Drop every match that has another match below it
fn innermost<'a>(matched: Vec<&'a AxNode>, nodes: &[AxNode]) -> Vec<&'a AxNode> {
    let parents: HashMap<u64, Option<u64>> = nodes.iter().map(|n| (n.id, n.parent)).collect();
    let matched_ids: HashSet<u64> = matched.iter().map(|n| n.id).collect();

    let mut shadowed = HashSet::new();
    for node in &matched {
        let mut cursor = node.parent;
        while let Some(id) = cursor {
            if matched_ids.contains(&id) && !shadowed.insert(id) {
                break;
            }
            cursor = parents.get(&id).copied().flatten();
        }
    }

    matched
        .into_iter()
        .filter(|n| !shadowed.contains(&n.id))
        .collect()
}
