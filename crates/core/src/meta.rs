//! Descriptive metadata for reporting
//!
//! Meta carries the epic/feature/story style labels that report exporters and
//! tag filters consume. The engine itself only merges and normalizes it.

use crate::traits::{Join, Normalize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Test severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the release
    Blocker,
    /// Critical path
    Critical,
    /// Default severity
    #[default]
    Normal,
    /// Minor impact
    Minor,
    /// Cosmetic
    Trivial,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Blocker => "blocker",
            Severity::Critical => "critical",
            Severity::Normal => "normal",
            Severity::Minor => "minor",
            Severity::Trivial => "trivial",
        };
        write!(f, "{}", s)
    }
}

/// Reporting metadata
///
/// Join semantics:
/// - scalar fields override only when the incoming value is non-empty
/// - `tags`, `issues` and `test_cases` concatenate, duplicates kept
/// - `labels` merge per key, incoming wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub epic: String,
    pub suite: String,
    pub story: String,
    pub layer: String,
    pub feature: String,
    pub sub_suite: String,
    pub parent_suite: String,
    /// `None` until set or normalized
    pub severity: Option<Severity>,
    pub tags: Vec<String>,
    pub issues: Vec<String>,
    pub test_cases: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl Meta {
    /// Empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epic(mut self, epic: impl Into<String>) -> Self {
        self.epic = epic.into();
        self
    }

    pub fn suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = suite.into();
        self
    }

    pub fn story(mut self, story: impl Into<String>) -> Self {
        self.story = story.into();
        self
    }

    pub fn layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = feature.into();
        self
    }

    pub fn sub_suite(mut self, sub_suite: impl Into<String>) -> Self {
        self.sub_suite = sub_suite.into();
        self
    }

    pub fn parent_suite(mut self, parent_suite: impl Into<String>) -> Self {
        self.parent_suite = parent_suite.into();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    pub fn issues<I, S>(mut self, issues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issues.extend(issues.into_iter().map(Into::into));
        self
    }

    pub fn test_case(mut self, test_case: impl Into<String>) -> Self {
        self.test_cases.push(test_case.into());
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Whether any tag equals `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

fn override_str(base: &mut String, incoming: &str) {
    if !incoming.is_empty() {
        *base = incoming.to_string();
    }
}

impl Join for Meta {
    fn join(&self, other: &Self) -> Self {
        let mut result = self.clone();

        override_str(&mut result.epic, &other.epic);
        override_str(&mut result.suite, &other.suite);
        override_str(&mut result.story, &other.story);
        override_str(&mut result.layer, &other.layer);
        override_str(&mut result.feature, &other.feature);
        override_str(&mut result.sub_suite, &other.sub_suite);
        override_str(&mut result.parent_suite, &other.parent_suite);
        if other.severity.is_some() {
            result.severity = other.severity;
        }

        result.tags.extend(other.tags.iter().cloned());
        result.issues.extend(other.issues.iter().cloned());
        result.test_cases.extend(other.test_cases.iter().cloned());
        result
            .labels
            .extend(other.labels.iter().map(|(k, v)| (k.clone(), v.clone())));

        result
    }
}

impl Normalize for Meta {
    fn normalize(&mut self) {
        if self.severity.is_none() {
            self.severity = Some(Severity::default());
        }
    }
}
