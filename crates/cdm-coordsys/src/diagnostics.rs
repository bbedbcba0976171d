//! Structured build diagnostics.
//!
//! Every pass records what it did (the parse trace) and what looked wrong
//! (user advice). Entries never influence control flow; they are returned
//! with the build result and mirrored to `tracing`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Build stage that produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Convention,
    Classify,
    FindAxes,
    FindSystems,
    FindTransforms,
    MakeAxes,
    MakeSystems,
    AssignExplicit,
    AssignImplicit,
    AssignMaximal,
    Transforms,
}

impl Pass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Convention => "convention",
            Self::Classify => "classify",
            Self::FindAxes => "find_axes",
            Self::FindSystems => "find_systems",
            Self::FindTransforms => "find_transforms",
            Self::MakeAxes => "make_axes",
            Self::MakeSystems => "make_systems",
            Self::AssignExplicit => "assign_explicit",
            Self::AssignImplicit => "assign_implicit",
            Self::AssignMaximal => "assign_maximal",
            Self::Transforms => "transforms",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `Trace` entries appear only in the parse trace; `Advice` entries appear
/// in both logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Trace,
    Advice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub pass: Pass,
    pub severity: Severity,
    pub message: String,
}

/// Ordered diagnostic log of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<DiagnosticEntry>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parse-trace line.
    pub fn trace(&mut self, pass: Pass, message: impl Into<String>) {
        let message = message.into();
        debug!(pass = %pass, "{}", message);
        self.entries.push(DiagnosticEntry {
            pass,
            severity: Severity::Trace,
            message,
        });
    }

    /// Record an actionable problem.
    pub fn advise(&mut self, pass: Pass, message: impl Into<String>) {
        let message = message.into();
        warn!(pass = %pass, "{}", message);
        self.entries.push(DiagnosticEntry {
            pass,
            severity: Severity::Advice,
            message,
        });
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    pub fn advisories(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Advice)
    }

    /// Check if any advisory message contains `needle`.
    pub fn has_advice(&self, needle: &str) -> bool {
        self.advisories().any(|e| e.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full parse trace, one line per entry.
    pub fn parse_info(&self) -> String {
        self.render(|_| true)
    }

    /// User advice log, one line per advisory.
    pub fn user_advice(&self) -> String {
        self.render(|e| e.severity == Severity::Advice)
    }

    fn render(&self, keep: impl Fn(&DiagnosticEntry) -> bool) -> String {
        let mut out = String::new();
        for entry in self.entries.iter().filter(|e| keep(e)) {
            out.push_str(&entry.message);
            out.push('\n');
        }
        out
    }

    /// Serialize all entries as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_logs() {
        let mut diag = Diagnostics::new();
        diag.trace(Pass::FindAxes, "CoordinateAxis = lat added");
        diag.advise(Pass::FindAxes, "Cant find coordinate axis foo referenced from var= bar");

        assert_eq!(diag.len(), 2);
        assert_eq!(diag.parse_info().lines().count(), 2);
        assert_eq!(
            diag.user_advice(),
            "Cant find coordinate axis foo referenced from var= bar\n"
        );
        assert!(diag.has_advice("foo"));
        assert!(!diag.has_advice("lat"));
    }

    #[test]
    fn test_json_dump() {
        let mut diag = Diagnostics::new();
        diag.advise(Pass::AssignMaximal, "x");
        let json = diag.to_json().unwrap();
        assert!(json.contains("\"assign_maximal\""));
        assert!(json.contains("\"advice\""));
    }
}
