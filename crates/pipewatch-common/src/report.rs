//! Step outcomes for orchestration runs
//!
//! Each orchestration step produces one [`StepResult`]. Teardown collects
//! every result into a [`TeardownReport`] instead of stopping at the first
//! failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single orchestration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step did its work
    Ok,
    /// Nothing to do (resource never created or already gone)
    Skipped,
    /// The step failed; the run continued
    Failed,
}

impl StepOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::Ok => "ok",
            StepOutcome::Skipped => "skipped",
            StepOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one named step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name (e.g. "destroy MainLambdaStack")
    pub name: String,
    pub outcome: StepOutcome,
    /// Human-readable detail: error message, skip reason, or counts
    pub detail: Option<String>,
}

impl StepResult {
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StepOutcome::Ok,
            detail: None,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StepOutcome::Skipped,
            detail: Some(reason.into()),
        }
    }

    pub fn failed(name: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            outcome: StepOutcome::Failed,
            detail: Some(error.to_string()),
        }
    }

    /// Attach a detail message
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Ordered list of teardown step results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    pub steps: Vec<StepResult>,
}

impl TeardownReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    /// Count steps with the given outcome
    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }

    /// Steps that failed
    pub fn failures(&self) -> impl Iterator<Item = &StepResult> {
        self.steps
            .iter()
            .filter(|s| s.outcome == StepOutcome::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// True when no step had anything to do
    pub fn all_skipped(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.outcome == StepOutcome::Skipped)
    }

    /// Look up a step by name
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_failures() {
        let mut report = TeardownReport::new();
        report.push(StepResult::ok("a"));
        report.push(StepResult::skipped("b", "not found"));
        report.push(StepResult::failed("c", "boom"));

        assert_eq!(report.count(StepOutcome::Ok), 1);
        assert_eq!(report.count(StepOutcome::Skipped), 1);
        assert!(report.has_failures());
        assert!(!report.all_skipped());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.step("c").unwrap().detail.as_deref(), Some("boom"));
    }

    #[test]
    fn test_empty_report_is_not_all_skipped() {
        assert!(!TeardownReport::new().all_skipped());
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&StepOutcome::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
    }
}
