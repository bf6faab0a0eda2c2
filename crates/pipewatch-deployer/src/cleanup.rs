//! Outcome of deleting a single resource

use pipewatch_common::StepResult;

/// Result of a single resource cleanup operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupResult {
    /// Resource was successfully deleted
    Deleted,
    /// Resource was already deleted (not found)
    AlreadyDeleted,
}

impl CleanupResult {
    /// Convert into a report entry for `step`
    pub fn into_step(self, step: impl Into<String>) -> StepResult {
        match self {
            CleanupResult::Deleted => StepResult::ok(step),
            CleanupResult::AlreadyDeleted => StepResult::skipped(step, "not found"),
        }
    }
}
