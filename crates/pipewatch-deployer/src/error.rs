//! Error types for the deployer

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions checked once before any step runs
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("required tool '{tool}' was not found on PATH")]
    MissingTool { tool: String },

    #[error("required path {} does not exist", path.display())]
    MissingPath { path: PathBuf },

    #[error("invalid notification config {}: {reason}", path.display())]
    InvalidNotificationConfig { path: PathBuf, reason: String },

    #[error("AWS credentials are missing or invalid: {reason}")]
    MissingCredentials { reason: String },
}

/// Named steps of a deployment, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployStep {
    ResolvePipeline,
    CreateFoundation,
    DeployRuntime,
    AssembleArn,
    CreateRequestHandler,
}

impl DeployStep {
    pub const ALL: [DeployStep; 5] = [
        DeployStep::ResolvePipeline,
        DeployStep::CreateFoundation,
        DeployStep::DeployRuntime,
        DeployStep::AssembleArn,
        DeployStep::CreateRequestHandler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStep::ResolvePipeline => "resolve pipeline configuration",
            DeployStep::CreateFoundation => "create foundation stacks",
            DeployStep::DeployRuntime => "deploy agent runtime",
            DeployStep::AssembleArn => "assemble runtime ARN",
            DeployStep::CreateRequestHandler => "create request handler stack",
        }
    }

    /// 1-based position in the deployment sequence
    pub fn number(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or_default()
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that end an orchestration run
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("step {} ({step}) failed", step.number())]
    Step {
        step: DeployStep,
        #[source]
        source: anyhow::Error,
    },
}

impl OrchestratorError {
    pub fn step(step: DeployStep, source: impl Into<anyhow::Error>) -> Self {
        OrchestratorError::Step {
            step,
            source: source.into(),
        }
    }

    /// The deployment step that failed, if any
    pub fn failed_step(&self) -> Option<DeployStep> {
        match self {
            OrchestratorError::Step { step, .. } => Some(*step),
            OrchestratorError::Precondition(_) => None,
        }
    }
}

/// Registry cleanup failures
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Every deletion strategy was tried and the registry still exists
    #[error("registry '{name}' could not be deleted")]
    DeleteFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Batch size outside the service limit
    #[error("image batch size {size} is outside 1..={max}")]
    InvalidBatchSize { size: usize, max: usize },
}

/// Identifier store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access identifier store {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("identifier store {} is not valid JSON", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_numbers() {
        assert_eq!(DeployStep::ResolvePipeline.number(), 1);
        assert_eq!(DeployStep::CreateRequestHandler.number(), 5);
    }

    #[test]
    fn test_step_error_names_step() {
        let err = OrchestratorError::step(DeployStep::CreateFoundation, anyhow::anyhow!("cdk failed"));
        assert_eq!(err.to_string(), "step 2 (create foundation stacks) failed");
        assert_eq!(err.failed_step(), Some(DeployStep::CreateFoundation));
    }
}
