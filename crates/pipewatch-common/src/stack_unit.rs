//! Infrastructure stack units and their teardown ordering
//!
//! Every pipewatch environment is made of four independently deployable
//! stacks. Units must be created after everything they depend on and
//! destroyed before it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named infrastructure units managed by pipewatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StackUnit {
    /// CloudTrail, log groups and event rules for the watched pipeline
    PipelineLogger,
    /// Secrets store holding repository credentials
    SecretManager,
    /// Agent runtime role and the container registry
    AgentCore,
    /// Request-handling function (needs the runtime ARN)
    MainLambda,
}

impl StackUnit {
    /// All units, in creation order
    pub const ALL: [StackUnit; 4] = [
        StackUnit::PipelineLogger,
        StackUnit::SecretManager,
        StackUnit::AgentCore,
        StackUnit::MainLambda,
    ];

    /// Units created together in the first deployment batch
    pub const FOUNDATION: [StackUnit; 3] = [
        StackUnit::PipelineLogger,
        StackUnit::SecretManager,
        StackUnit::AgentCore,
    ];

    /// CloudFormation stack name
    pub fn name(self) -> &'static str {
        match self {
            StackUnit::PipelineLogger => "PipelineLoggerStack",
            StackUnit::SecretManager => "SecretManagerStack",
            StackUnit::AgentCore => "AgentCoreStack",
            StackUnit::MainLambda => "MainLambdaStack",
        }
    }

    /// Name prefix used when listing leftover stacks
    pub fn prefix(self) -> &'static str {
        match self {
            StackUnit::PipelineLogger => "PipelineLogger",
            StackUnit::SecretManager => "SecretManager",
            StackUnit::AgentCore => "AgentCore",
            StackUnit::MainLambda => "MainLambda",
        }
    }

    /// Parse a unit from its stack name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.name() == name)
    }

    /// Units that must be active before this one may be created
    pub fn depends_on(self) -> &'static [StackUnit] {
        match self {
            StackUnit::PipelineLogger | StackUnit::SecretManager => &[],
            StackUnit::AgentCore => &[StackUnit::SecretManager],
            StackUnit::MainLambda => &[
                StackUnit::PipelineLogger,
                StackUnit::SecretManager,
                StackUnit::AgentCore,
            ],
        }
    }

    /// Depth in the dependency graph (0 = no dependencies)
    pub fn depth(self) -> usize {
        self.depends_on()
            .iter()
            .map(|dep| dep.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Get teardown priority (lower number = destroy first)
    ///
    /// The deepest unit goes first; units at the same depth keep the
    /// reverse of their creation order, so the agent runtime stack is
    /// destroyed before the secrets and logging stacks.
    pub fn teardown_priority(self) -> (usize, usize) {
        let position = Self::ALL
            .iter()
            .position(|unit| *unit == self)
            .unwrap_or_default();
        (usize::MAX - self.depth(), usize::MAX - position)
    }

    /// All units in the order they must be destroyed
    pub fn teardown_order() -> Vec<StackUnit> {
        let mut units = Self::ALL.to_vec();
        units.sort_by_key(|unit| unit.teardown_priority());
        units
    }

    /// Whether `name` looks like a stack owned by pipewatch
    pub fn matches_known_prefix(name: &str) -> bool {
        Self::ALL.iter().any(|unit| name.starts_with(unit.prefix()))
    }
}

impl fmt::Display for StackUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a stack unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    #[default]
    Absent,
    Creating,
    Active,
    Destroying,
    DestroyFailed,
}

impl StackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackState::Absent => "absent",
            StackState::Creating => "creating",
            StackState::Active => "active",
            StackState::Destroying => "destroying",
            StackState::DestroyFailed => "destroy_failed",
        }
    }

    /// Check whether moving to `next` is a legal lifecycle step
    ///
    /// A failed create falls back to `Absent`; a failed destroy can be
    /// retried from `DestroyFailed`.
    pub fn can_transition_to(self, next: StackState) -> bool {
        use StackState::*;
        matches!(
            (self, next),
            (Absent, Creating)
                | (Creating, Active)
                | (Creating, Absent)
                | (Active, Creating)
                | (Active, Destroying)
                | (Absent, Destroying)
                | (Destroying, Absent)
                | (Destroying, DestroyFailed)
                | (DestroyFailed, Destroying)
        )
    }
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
