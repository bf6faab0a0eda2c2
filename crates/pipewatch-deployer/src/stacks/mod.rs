//! Infrastructure stack provisioning
//!
//! Stacks are created with the `cdk` CLI and destroyed directly through
//! CloudFormation, which tells us whether a stack was there at all.

mod cdk;

pub use cdk::CdkStackProvider;

use crate::aws::StackSummaryRow;
use crate::cleanup::CleanupResult;
use anyhow::Result;
use pipewatch_common::StackUnit;
use pipewatch_common::defaults::AGENT_ARN_CONTEXT_KEY;
use std::collections::BTreeMap;

/// Context values handed to the infrastructure project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackParams {
    pub context: BTreeMap<String, String>,
}

impl StackParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass the agent runtime ARN to the request handler stack
    pub fn with_agent_arn(mut self, arn: impl Into<String>) -> Self {
        self.context
            .insert(AGENT_ARN_CONTEXT_KEY.to_string(), arn.into());
        self
    }

    pub fn agent_arn(&self) -> Option<&str> {
        self.context.get(AGENT_ARN_CONTEXT_KEY).map(String::as_str)
    }
}

/// Creates and destroys stack units
#[allow(async_fn_in_trait)]
pub trait StackOperations: Send + Sync {
    /// Create or update `units` together
    async fn create(&self, units: &[StackUnit], params: &StackParams) -> Result<()>;

    /// Destroy one unit and wait until it is gone
    async fn destroy(&self, unit: StackUnit) -> Result<CleanupResult>;

    /// Live stacks whose names match a known unit prefix
    async fn list_remaining(&self) -> Result<Vec<StackSummaryRow>>;
}
