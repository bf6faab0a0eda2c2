//! CloudFormation stack lookups, deletion and listing

use crate::aws::context::AwsContext;
use crate::aws::error::AwsError;
use crate::wait::{WaitConfig, wait_for_resource};
use anyhow::{Context, Result};
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::types::StackStatus;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// CloudFormation client for pipewatch stacks
pub struct CloudFormationClient {
    client: Client,
    region: String,
}

/// One row of a stack listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSummaryRow {
    pub name: String,
    pub status: String,
    pub created: Option<DateTime<Utc>>,
}

impl CloudFormationClient {
    /// Create a new CloudFormation client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create a CloudFormation client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.cloudformation_client(),
            region: ctx.region().to_string(),
        }
    }

    /// Current status of a stack, or `None` if it does not exist
    ///
    /// Stacks in `DELETE_COMPLETE` are reported as absent.
    pub async fn stack_status(&self, name: &str) -> Result<Option<String>> {
        let result = self.client.describe_stacks().stack_name(name).send().await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let err = AwsError::from_sdk(&e);
                if err.is_not_found() {
                    return Ok(None);
                }
                return Err(err).context(format!("Failed to describe stack {name}"));
            }
        };

        let Some(stack) = response.stacks().first() else {
            return Ok(None);
        };
        let status: Option<&StackStatus> = stack.stack_status().into();

        match status {
            Some(StackStatus::DeleteComplete) => Ok(None),
            Some(status) => Ok(Some(status.as_str().to_string())),
            None => Ok(Some("UNKNOWN".to_string())),
        }
    }

    /// Output values of a stack, keyed by output name
    pub async fn stack_outputs(&self, name: &str) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .describe_stacks()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context(format!("Failed to describe stack {name}"))?;

        let stack = response
            .stacks()
            .first()
            .with_context(|| format!("Stack {name} not found"))?;

        Ok(stack
            .outputs()
            .iter()
            .filter_map(|output| {
                Some((
                    output.output_key()?.to_string(),
                    output.output_value()?.to_string(),
                ))
            })
            .collect())
    }

    /// Request deletion of a stack
    pub async fn delete_stack(&self, name: &str) -> Result<()> {
        info!(stack = %name, region = %self.region, "Deleting stack");

        self.client
            .delete_stack()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context(format!("Failed to delete stack {name}"))?;

        Ok(())
    }

    /// Wait until a stack is gone
    ///
    /// Fails as soon as the stack reports `DELETE_FAILED`.
    pub async fn wait_for_deleted(&self, name: &str, timeout: Duration) -> Result<()> {
        wait_for_resource(
            WaitConfig::default().with_timeout(timeout),
            move || async move {
                match self.stack_status(name).await? {
                    None => Ok(true),
                    Some(status) if status == StackStatus::DeleteFailed.as_str() => {
                        anyhow::bail!("Stack {name} reached {status}")
                    }
                    Some(status) => {
                        debug!(stack = %name, status = %status, "Stack still present");
                        Ok(false)
                    }
                }
            },
            name,
        )
        .await
    }

    /// List live stacks whose names start with any of `prefixes`
    pub async fn list_stacks_with_prefixes(
        &self,
        prefixes: &[&str],
    ) -> Result<Vec<StackSummaryRow>> {
        let mut rows = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.list_stacks();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e))
                .context("Failed to list stacks")?;

            for summary in response.stack_summaries() {
                let name: Option<&str> = summary.stack_name().into();
                let status: Option<&StackStatus> = summary.stack_status().into();
                let (Some(name), Some(status)) = (name, status) else {
                    continue;
                };
                if *status == StackStatus::DeleteComplete
                    || !prefixes.iter().any(|p| name.starts_with(p))
                {
                    continue;
                }

                let created: Option<&aws_sdk_cloudformation::primitives::DateTime> =
                    summary.creation_time().into();
                rows.push(StackSummaryRow {
                    name: name.to_string(),
                    status: status.as_str().to_string(),
                    created: created.and_then(|t| DateTime::from_timestamp(t.secs(), 0)),
                });
            }

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}
