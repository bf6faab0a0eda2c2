//! `cdk`-driven stack provider

use super::{StackOperations, StackParams};
use crate::aws::{CloudFormationClient, StackSummaryRow};
use crate::cleanup::CleanupResult;
use crate::command::{CommandConfig, run_checked};
use anyhow::{Context, Result};
use pipewatch_common::StackUnit;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};

/// Stack provider backed by the `cdk` CLI and CloudFormation
pub struct CdkStackProvider {
    cdk_dir: PathBuf,
    cloudformation: CloudFormationClient,
    region: String,
    profile: Option<String>,
    delete_timeout: Duration,
}

impl CdkStackProvider {
    pub fn new(
        cdk_dir: impl Into<PathBuf>,
        cloudformation: CloudFormationClient,
        region: &str,
        profile: Option<String>,
        delete_timeout: Duration,
    ) -> Self {
        Self {
            cdk_dir: cdk_dir.into(),
            cloudformation,
            region: region.to_string(),
            profile,
            delete_timeout,
        }
    }

    /// Arguments for `cdk deploy`
    pub fn deploy_args(units: &[StackUnit], params: &StackParams, profile: Option<&str>) -> Vec<String> {
        let mut args = vec!["deploy".to_string()];
        args.extend(units.iter().map(|unit| unit.name().to_string()));
        args.extend(["--require-approval".to_string(), "never".to_string()]);
        for (key, value) in &params.context {
            args.push("--context".to_string());
            args.push(format!("{key}={value}"));
        }
        if let Some(profile) = profile {
            args.push("--profile".to_string());
            args.push(profile.to_string());
        }
        args
    }

    fn command_config(&self) -> CommandConfig {
        CommandConfig::in_dir(&self.cdk_dir)
            .env("AWS_REGION", &self.region)
            .env("AWS_DEFAULT_REGION", &self.region)
            .env("CDK_DEFAULT_REGION", &self.region)
    }
}

impl StackOperations for CdkStackProvider {
    #[instrument(skip_all, fields(units = ?units))]
    async fn create(&self, units: &[StackUnit], params: &StackParams) -> Result<()> {
        let args = Self::deploy_args(units, params, self.profile.as_deref());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        run_checked("cdk", &args, &self.command_config())
            .await
            .context("cdk deploy failed")?;

        info!(units = ?units, "Stacks deployed");
        Ok(())
    }

    #[instrument(skip(self), fields(stack = %unit))]
    async fn destroy(&self, unit: StackUnit) -> Result<CleanupResult> {
        let name = unit.name();
        if self.cloudformation.stack_status(name).await?.is_none() {
            info!(stack = %name, "Stack does not exist, skipping");
            return Ok(CleanupResult::AlreadyDeleted);
        }

        self.cloudformation.delete_stack(name).await?;
        self.cloudformation
            .wait_for_deleted(name, self.delete_timeout)
            .await?;

        info!(stack = %name, "Stack deleted");
        Ok(CleanupResult::Deleted)
    }

    async fn list_remaining(&self) -> Result<Vec<StackSummaryRow>> {
        let prefixes: Vec<&str> = StackUnit::ALL.iter().map(|unit| unit.prefix()).collect();
        self.cloudformation.list_stacks_with_prefixes(&prefixes).await
    }
}
