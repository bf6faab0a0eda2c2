//! Agent runtime deployment
//!
//! Builds the agent image, pushes it to the registry created by the
//! `AgentCoreStack`, and points an AgentCore runtime at it.

use crate::aws::error::is_not_found;
use crate::aws::{AgentCoreClient, CloudFormationClient, EcrClient, RuntimeSpec};
use crate::cleanup::CleanupResult;
use crate::command::{CommandConfig, run_checked};
use anyhow::{Context, Result};
use chrono::Utc;
use pipewatch_common::defaults::{AGENT_IMAGE_PLATFORM, AGENT_RUNTIME_NAME};
use pipewatch_common::{RuntimeIdentifier, StackUnit};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Stack output holding the registry URI
pub const OUTPUT_REPOSITORY_URI: &str = "ECRRepositoryURI";
/// Stack output holding the runtime execution role
pub const OUTPUT_ROLE_ARN: &str = "AgentRoleArn";
/// Stack output holding the secret name
pub const OUTPUT_SECRET_ID: &str = "SecretId";

/// Deploys and removes agent runtimes
#[allow(async_fn_in_trait)]
pub trait RuntimeOperations: Send + Sync {
    /// Build, push and deploy the agent
    ///
    /// `existing` is the identifier recorded by an earlier run, if any; the
    /// runtime is updated in place when it is given.
    async fn deploy_runtime(&self, existing: Option<&str>) -> Result<RuntimeIdentifier>;

    /// Delete a runtime by its external id
    async fn delete_runtime(&self, external_id: &str) -> Result<CleanupResult>;
}

/// Docker + AgentCore implementation
pub struct AgentContainerDeployer {
    container_dir: PathBuf,
    region: String,
    ready_timeout: Duration,
    cloudformation: CloudFormationClient,
    ecr: EcrClient,
    agentcore: AgentCoreClient,
}

fn required_output<'a>(outputs: &'a HashMap<String, String>, stack: StackUnit, key: &str) -> Result<&'a str> {
    outputs
        .get(key)
        .map(String::as_str)
        .with_context(|| format!("Stack {stack} has no output {key}"))
}

/// Image reference tagged with the current unix time
pub fn image_tag(repository_uri: &str, unix_secs: i64) -> String {
    format!("{repository_uri}:{unix_secs}")
}

impl AgentContainerDeployer {
    pub fn new(
        container_dir: impl Into<PathBuf>,
        region: &str,
        ready_timeout: Duration,
        cloudformation: CloudFormationClient,
        ecr: EcrClient,
        agentcore: AgentCoreClient,
    ) -> Self {
        Self {
            container_dir: container_dir.into(),
            region: region.to_string(),
            ready_timeout,
            cloudformation,
            ecr,
            agentcore,
        }
    }

    /// Log docker into the registry, then build and push the image
    async fn build_and_push(&self, repository_uri: &str) -> Result<String> {
        let creds = self.ecr.registry_login().await?;
        run_checked(
            "docker",
            &["login", "--username", &creds.username, "--password-stdin", &creds.endpoint],
            &CommandConfig::default().stdin(creds.password.clone()),
        )
        .await
        .context("docker login failed")?;

        let image = image_tag(repository_uri, Utc::now().timestamp());
        let context_dir = self.container_dir.to_string_lossy();
        run_checked(
            "docker",
            &["build", "--platform", AGENT_IMAGE_PLATFORM, "--load", "-t", &image, &context_dir],
            &CommandConfig::default(),
        )
        .await
        .context("docker build failed")?;

        run_checked("docker", &["push", &image], &CommandConfig::default())
            .await
            .context("docker push failed")?;

        info!(image = %image, "Agent image pushed");
        Ok(image)
    }
}

impl RuntimeOperations for AgentContainerDeployer {
    #[instrument(skip(self))]
    async fn deploy_runtime(&self, existing: Option<&str>) -> Result<RuntimeIdentifier> {
        let agent_outputs = self
            .cloudformation
            .stack_outputs(StackUnit::AgentCore.name())
            .await?;
        let secret_outputs = self
            .cloudformation
            .stack_outputs(StackUnit::SecretManager.name())
            .await?;

        let repository_uri = required_output(&agent_outputs, StackUnit::AgentCore, OUTPUT_REPOSITORY_URI)?;
        let role_arn = required_output(&agent_outputs, StackUnit::AgentCore, OUTPUT_ROLE_ARN)?;
        let secret_id = required_output(&secret_outputs, StackUnit::SecretManager, OUTPUT_SECRET_ID)?;

        let image = self.build_and_push(repository_uri).await?;

        let spec = RuntimeSpec {
            container_uri: image,
            role_arn: role_arn.to_string(),
            environment: vec![
                ("SECRET_ID".to_string(), secret_id.to_string()),
                ("AWS_DEFAULT_REGION".to_string(), self.region.clone()),
            ],
        };

        let runtime_id = match existing {
            Some(id) => match self.agentcore.update_runtime(id, &spec).await {
                Ok(()) => id.to_string(),
                Err(e) if is_not_found(&e) => {
                    warn!(runtime_id = %id, "Recorded runtime no longer exists, creating a new one");
                    self.agentcore.create_runtime(AGENT_RUNTIME_NAME, &spec).await?
                }
                Err(e) => return Err(e),
            },
            None => self.agentcore.create_runtime(AGENT_RUNTIME_NAME, &spec).await?,
        };

        self.agentcore
            .wait_for_ready(&runtime_id, self.ready_timeout)
            .await?;

        info!(runtime_id = %runtime_id, "Agent runtime ready");
        Ok(RuntimeIdentifier::new(AGENT_RUNTIME_NAME, runtime_id))
    }

    async fn delete_runtime(&self, external_id: &str) -> Result<CleanupResult> {
        match self.agentcore.delete_runtime(external_id).await {
            Ok(()) => Ok(CleanupResult::Deleted),
            Err(e) if is_not_found(&e) => {
                info!(runtime_id = %external_id, "Agent runtime already gone");
                Ok(CleanupResult::AlreadyDeleted)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_tag() {
        assert_eq!(
            image_tag("1.dkr.ecr.us-east-1.amazonaws.com/pipeline-agent", 1700000000),
            "1.dkr.ecr.us-east-1.amazonaws.com/pipeline-agent:1700000000"
        );
    }

    #[test]
    fn test_required_output() {
        let outputs = HashMap::from([(OUTPUT_ROLE_ARN.to_string(), "arn:aws:iam::1:role/r".to_string())]);
        assert_eq!(
            required_output(&outputs, StackUnit::AgentCore, OUTPUT_ROLE_ARN).unwrap(),
            "arn:aws:iam::1:role/r"
        );
        let err = required_output(&outputs, StackUnit::AgentCore, OUTPUT_REPOSITORY_URI).unwrap_err();
        assert!(err.to_string().contains("ECRRepositoryURI"));
    }
}
