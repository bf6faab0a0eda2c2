//! Bedrock AgentCore runtime lifecycle

use crate::aws::context::AwsContext;
use crate::aws::error::AwsError;
use crate::wait::{WaitConfig, wait_for_resource};
use anyhow::{Context, Result};
use aws_sdk_bedrockagentcorecontrol::Client;
use aws_sdk_bedrockagentcorecontrol::types::{
    AgentRuntimeArtifact, AgentRuntimeStatus, ContainerConfiguration, NetworkConfiguration,
    NetworkMode, ProtocolConfiguration, ServerProtocol,
};
use std::time::Duration;
use tracing::{debug, info};

/// What to run in an agent runtime
#[derive(Debug, Clone)]
pub struct RuntimeSpec {
    pub container_uri: String,
    pub role_arn: String,
    pub environment: Vec<(String, String)>,
}

/// AgentCore control-plane client
pub struct AgentCoreClient {
    client: Client,
    region: String,
}

/// Build the container artifact and network/protocol settings for a runtime
fn runtime_parts(
    spec: &RuntimeSpec,
) -> Result<(AgentRuntimeArtifact, NetworkConfiguration, ProtocolConfiguration)> {
    let container = ContainerConfiguration::builder()
        .container_uri(&spec.container_uri)
        .build()
        .context("Invalid container configuration")?;
    let network = NetworkConfiguration::builder()
        .network_mode(NetworkMode::Public)
        .build()
        .context("Invalid network configuration")?;
    let protocol = ProtocolConfiguration::builder()
        .server_protocol(ServerProtocol::Http)
        .build()
        .context("Invalid protocol configuration")?;

    Ok((
        AgentRuntimeArtifact::ContainerConfiguration(container),
        network,
        protocol,
    ))
}

impl AgentCoreClient {
    /// Create a new AgentCore client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an AgentCore client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.agentcore_client(),
            region: ctx.region().to_string(),
        }
    }

    /// Create a runtime and return its identifier
    pub async fn create_runtime(&self, name: &str, spec: &RuntimeSpec) -> Result<String> {
        info!(runtime = %name, image = %spec.container_uri, region = %self.region, "Creating agent runtime");

        let (artifact, network, protocol) = runtime_parts(spec)?;
        let mut request = self
            .client
            .create_agent_runtime()
            .agent_runtime_name(name)
            .agent_runtime_artifact(artifact)
            .role_arn(&spec.role_arn)
            .network_configuration(network)
            .protocol_configuration(protocol);
        for (key, value) in &spec.environment {
            request = request.environment_variables(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context("Failed to create agent runtime")?;

        let id: Option<&str> = response.agent_runtime_id().into();
        let id = id.context("CreateAgentRuntime returned no runtime id")?;
        info!(runtime_id = %id, "Agent runtime created");
        Ok(id.to_string())
    }

    /// Point an existing runtime at a new image
    pub async fn update_runtime(&self, runtime_id: &str, spec: &RuntimeSpec) -> Result<()> {
        info!(runtime_id = %runtime_id, image = %spec.container_uri, "Updating agent runtime");

        let (artifact, network, protocol) = runtime_parts(spec)?;
        let mut request = self
            .client
            .update_agent_runtime()
            .agent_runtime_id(runtime_id)
            .agent_runtime_artifact(artifact)
            .role_arn(&spec.role_arn)
            .network_configuration(network)
            .protocol_configuration(protocol);
        for (key, value) in &spec.environment {
            request = request.environment_variables(key, value);
        }

        request
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context("Failed to update agent runtime")?;

        Ok(())
    }

    /// Current runtime status string (e.g. `READY`)
    pub async fn runtime_status(&self, runtime_id: &str) -> Result<String> {
        let response = self
            .client
            .get_agent_runtime()
            .agent_runtime_id(runtime_id)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context("Failed to get agent runtime")?;

        let status: Option<&AgentRuntimeStatus> = response.status().into();
        Ok(status
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string()))
    }

    /// Wait for a runtime to become `READY`
    pub async fn wait_for_ready(&self, runtime_id: &str, timeout: Duration) -> Result<()> {
        wait_for_resource(
            WaitConfig::default().with_timeout(timeout),
            move || async move {
                let status = self.runtime_status(runtime_id).await?;
                debug!(runtime_id = %runtime_id, status = %status, "Agent runtime status");
                if status == AgentRuntimeStatus::Ready.as_str() {
                    Ok(true)
                } else if status.ends_with("_FAILED") {
                    anyhow::bail!("Agent runtime {runtime_id} reached {status}")
                } else {
                    Ok(false)
                }
            },
            runtime_id,
        )
        .await
    }

    /// Delete a runtime
    pub async fn delete_runtime(&self, runtime_id: &str) -> Result<()> {
        info!(runtime_id = %runtime_id, region = %self.region, "Deleting agent runtime");

        self.client
            .delete_agent_runtime()
            .agent_runtime_id(runtime_id)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context("Failed to delete agent runtime")?;

        Ok(())
    }
}
