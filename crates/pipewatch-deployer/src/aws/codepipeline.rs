//! CodePipeline structure lookup

use crate::aws::context::AwsContext;
use crate::aws::error::AwsError;
use crate::pipeline::StageAction;
use anyhow::{Context, Result};
use aws_sdk_codepipeline::Client;
use aws_sdk_codepipeline::types::ActionTypeId;
use tracing::debug;

/// CodePipeline client
pub struct CodePipelineClient {
    client: Client,
}

impl CodePipelineClient {
    /// Create a new CodePipeline client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create a CodePipeline client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.codepipeline_client(),
        }
    }

    /// Fetch a pipeline and flatten it into one entry per action
    pub async fn stage_actions(&self, pipeline_name: &str) -> Result<Vec<StageAction>> {
        let response = self
            .client
            .get_pipeline()
            .name(pipeline_name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .with_context(|| format!("Failed to get pipeline {pipeline_name}"))?;

        let pipeline = response
            .pipeline()
            .with_context(|| format!("Pipeline {pipeline_name} has no declaration"))?;

        let mut actions = Vec::new();
        for stage in pipeline.stages() {
            let stage_name: Option<&str> = stage.name().into();
            for action in stage.actions() {
                let action_name: Option<&str> = action.name().into();
                let type_id: Option<&ActionTypeId> = action.action_type_id().into();
                let provider: Option<&str> = type_id.and_then(|t| t.provider().into());

                actions.push(StageAction {
                    stage_name: stage_name.unwrap_or_default().to_string(),
                    action_name: action_name.unwrap_or_default().to_string(),
                    provider: provider.unwrap_or_default().to_string(),
                    configuration: action
                        .configuration()
                        .map(|c| c.clone().into_iter().collect())
                        .unwrap_or_default(),
                });
            }
        }

        debug!(pipeline = %pipeline_name, actions = actions.len(), "Resolved pipeline stages");
        Ok(actions)
    }
}
