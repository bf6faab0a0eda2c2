//! Pipeline configuration resolution
//!
//! The infrastructure project needs to know the watched pipeline's stages.
//! They are fetched from CodePipeline and written to `stages.json` before
//! any stack is created.

use crate::aws::{AwsContext, CodePipelineClient};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// One action of one pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageAction {
    pub stage_name: String,
    pub action_name: String,
    pub provider: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

/// Contents of `pipeline_config/stages.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipeline_name: String,
    pub stages: Vec<StageAction>,
}

impl PipelineConfig {
    /// Write as pretty JSON, creating the parent directory
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), actions = self.stages.len(), "Pipeline configuration written");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid {}", path.display()))
    }
}

/// Produces the pipeline configuration file consumed by the stacks
#[allow(async_fn_in_trait)]
pub trait PipelineOperations: Send + Sync {
    async fn resolve(&self, pipeline_name: &str, region: &str) -> Result<PipelineConfig>;
}

/// Resolves pipelines through CodePipeline and writes `stages.json`
pub struct CodePipelineSource {
    profile: Option<String>,
    output: PathBuf,
}

impl CodePipelineSource {
    pub fn new(profile: Option<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            profile,
            output: output.into(),
        }
    }
}

impl PipelineOperations for CodePipelineSource {
    async fn resolve(&self, pipeline_name: &str, region: &str) -> Result<PipelineConfig> {
        let ctx = AwsContext::with_profile(region, self.profile.as_deref()).await;
        let stages = CodePipelineClient::from_context(&ctx)
            .stage_actions(pipeline_name)
            .await?;

        let config = PipelineConfig {
            pipeline_name: pipeline_name.to_string(),
            stages,
        };
        config.write_to(&self.output)?;
        Ok(config)
    }
}
