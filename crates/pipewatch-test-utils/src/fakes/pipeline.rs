use anyhow::Result;
use pipewatch_deployer::pipeline::{PipelineConfig, PipelineOperations, StageAction};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Pipeline source returning a one-action pipeline
#[derive(Default)]
pub struct FakePipelines {
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakePipelines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every resolve fails as if the pipeline did not exist
    pub fn missing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(pipeline_name, region)` of every resolve call
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl PipelineOperations for FakePipelines {
    async fn resolve(&self, pipeline_name: &str, region: &str) -> Result<PipelineConfig> {
        self.calls
            .lock()
            .unwrap()
            .push((pipeline_name.to_string(), region.to_string()));

        if self.fail {
            anyhow::bail!("PipelineNotFoundException: {pipeline_name}");
        }

        Ok(PipelineConfig {
            pipeline_name: pipeline_name.to_string(),
            stages: vec![StageAction {
                stage_name: "Build".to_string(),
                action_name: "Compile".to_string(),
                provider: "CodeBuild".to_string(),
                configuration: BTreeMap::new(),
            }],
        })
    }
}
