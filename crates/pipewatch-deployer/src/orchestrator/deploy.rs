//! Fail-fast deployment sequence

use super::LifecycleOrchestrator;
use crate::aws::IdentityOperations;
use crate::error::{DeployStep, OrchestratorError};
use crate::pipeline::PipelineOperations;
use crate::registry::RegistryOperations;
use crate::runtime::RuntimeOperations;
use crate::stacks::{StackOperations, StackParams};
use crate::store::IdentifierStore;
use anyhow::anyhow;
use pipewatch_common::defaults::AGENT_RUNTIME_NAME;
use pipewatch_common::{Arn, StackUnit, runtime_arn};
use tracing::{error, info, instrument};

impl<S, R, G, P, A, I> LifecycleOrchestrator<S, R, G, P, A, I>
where
    S: StackOperations,
    R: RuntimeOperations,
    G: RegistryOperations,
    P: PipelineOperations,
    A: IdentityOperations,
    I: IdentifierStore,
{
    /// Deploy the whole environment and return the agent runtime ARN
    ///
    /// Steps run strictly in order and the first failure ends the run.
    /// Resources created by earlier steps are left in place.
    #[instrument(skip_all, fields(pipeline = %pipeline_name, region = %region))]
    pub async fn deploy(&mut self, pipeline_name: &str, region: &str) -> Result<Arn, OrchestratorError> {
        let account = self.check_credentials().await?;

        let result = self.run_deploy(pipeline_name, region, &account).await;
        match &result {
            Ok(arn) => info!(agent_arn = %arn, "Deployment complete"),
            Err(e) => error!(error = %e, "Deployment aborted"),
        }
        result
    }

    async fn run_deploy(
        &mut self,
        pipeline_name: &str,
        region: &str,
        account: &str,
    ) -> Result<Arn, OrchestratorError> {
        use DeployStep::*;

        info!(step = ResolvePipeline.number(), "{ResolvePipeline}");
        let config = self
            .pipelines
            .resolve(pipeline_name, region)
            .await
            .map_err(|e| OrchestratorError::step(ResolvePipeline, e))?;
        info!(actions = config.stages.len(), "Pipeline configuration resolved");

        info!(step = CreateFoundation.number(), "{CreateFoundation}");
        self.create_units(CreateFoundation, &StackUnit::FOUNDATION, &StackParams::new())
            .await?;

        info!(step = DeployRuntime.number(), "{DeployRuntime}");
        let existing = self
            .store
            .get(AGENT_RUNTIME_NAME)
            .map_err(|e| OrchestratorError::step(DeployRuntime, e))?;
        let runtime = self
            .runtimes
            .deploy_runtime(existing.as_deref())
            .await
            .map_err(|e| OrchestratorError::step(DeployRuntime, e))?;
        self.store
            .put(&runtime)
            .map_err(|e| OrchestratorError::step(DeployRuntime, e))?;

        info!(step = AssembleArn.number(), "{AssembleArn}");
        let external_id = self
            .store
            .get(AGENT_RUNTIME_NAME)
            .map_err(|e| OrchestratorError::step(AssembleArn, e))?
            .ok_or_else(|| {
                OrchestratorError::step(
                    AssembleArn,
                    anyhow!("no identifier recorded for {AGENT_RUNTIME_NAME}"),
                )
            })?;
        let arn = runtime_arn(region, account, &external_id);
        info!(agent_arn = %arn, "Runtime ARN assembled");

        info!(step = CreateRequestHandler.number(), "{CreateRequestHandler}");
        let params = StackParams::new().with_agent_arn(arn.to_string());
        self.create_units(CreateRequestHandler, &[StackUnit::MainLambda], &params)
            .await?;

        Ok(arn)
    }

    async fn create_units(
        &mut self,
        step: DeployStep,
        units: &[StackUnit],
        params: &StackParams,
    ) -> Result<(), OrchestratorError> {
        self.ledger
            .begin_create(units)
            .map_err(|e| OrchestratorError::step(step, e))?;

        let result = self.stacks.create(units, params).await;

        self.ledger
            .finish_create(units, result.is_ok())
            .map_err(|e| OrchestratorError::step(step, e))?;
        result.map_err(|e| OrchestratorError::step(step, e))
    }
}
