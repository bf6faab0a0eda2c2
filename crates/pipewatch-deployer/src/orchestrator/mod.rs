//! Deployment and teardown orchestration
//!
//! The orchestrator sequences the collaborators: pipeline resolution, stack
//! provisioning, runtime deployment, registry cleanup and the identifier
//! store. Deployment stops at the first failing step. Teardown runs every
//! step and reports each outcome.

mod deploy;
pub mod ledger;
pub mod results;
mod teardown;

pub use ledger::{LedgerError, StackLedger};
pub use results::{print_remaining_stacks, print_teardown_report, render_remaining_stacks, render_teardown_report};
pub use teardown::{
    STEP_DELETE_RUNTIMES, STEP_LIST_REMAINING, STEP_REMOVE_PIPELINE_CONFIG, STEP_REMOVE_STORE,
    clean_registry_step, delete_runtime_step, destroy_step,
};

use crate::aws::error::classify_anyhow_error;
use crate::aws::{AccountId, IdentityOperations};
use crate::config::ProjectLayout;
use crate::error::{PreconditionError, RegistryError};
use crate::pipeline::PipelineOperations;
use crate::registry::{RegistryCleaner, RegistryOperations};
use crate::runtime::RuntimeOperations;
use crate::stacks::StackOperations;
use crate::store::IdentifierStore;
use pipewatch_common::defaults::REGISTRY_NAME;
use std::path::PathBuf;
use tracing::warn;

/// Everything the orchestrator talks to
pub struct Collaborators<S, R, G, P, A, I> {
    pub stacks: S,
    pub runtimes: R,
    pub registry: G,
    pub pipelines: P,
    pub identity: A,
    pub store: I,
}

/// Sequences deployment and teardown of one environment
pub struct LifecycleOrchestrator<S, R, G, P, A, I> {
    stacks: S,
    runtimes: R,
    registry: RegistryCleaner<G>,
    pipelines: P,
    identity: A,
    store: I,
    registry_name: String,
    pipeline_config_dir: PathBuf,
    ledger: StackLedger,
}

impl<S, R, G, P, A, I> LifecycleOrchestrator<S, R, G, P, A, I>
where
    S: StackOperations,
    R: RuntimeOperations,
    G: RegistryOperations,
    P: PipelineOperations,
    A: IdentityOperations,
    I: IdentifierStore,
{
    pub fn new(collaborators: Collaborators<S, R, G, P, A, I>, layout: &ProjectLayout) -> Self {
        Self {
            stacks: collaborators.stacks,
            runtimes: collaborators.runtimes,
            registry: RegistryCleaner::new(collaborators.registry),
            pipelines: collaborators.pipelines,
            identity: collaborators.identity,
            store: collaborators.store,
            registry_name: REGISTRY_NAME.to_string(),
            pipeline_config_dir: layout.pipeline_config_dir(),
            ledger: StackLedger::new(),
        }
    }

    /// Delete registry images in smaller batches
    pub fn with_registry_batch_size(mut self, batch_size: usize) -> Result<Self, RegistryError> {
        self.registry = self.registry.with_batch_size(batch_size)?;
        Ok(self)
    }

    pub fn ledger(&self) -> &StackLedger {
        &self.ledger
    }

    pub fn stacks(&self) -> &S {
        &self.stacks
    }

    pub fn runtimes(&self) -> &R {
        &self.runtimes
    }

    pub fn pipelines(&self) -> &P {
        &self.pipelines
    }

    pub fn registry(&self) -> &G {
        self.registry.api()
    }

    pub fn store(&self) -> &I {
        &self.store
    }

    /// Resolve the caller's account, failing if credentials are unusable
    async fn check_credentials(&self) -> Result<AccountId, PreconditionError> {
        self.identity.current_account_id().await.map_err(|e| {
            let mut reason = format!("{e:#}");
            if let Some(hint) = classify_anyhow_error(&e).suggestion() {
                reason = format!("{reason}. {hint}");
            }
            warn!(error = %reason, "Credential check failed");
            PreconditionError::MissingCredentials { reason }
        })
    }
}
