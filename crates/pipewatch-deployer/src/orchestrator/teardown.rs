//! Fail-soft teardown sequence

use super::LifecycleOrchestrator;
use crate::aws::IdentityOperations;
use crate::error::PreconditionError;
use crate::pipeline::PipelineOperations;
use crate::registry::{RegistryCleanup, RegistryOperations};
use crate::runtime::RuntimeOperations;
use crate::stacks::StackOperations;
use crate::store::IdentifierStore;
use pipewatch_common::{StackUnit, StepOutcome, StepResult, TeardownReport};
use tracing::{info, instrument, warn};

pub const STEP_DELETE_RUNTIMES: &str = "delete agent runtimes";
pub const STEP_REMOVE_STORE: &str = "remove identifier store";
pub const STEP_REMOVE_PIPELINE_CONFIG: &str = "remove pipeline config";
pub const STEP_LIST_REMAINING: &str = "list remaining stacks";

/// Report name for destroying a stack unit
pub fn destroy_step(unit: StackUnit) -> String {
    format!("destroy {unit}")
}

/// Report name for deleting one recorded runtime
pub fn delete_runtime_step(logical_name: &str) -> String {
    format!("delete runtime {logical_name}")
}

/// Report name for the registry cleanup
pub fn clean_registry_step(registry: &str) -> String {
    format!("clean registry {registry}")
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
    /// Remove every resource of the environment
    ///
    /// Each step runs regardless of earlier failures. Resources that never
    /// existed are reported as skipped, so running this twice is safe.
    #[instrument(skip_all, fields(region = %region))]
    pub async fn teardown(&mut self, region: &str) -> Result<TeardownReport, PreconditionError> {
        self.check_credentials().await?;

        let mut report = TeardownReport::new();
        let order = StackUnit::teardown_order();
        let (first, rest) = order.split_at(1);

        for unit in first {
            self.destroy_unit(*unit, &mut report).await;
        }

        self.delete_runtimes(&mut report).await;

        report.push(self.clean_registry().await);

        for unit in rest {
            self.destroy_unit(*unit, &mut report).await;
        }

        report.push(self.remove_identifier_store());
        report.push(self.remove_pipeline_config());

        report.push(self.list_remaining().await);

        info!(
            ok = report.count(StepOutcome::Ok),
            skipped = report.count(StepOutcome::Skipped),
            failed = report.count(StepOutcome::Failed),
            "Teardown finished"
        );
        Ok(report)
    }

    async fn destroy_unit(&mut self, unit: StackUnit, report: &mut TeardownReport) {
        let step = destroy_step(unit);

        if let Err(e) = self.ledger.begin_destroy(unit) {
            report.push(StepResult::failed(step, e));
            return;
        }

        let result = self.stacks.destroy(unit).await;
        if let Err(e) = self.ledger.finish_destroy(unit, result.is_ok()) {
            warn!(unit = %unit, error = %e, "Ledger out of sync");
        }

        match result {
            Ok(cleanup) => report.push(cleanup.into_step(step)),
            Err(e) => {
                warn!(unit = %unit, error = %e, "Stack destroy failed");
                report.push(StepResult::failed(step, format!("{e:#}")));
            }
        }
    }

    /// Delete every recorded runtime, forgetting the ones that are gone
    async fn delete_runtimes(&mut self, report: &mut TeardownReport) {
        let recorded = match self.store.get_all() {
            Ok(recorded) => recorded,
            Err(e) => {
                report.push(StepResult::failed(STEP_DELETE_RUNTIMES, e));
                return;
            }
        };

        if recorded.is_empty() {
            report.push(StepResult::skipped(
                STEP_DELETE_RUNTIMES,
                "no runtime identifiers recorded",
            ));
            return;
        }

        for (logical_name, external_id) in recorded {
            let step = delete_runtime_step(&logical_name);
            match self.runtimes.delete_runtime(&external_id).await {
                Ok(cleanup) => {
                    if let Err(e) = self.store.remove(&logical_name) {
                        warn!(name = %logical_name, error = %e, "Failed to forget runtime identifier");
                    }
                    report.push(cleanup.into_step(step).with_detail(external_id));
                }
                Err(e) => {
                    warn!(name = %logical_name, runtime_id = %external_id, error = %e, "Runtime delete failed");
                    report.push(StepResult::failed(step, format!("{external_id}: {e:#}")));
                }
            }
        }
    }

    async fn clean_registry(&self) -> StepResult {
        let step = clean_registry_step(&self.registry_name);
        match self.registry.clean_registry(&self.registry_name).await {
            Ok(RegistryCleanup::NotFound) => StepResult::skipped(step, "registry not found"),
            Ok(RegistryCleanup::Deleted {
                forced,
                images_removed,
            }) => {
                let detail = if forced {
                    "force-deleted".to_string()
                } else {
                    format!("deleted after removing {images_removed} images")
                };
                StepResult::ok(step).with_detail(detail)
            }
            Err(e) => {
                warn!(registry = %self.registry_name, error = %e, "Registry cleanup failed");
                StepResult::failed(step, format!("{e:#}"))
            }
        }
    }

    /// Delete the store file unless it still records live runtimes
    fn remove_identifier_store(&self) -> StepResult {
        match self.store.get_all() {
            Ok(remaining) if !remaining.is_empty() => {
                return StepResult::skipped(
                    STEP_REMOVE_STORE,
                    format!("kept: {} runtime(s) could not be deleted", remaining.len()),
                );
            }
            Ok(_) => {}
            Err(e) => return StepResult::failed(STEP_REMOVE_STORE, e),
        }

        match self.store.clear() {
            Ok(true) => StepResult::ok(STEP_REMOVE_STORE),
            Ok(false) => StepResult::skipped(STEP_REMOVE_STORE, "not found"),
            Err(e) => StepResult::failed(STEP_REMOVE_STORE, e),
        }
    }

    fn remove_pipeline_config(&self) -> StepResult {
        let dir = &self.pipeline_config_dir;
        if !dir.exists() {
            return StepResult::skipped(STEP_REMOVE_PIPELINE_CONFIG, "not found");
        }
        match std::fs::remove_dir_all(dir) {
            Ok(()) => {
                info!(path = %dir.display(), "Removed pipeline configuration");
                StepResult::ok(STEP_REMOVE_PIPELINE_CONFIG)
            }
            Err(e) => StepResult::failed(
                STEP_REMOVE_PIPELINE_CONFIG,
                format!("{}: {e}", dir.display()),
            ),
        }
    }

    /// Advisory: anything still live after teardown
    async fn list_remaining(&self) -> StepResult {
        match self.stacks.list_remaining().await {
            Ok(rows) if rows.is_empty() => {
                StepResult::skipped(STEP_LIST_REMAINING, "no matching stacks")
            }
            Ok(rows) => {
                let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
                warn!(stacks = ?names, "Stacks still present after teardown");
                StepResult::ok(STEP_LIST_REMAINING).with_detail(format!(
                    "{} remaining: {}",
                    rows.len(),
                    names.join(", ")
                ))
            }
            Err(e) => StepResult::failed(STEP_LIST_REMAINING, format!("{e:#}")),
        }
    }
}
