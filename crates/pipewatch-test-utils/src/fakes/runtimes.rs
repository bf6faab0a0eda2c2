use anyhow::Result;
use pipewatch_common::RuntimeIdentifier;
use pipewatch_common::defaults::AGENT_RUNTIME_NAME;
use pipewatch_deployer::CleanupResult;
use pipewatch_deployer::runtime::RuntimeOperations;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Runtime deployer that hands out predictable ids
#[derive(Default)]
pub struct FakeRuntimes {
    next_id: String,
    live: Mutex<BTreeSet<String>>,
    deploys: Mutex<Vec<Option<String>>>,
    deletes: Mutex<Vec<String>>,
    fail_deploy: bool,
    fail_delete: BTreeSet<String>,
}

impl FakeRuntimes {
    pub fn new() -> Self {
        Self {
            next_id: "pipeline_error_analysis_agent-0001".to_string(),
            ..Self::default()
        }
    }

    /// Start with runtimes that already exist
    pub fn with_live(ids: &[&str]) -> Self {
        let fake = Self::new();
        fake.live
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| id.to_string()));
        fake
    }

    /// Every deploy fails (image build error)
    pub fn failing_deploy(mut self) -> Self {
        self.fail_deploy = true;
        self
    }

    /// Deleting `id` fails
    pub fn failing_delete(mut self, id: &str) -> Self {
        self.fail_delete.insert(id.to_string());
        self
    }

    /// Id a fresh deployment will receive
    pub fn next_id(&self) -> &str {
        &self.next_id
    }

    /// The `existing` argument of every deploy call
    pub fn deploys(&self) -> Vec<Option<String>> {
        self.deploys.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn live(&self) -> BTreeSet<String> {
        self.live.lock().unwrap().clone()
    }
}

impl RuntimeOperations for FakeRuntimes {
    async fn deploy_runtime(&self, existing: Option<&str>) -> Result<RuntimeIdentifier> {
        self.deploys
            .lock()
            .unwrap()
            .push(existing.map(str::to_string));

        if self.fail_deploy {
            anyhow::bail!("`docker build` failed");
        }

        let id = existing.unwrap_or(&self.next_id).to_string();
        self.live.lock().unwrap().insert(id.clone());
        Ok(RuntimeIdentifier::new(AGENT_RUNTIME_NAME, id))
    }

    async fn delete_runtime(&self, external_id: &str) -> Result<CleanupResult> {
        self.deletes.lock().unwrap().push(external_id.to_string());

        if self.fail_delete.contains(external_id) {
            anyhow::bail!("ConflictException: runtime {external_id} is updating");
        }
        if self.live.lock().unwrap().remove(external_id) {
            Ok(CleanupResult::Deleted)
        } else {
            Ok(CleanupResult::AlreadyDeleted)
        }
    }
}
