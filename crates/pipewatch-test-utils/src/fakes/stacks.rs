use anyhow::Result;
use pipewatch_common::StackUnit;
use pipewatch_deployer::CleanupResult;
use pipewatch_deployer::aws::StackSummaryRow;
use pipewatch_deployer::stacks::{StackOperations, StackParams};
use std::collections::BTreeSet;
use std::sync::Mutex;

/// A call received by [`FakeStacks`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    Create(Vec<StackUnit>, StackParams),
    Destroy(StackUnit),
}

/// Stack provider that keeps the set of live units in memory
#[derive(Default)]
pub struct FakeStacks {
    live: Mutex<BTreeSet<StackUnit>>,
    calls: Mutex<Vec<StackCall>>,
    fail_create: BTreeSet<StackUnit>,
    fail_destroy: BTreeSet<StackUnit>,
    fail_listing: bool,
}

impl FakeStacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `units` already deployed
    pub fn with_live(units: &[StackUnit]) -> Self {
        let fake = Self::new();
        fake.live.lock().unwrap().extend(units.iter().copied());
        fake
    }

    /// Any create that includes `unit` fails
    pub fn failing_create(mut self, unit: StackUnit) -> Self {
        self.fail_create.insert(unit);
        self
    }

    /// Destroying `unit` fails and leaves it live
    pub fn failing_destroy(mut self, unit: StackUnit) -> Self {
        self.fail_destroy.insert(unit);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn calls(&self) -> Vec<StackCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn live_units(&self) -> BTreeSet<StackUnit> {
        self.live.lock().unwrap().clone()
    }

    /// Units passed to `create`, flattened in call order
    pub fn created_units(&self) -> Vec<StackUnit> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StackCall::Create(units, _) => Some(units),
                StackCall::Destroy(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Units passed to `destroy`, in call order
    pub fn destroyed_units(&self) -> Vec<StackUnit> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StackCall::Destroy(unit) => Some(unit),
                StackCall::Create(..) => None,
            })
            .collect()
    }
}

impl StackOperations for FakeStacks {
    async fn create(&self, units: &[StackUnit], params: &StackParams) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(StackCall::Create(units.to_vec(), params.clone()));

        if let Some(unit) = units.iter().find(|u| self.fail_create.contains(u)) {
            anyhow::bail!("cdk deploy failed: {unit} rolled back");
        }
        self.live.lock().unwrap().extend(units.iter().copied());
        Ok(())
    }

    async fn destroy(&self, unit: StackUnit) -> Result<CleanupResult> {
        self.calls.lock().unwrap().push(StackCall::Destroy(unit));

        if self.fail_destroy.contains(&unit) {
            anyhow::bail!("Stack {unit} reached DELETE_FAILED");
        }
        if self.live.lock().unwrap().remove(&unit) {
            Ok(CleanupResult::Deleted)
        } else {
            Ok(CleanupResult::AlreadyDeleted)
        }
    }

    async fn list_remaining(&self) -> Result<Vec<StackSummaryRow>> {
        if self.fail_listing {
            anyhow::bail!("ListStacks throttled");
        }
        Ok(self
            .live
            .lock()
            .unwrap()
            .iter()
            .map(|unit| StackSummaryRow {
                name: unit.name().to_string(),
                status: "CREATE_COMPLETE".to_string(),
                created: None,
            })
            .collect())
    }
}
