//! In-memory fakes of the orchestrator collaborators
//!
//! Each fake records the calls it receives and can be told to fail.

mod identity;
mod pipeline;
mod registry;
mod runtimes;
mod stacks;
mod store;

pub use identity::{FakeIdentity, TEST_ACCOUNT_ID};
pub use pipeline::FakePipelines;
pub use registry::FakeRegistry;
pub use runtimes::FakeRuntimes;
pub use stacks::{FakeStacks, StackCall};
pub use store::MemoryStore;

use pipewatch_deployer::config::ProjectLayout;
use pipewatch_deployer::{Collaborators, LifecycleOrchestrator};

pub type FakeOrchestrator = LifecycleOrchestrator<
    FakeStacks,
    FakeRuntimes,
    FakeRegistry,
    FakePipelines,
    FakeIdentity,
    MemoryStore,
>;

pub type FakeCollaborators = Collaborators<
    FakeStacks,
    FakeRuntimes,
    FakeRegistry,
    FakePipelines,
    FakeIdentity,
    MemoryStore,
>;

/// Collaborators for an environment where nothing exists yet
pub fn empty_environment() -> FakeCollaborators {
    Collaborators {
        stacks: FakeStacks::new(),
        runtimes: FakeRuntimes::new(),
        registry: FakeRegistry::absent(),
        pipelines: FakePipelines::new(),
        identity: FakeIdentity::valid(),
        store: MemoryStore::new(),
    }
}

pub fn fake_orchestrator(collaborators: FakeCollaborators, layout: &ProjectLayout) -> FakeOrchestrator {
    LifecycleOrchestrator::new(collaborators, layout)
}
