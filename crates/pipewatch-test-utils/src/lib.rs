//! Shared test utilities for pipewatch
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique names for live tests
//! - [`fakes`]: In-memory implementations of every orchestrator collaborator
//! - [`project`]: Temporary project directories with the expected layout

pub mod aws;
pub mod fakes;
pub mod project;

// Re-export commonly used items
pub use aws::{get_test_region, test_resource_name};
pub use fakes::{
    FakeCollaborators, FakeIdentity, FakeOrchestrator, FakePipelines, FakeRegistry, FakeRuntimes,
    FakeStacks, MemoryStore, StackCall, TEST_ACCOUNT_ID, empty_environment, fake_orchestrator,
};
pub use project::ProjectFixture;
