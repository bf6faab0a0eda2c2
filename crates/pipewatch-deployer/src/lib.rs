//! pipewatch-deployer - deploy and tear down a pipeline failure-analysis environment
//!
//! The environment is four CloudFormation stacks, a container image registry
//! and an AgentCore runtime. This crate drives their creation in dependency
//! order and removes them again, best-effort, on teardown.

pub mod aws;
pub mod cleanup;
pub mod command;
pub mod config;
pub mod confirm;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod preflight;
pub mod registry;
pub mod runtime;
pub mod stacks;
pub mod store;
pub mod wait;

pub use cleanup::CleanupResult;
pub use confirm::{ConfirmationGate, GateDecision};
pub use error::{DeployStep, OrchestratorError, PreconditionError, RegistryError, StoreError};
pub use orchestrator::{Collaborators, LifecycleOrchestrator};
