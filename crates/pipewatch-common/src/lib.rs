//! pipewatch-common - Shared types and utilities
//!
//! This crate provides the types shared by the deployer binary and its test
//! fakes, without any AWS SDK dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Fixed resource names and default values
//! - [`report`]: Step outcomes and the teardown report
//! - [`runtime`]: Runtime identifiers and ARN assembly
//! - [`stack_unit`]: Stack units, their dependencies and lifecycle states

pub mod defaults;
pub mod report;
pub mod runtime;
pub mod stack_unit;

// Re-export commonly used types
pub use report::{StepOutcome, StepResult, TeardownReport};
pub use runtime::{Arn, RuntimeIdentifier, runtime_arn};
pub use stack_unit::{StackState, StackUnit};
