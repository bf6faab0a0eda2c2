//! AWS client modules for the deployer
//!
//! This module provides wrappers around AWS SDK clients for:
//! - CloudFormation: stack outputs, deletion and listing
//! - ECR: the agent image registry
//! - Bedrock AgentCore control: agent runtime lifecycle
//! - CodePipeline: pipeline configuration lookup
//! - STS: Account ID lookup

pub mod account;
pub mod agentcore;
pub mod cloudformation;
pub mod codepipeline;
pub mod context;
pub mod ecr;
pub mod error;

// Core clients
pub use account::{AccountId, IdentityOperations, StsIdentity, get_current_account_id};
pub use agentcore::{AgentCoreClient, RuntimeSpec};
pub use cloudformation::{CloudFormationClient, StackSummaryRow};
pub use codepipeline::CodePipelineClient;
pub use context::AwsContext;
pub use ecr::{EcrClient, RegistryCredentials};

// Error handling
pub use error::{AwsError, classify_anyhow_error, classify_aws_error, is_not_found};
