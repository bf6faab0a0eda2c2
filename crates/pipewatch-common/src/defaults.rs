//! Default configuration values shared between the deployer and its tests
//!
//! These constants name the fixed cloud resources that make up one
//! pipeline-analysis environment.

/// Default AWS region when neither `--region` nor `AWS_REGION` is given
pub const DEFAULT_REGION: &str = "us-east-1";

/// Container registry holding the agent image
pub const REGISTRY_NAME: &str = "pipeline-agent";

/// Logical name of the agent runtime, also its key in the identifier store
pub const AGENT_RUNTIME_NAME: &str = "pipeline_error_analysis_agent";

/// Identifier store location, relative to the project root
pub const IDENTIFIER_FILE: &str = "scripts/agent_runtime_ids.json";

/// Generated pipeline configuration directory, relative to the project root
pub const PIPELINE_CONFIG_DIR: &str = "pipeline_config";

/// Pipeline configuration file name inside [`PIPELINE_CONFIG_DIR`]
pub const PIPELINE_CONFIG_FILE: &str = "stages.json";

/// CDK application directory, relative to the project root
pub const CDK_DIR: &str = "cdk_project";

/// Agent container build context, relative to the project root
pub const AGENT_CONTAINER_DIR: &str = "agent-container";

/// Notification settings consumed by the CDK app, relative to the project root
pub const NOTIFICATION_CONFIG_FILE: &str = "email-config/config.yaml";

/// Exact text an operator must type to allow a teardown
pub const CONFIRMATION_PHRASE: &str = "DELETE";

/// Largest number of images one batch-delete call accepts
pub const MAX_IMAGE_BATCH: usize = 100;

/// Platform the agent image is built for
pub const AGENT_IMAGE_PLATFORM: &str = "linux/arm64";

/// CDK context key carrying the runtime ARN into the request-handling stack
pub const AGENT_ARN_CONTEXT_KEY: &str = "agent_arn";

/// Default time to wait for the agent runtime to become ready (10 minutes)
pub const DEFAULT_RUNTIME_READY_TIMEOUT_SECS: u64 = 600;

/// Default time to wait for a stack deletion to finish (30 minutes)
pub const DEFAULT_STACK_DELETE_TIMEOUT_SECS: u64 = 1800;
