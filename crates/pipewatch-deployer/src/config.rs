//! Configuration types for the deployer

use crate::error::PreconditionError;
use pipewatch_common::defaults;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// AWS targeting
#[derive(Debug, Clone)]
pub struct AwsSettings {
    /// AWS region
    pub region: String,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Where the project's inputs and generated files live
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Infrastructure-as-code project run by `cdk`
    pub fn cdk_dir(&self) -> PathBuf {
        self.root.join(defaults::CDK_DIR)
    }

    /// Docker build context for the agent image
    pub fn agent_container_dir(&self) -> PathBuf {
        self.root.join(defaults::AGENT_CONTAINER_DIR)
    }

    pub fn identifier_file(&self) -> PathBuf {
        self.root.join(defaults::IDENTIFIER_FILE)
    }

    pub fn pipeline_config_dir(&self) -> PathBuf {
        self.root.join(defaults::PIPELINE_CONFIG_DIR)
    }

    pub fn stages_file(&self) -> PathBuf {
        self.pipeline_config_dir()
            .join(defaults::PIPELINE_CONFIG_FILE)
    }

    pub fn notification_config(&self) -> PathBuf {
        self.root.join(defaults::NOTIFICATION_CONFIG_FILE)
    }
}

/// Tunables for a deployment
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub aws: AwsSettings,
    /// Pipeline whose failures are analyzed
    pub pipeline_name: String,
    /// How long to wait for the agent runtime to become ready
    pub runtime_ready_timeout: Duration,
}

/// Tunables for a teardown
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    pub aws: AwsSettings,
    /// How long to wait for each stack deletion
    pub stack_delete_timeout: Duration,
    /// Images per batch-delete call during registry cleanup
    pub registry_batch_size: usize,
    /// Confirmation answer given on the command line instead of stdin
    pub confirm: Option<String>,
}

impl TeardownConfig {
    pub fn new(aws: AwsSettings) -> Self {
        Self {
            aws,
            stack_delete_timeout: Duration::from_secs(defaults::DEFAULT_STACK_DELETE_TIMEOUT_SECS),
            registry_batch_size: defaults::MAX_IMAGE_BATCH,
            confirm: None,
        }
    }
}

/// Recipients of failure analysis emails
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationConfig {
    pub notification_emails: Vec<String>,
}

impl NotificationConfig {
    /// Load and validate the YAML file
    pub fn load(path: &Path) -> Result<Self, PreconditionError> {
        let invalid = |reason: String| PreconditionError::InvalidNotificationConfig {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PreconditionError::MissingPath {
                    path: path.to_path_buf(),
                }
            } else {
                invalid(e.to_string())
            }
        })?;

        Self::parse(&text).map_err(invalid)
    }

    /// Parse YAML and require at least one plausible address
    pub fn parse(text: &str) -> Result<Self, String> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| e.to_string())?;

        if config.notification_emails.is_empty() {
            return Err("notification_emails must list at least one address".to_string());
        }
        if let Some(bad) = config
            .notification_emails
            .iter()
            .find(|email| !email.contains('@'))
        {
            return Err(format!("'{bad}' is not an email address"));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ProjectLayout::new("/work");
        assert_eq!(layout.cdk_dir(), PathBuf::from("/work/cdk_project"));
        assert_eq!(
            layout.identifier_file(),
            PathBuf::from("/work/scripts/agent_runtime_ids.json")
        );
        assert_eq!(
            layout.stages_file(),
            PathBuf::from("/work/pipeline_config/stages.json")
        );
        assert_eq!(
            layout.notification_config(),
            PathBuf::from("/work/email-config/config.yaml")
        );
    }

    #[test]
    fn test_teardown_defaults() {
        let config = TeardownConfig::new(AwsSettings {
            region: "us-east-1".to_string(),
            aws_profile: None,
        });
        assert_eq!(config.registry_batch_size, defaults::MAX_IMAGE_BATCH);
        assert_eq!(config.stack_delete_timeout, Duration::from_secs(1800));
        assert!(config.confirm.is_none());
    }

    #[test]
    fn test_parse_notification_config() {
        let config = NotificationConfig::parse(
            "notification_emails:\n  - ops@example.com\n  - dev@example.com\n",
        )
        .unwrap();
        assert_eq!(config.notification_emails.len(), 2);
    }

    #[test]
    fn test_reject_empty_or_bad_emails() {
        assert!(NotificationConfig::parse("notification_emails: []\n").is_err());
        assert!(NotificationConfig::parse("notification_emails:\n  - nobody\n").is_err());
        assert!(NotificationConfig::parse("other: 1\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = NotificationConfig::load(&dir.path().join("config.yaml")).unwrap_err();
        assert!(matches!(err, PreconditionError::MissingPath { .. }));
    }
}
