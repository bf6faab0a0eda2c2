//! Checks run once before a deployment starts

use crate::config::{NotificationConfig, ProjectLayout};
use crate::error::PreconditionError;
use std::path::Path;
use tracing::debug;

/// External tools a deployment shells out to
pub const DEPLOY_TOOLS: &[&str] = &["cdk", "docker"];

/// Ensure every tool resolves on PATH
pub fn check_tools(tools: &[&str]) -> Result<(), PreconditionError> {
    for tool in tools {
        let path = which::which(tool).map_err(|_| PreconditionError::MissingTool {
            tool: (*tool).to_string(),
        })?;
        debug!(tool = %tool, path = %path.display(), "Found tool");
    }
    Ok(())
}

fn require_dir(path: &Path) -> Result<(), PreconditionError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PreconditionError::MissingPath {
            path: path.to_path_buf(),
        })
    }
}

/// Inputs a deployment reads from the project directory
pub fn check_project(layout: &ProjectLayout) -> Result<NotificationConfig, PreconditionError> {
    require_dir(&layout.cdk_dir())?;
    require_dir(&layout.agent_container_dir())?;
    NotificationConfig::load(&layout.notification_config())
}

/// Everything a deployment needs locally
pub fn check_deploy(layout: &ProjectLayout) -> Result<NotificationConfig, PreconditionError> {
    check_tools(DEPLOY_TOOLS)?;
    check_project(layout)
}
